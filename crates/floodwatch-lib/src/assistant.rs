//! Emergency assistant replies.

use std::sync::Arc;
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use crate::fetch::or_fallback;
use crate::geo::Coordinate;
use crate::risk::Severity;
use crate::store::{self, FloodStore};
use crate::textgen::{GenerationParams, TextGenerator};

pub const ASSISTANT_ALERT_RADIUS_KM: f64 = 20.0;
pub const ASSISTANT_ALERT_LIMIT: usize = 5;
pub const ASSISTANT_SHELTER_RADIUS_KM: f64 = 10.0;
pub const ASSISTANT_SHELTER_LIMIT: usize = 3;

/// Reply sent when the text model cannot answer.
pub const ASSISTANT_FALLBACK: &str = "I apologize, but I am currently experiencing technical difficulties. For immediate emergency assistance, please contact local emergency services at 999.";

const NO_CONTEXT: &str = "No location context available.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertSummary {
    pub location_name: String,
    pub severity: Severity,
    pub alert_type: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShelterSummary {
    pub name: String,
    #[serde(rename = "type")]
    pub point_type: String,
    pub capacity: i64,
}

/// Flood situation near the user, as given to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantContext {
    pub location: Coordinate,
    pub alerts: Vec<AlertSummary>,
    pub shelters: Vec<ShelterSummary>,
}

impl AssistantContext {
    /// Load nearby alerts and shelters. `None` when the store cannot answer.
    pub async fn load(
        store: &Arc<dyn FloodStore>,
        location: Coordinate,
        timeout: Duration,
    ) -> Option<Self> {
        let loaded = store::query(store, move |s| {
            let alerts = s
                .active_alerts_near(location, ASSISTANT_ALERT_RADIUS_KM, ASSISTANT_ALERT_LIMIT)?
                .into_iter()
                .map(|n| AlertSummary {
                    location_name: n.item.location_name,
                    severity: n.item.severity,
                    alert_type: n.item.alert_type,
                    description: n.item.description,
                })
                .collect();
            let shelters = s
                .evacuation_points_within(
                    location,
                    ASSISTANT_SHELTER_RADIUS_KM,
                    ASSISTANT_SHELTER_LIMIT,
                )?
                .into_iter()
                .map(|n| ShelterSummary {
                    name: n.item.name,
                    point_type: n.item.point_type,
                    capacity: n.item.capacity,
                })
                .collect();
            Ok(AssistantContext {
                location,
                alerts,
                shelters,
            })
        });
        or_fallback("store", timeout, async { loaded.await.map(Some) }, |_| None).await
    }

    fn describe(&self) -> String {
        let alerts = serde_json::to_string(&self.alerts).unwrap_or_else(|_| "[]".to_string());
        let shelters = serde_json::to_string(&self.shelters).unwrap_or_else(|_| "[]".to_string());
        format!(
            "Current flood situation near user:\n\
             - Location: {}, {}\n\
             - Active flood alerts: {}\n\
             - Nearby evacuation points: {}",
            self.location.latitude, self.location.longitude, alerts, shelters
        )
    }
}

pub fn assistant_prompt(message: &str, context: Option<&AssistantContext>) -> String {
    let context = context
        .map(AssistantContext::describe)
        .unwrap_or_else(|| NO_CONTEXT.to_string());

    format!(
        "You are an emergency flood response AI assistant. Provide helpful, accurate, and safety-focused advice.\n\n\
         {context}\n\n\
         User question: \"{message}\"\n\n\
         Guidelines:\n\
         1. Prioritize user safety above all else\n\
         2. Provide clear, actionable advice\n\
         3. If situation is critical, recommend contacting emergency services\n\
         4. Be concise but thorough\n\
         5. Use the flood context data to give location-specific advice\n\n\
         Respond in a helpful, calm, and professional tone."
    )
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantReply {
    pub response: String,
    /// RFC 3339 UTC time the reply was produced.
    pub timestamp: String,
    pub fallback: bool,
}

impl AssistantReply {
    fn now(response: String, fallback: bool) -> Self {
        Self {
            response,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            fallback,
        }
    }
}

#[derive(Clone)]
pub struct Assistant {
    text: Arc<dyn TextGenerator>,
    timeout: Duration,
}

impl Assistant {
    pub fn new(text: Arc<dyn TextGenerator>, timeout: Duration) -> Self {
        Self { text, timeout }
    }

    pub async fn answer(&self, message: &str, context: Option<&AssistantContext>) -> AssistantReply {
        let prompt = assistant_prompt(message, context);
        or_fallback(
            "textgen",
            self.timeout,
            async {
                self.text
                    .generate(&prompt, &GenerationParams::ASSISTANT)
                    .await
                    .map(|text| AssistantReply::now(text.trim().to_string(), false))
            },
            |_| AssistantReply::now(ASSISTANT_FALLBACK.to_string(), true),
        )
        .await
    }
}

impl std::fmt::Debug for Assistant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Assistant")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
