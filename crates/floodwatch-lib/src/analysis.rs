//! Flood risk analysis for a single location.
//!
//! The level and confidence come from stored evidence alone. The text model
//! only writes the narrative; when it is unavailable a canned moderate-risk
//! assessment is returned with `fallback` set.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::fetch::or_fallback;
use crate::geo::Coordinate;
use crate::risk::{RiskAssessment, RiskEvidence, RiskLevel};
use crate::store::{self, EvacuationPoint, FloodAlert, FloodStore, Nearby};
use crate::textgen::{GenerationParams, TextGenerator};

pub const ANALYSIS_ALERT_RADIUS_KM: f64 = 20.0;
pub const ANALYSIS_ALERT_LIMIT: usize = 10;
pub const ANALYSIS_EVACUATION_LIMIT: usize = 5;

/// Stored evidence around a location.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FloodContext {
    pub alerts: Vec<Nearby<FloodAlert>>,
    pub evacuation_points: Vec<Nearby<EvacuationPoint>>,
    pub distress_calls: usize,
}

impl FloodContext {
    pub fn evidence(&self) -> RiskEvidence {
        RiskEvidence::new(
            self.alerts.iter().map(|a| a.item.severity).collect(),
            self.distress_calls,
        )
    }

    /// Load the context from the store. Failures degrade to an empty context.
    pub async fn load(store: &Arc<dyn FloodStore>, center: Coordinate, timeout: Duration) -> Self {
        or_fallback(
            "store",
            timeout,
            store::query(store, move |s| {
                Ok(FloodContext {
                    alerts: s.active_alerts_near(
                        center,
                        ANALYSIS_ALERT_RADIUS_KM,
                        ANALYSIS_ALERT_LIMIT,
                    )?,
                    evacuation_points: s
                        .nearest_evacuation_points(center, ANALYSIS_EVACUATION_LIMIT)?,
                    distress_calls: s.pending_calls_near(center, ANALYSIS_ALERT_RADIUS_KM)?,
                })
            }),
            |_| FloodContext::default(),
        )
        .await
    }
}

/// Response of the flood analysis endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FloodAnalysis {
    pub location: Coordinate,
    pub risk_level: RiskLevel,
    pub confidence: u8,
    pub evacuation_points: Vec<Nearby<EvacuationPoint>>,
    pub flood_alerts: Vec<Nearby<FloodAlert>>,
    pub analysis: String,
    pub fallback: bool,
}

pub fn analysis_prompt(center: Coordinate, context: &FloodContext, assessment: &RiskAssessment) -> String {
    let alerts = if context.alerts.is_empty() {
        "none".to_string()
    } else {
        context
            .alerts
            .iter()
            .map(|a| {
                format!(
                    "{} ({} {}, {:.1} km away)",
                    a.item.location_name, a.item.severity, a.item.alert_type, a.distance_km
                )
            })
            .collect::<Vec<_>>()
            .join("; ")
    };
    let shelters = if context.evacuation_points.is_empty() {
        "none on record".to_string()
    } else {
        context
            .evacuation_points
            .iter()
            .map(|p| format!("{} ({:.1} km, capacity {})", p.item.name, p.distance_km, p.item.capacity))
            .collect::<Vec<_>>()
            .join("; ")
    };

    format!(
        "Analyze flood risk for {}, {}:\n\n\
         Active alerts within {} km: {}\n\
         Pending distress calls nearby: {}\n\
         Nearest evacuation points: {}\n\
         Assessed risk level: {} (confidence {}%)\n\n\
         Provide: Risk level, key factors, recommendations. Keep concise.",
        center.latitude,
        center.longitude,
        ANALYSIS_ALERT_RADIUS_KM,
        alerts,
        context.distress_calls,
        shelters,
        assessment.level,
        assessment.confidence,
    )
}

/// Canned narrative used when the text model is unavailable. It only states
/// what the store holds.
pub fn fallback_analysis(center: Coordinate, context: &FloodContext) -> String {
    let shelter = match context.evacuation_points.first() {
        Some(nearest) => format!(
            "- Nearest evacuation point on record: {} ({:.1} km)",
            nearest.item.name, nearest.distance_km
        ),
        None => "- No evacuation points on record nearby".to_string(),
    };
    format!(
        "Flood Risk Assessment for {}, {}:\n\n\
         RISK LEVEL: MODERATE\n\
         - Active flood alerts within {} km: {}\n\
         - Pending distress calls nearby: {}\n\
         {}\n\
         - Detailed analysis is unavailable; monitor local alerts and maintain emergency preparedness",
        center.latitude,
        center.longitude,
        ANALYSIS_ALERT_RADIUS_KM,
        context.alerts.len(),
        context.distress_calls,
        shelter,
    )
}

#[derive(Clone)]
pub struct FloodAnalyzer {
    text: Arc<dyn TextGenerator>,
    timeout: Duration,
}

impl FloodAnalyzer {
    pub fn new(text: Arc<dyn TextGenerator>, timeout: Duration) -> Self {
        Self { text, timeout }
    }

    pub async fn analyze(&self, center: Coordinate, context: FloodContext) -> FloodAnalysis {
        let assessment = context.evidence().assess();
        debug!(risk_level = %assessment.level, confidence = assessment.confidence, "flood evidence assessed");

        let prompt = analysis_prompt(center, &context, &assessment);
        let (analysis, fallback) = or_fallback(
            "textgen",
            self.timeout,
            async {
                self.text
                    .generate(&prompt, &GenerationParams::ANALYSIS)
                    .await
                    .map(|text| (text.trim().to_string(), false))
            },
            |_| (fallback_analysis(center, &context), true),
        )
        .await;

        FloodAnalysis {
            location: center,
            risk_level: assessment.level,
            confidence: assessment.confidence,
            evacuation_points: context.evacuation_points,
            flood_alerts: context.alerts,
            analysis,
            fallback,
        }
    }
}

impl std::fmt::Debug for FloodAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FloodAnalyzer")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk::Severity;

    #[test]
    fn fallback_names_the_location_and_moderate_risk() {
        let text = fallback_analysis(Coordinate::new(5.9804, 116.0735), &FloodContext::default());
        assert!(text.starts_with("Flood Risk Assessment for 5.9804, 116.0735:"));
        assert!(text.contains("RISK LEVEL: MODERATE"));
        assert!(text.contains("Active flood alerts within 20 km: 0"));
        assert!(text.contains("No evacuation points on record nearby"));
        assert!(!text.contains("weather"));
    }

    #[test]
    fn fallback_only_reports_stored_evidence() {
        let context = FloodContext {
            alerts: Vec::new(),
            evacuation_points: vec![Nearby {
                item: EvacuationPoint {
                    id: 3,
                    name: "Stadium Likas".to_string(),
                    point_type: "STADIUM".to_string(),
                    latitude: 6.0,
                    longitude: 116.1,
                    capacity: 5000,
                },
                distance_km: 3.4,
            }],
            distress_calls: 1,
        };
        let text = fallback_analysis(Coordinate::new(5.9804, 116.0735), &context);
        assert!(text.contains("Pending distress calls nearby: 1"));
        assert!(text.contains("Nearest evacuation point on record: Stadium Likas (3.4 km)"));
        assert!(!text.contains("weather"));
        assert!(!text.contains("Terrain"));
    }

    #[test]
    fn prompt_reports_empty_evidence() {
        let context = FloodContext::default();
        let assessment = context.evidence().assess();
        let prompt = analysis_prompt(Coordinate::new(5.98, 116.07), &context, &assessment);
        assert!(prompt.contains("Active alerts within 20 km: none"));
        assert!(prompt.contains("Nearest evacuation points: none on record"));
        assert!(prompt.contains("Assessed risk level: LOW (confidence 0%)"));
    }

    #[test]
    fn evidence_counts_alerts_and_calls() {
        let alert = FloodAlert {
            id: 1,
            location_name: "Likas".to_string(),
            latitude: 5.99,
            longitude: 116.09,
            severity: Severity::Medium,
            alert_type: "FLOOD".to_string(),
            description: None,
            active: true,
            timestamp: "2024-12-01 08:00:00".to_string(),
        };
        let context = FloodContext {
            alerts: vec![Nearby {
                item: alert,
                distance_km: 2.0,
            }],
            evacuation_points: Vec::new(),
            distress_calls: 2,
        };
        let assessment = context.evidence().assess();
        assert_eq!(assessment.level, RiskLevel::Medium);
        assert_eq!(assessment.confidence, 35);
    }
}
