//! Route planning with risk annotation.
//!
//! A route is fetched from a [`RouteProvider`] and, when one was found,
//! labelled by the text model using the flood situation around the start
//! point. Every step degrades instead of failing: no route becomes a direct
//! line, no model answer becomes a `MEDIUM` label with a warning.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::fetch::or_fallback;
use crate::geo::{haversine_km, Coordinate};
use crate::osrm::RouteProvider;
use crate::risk::{level_from_text, RiskEvidence, RiskLevel};
use crate::route::Route;
use crate::store::{self, FloodAlert, FloodStore, Nearby};
use crate::textgen::{GenerationParams, TextGenerator};

/// Radius around the start point used to gather flood evidence.
pub const ROUTE_CONTEXT_RADIUS_KM: f64 = 20.0;

/// Maximum number of alerts described in the flood status.
pub const ROUTE_CONTEXT_ALERT_LIMIT: usize = 10;

/// Number of geometry points included in the prompt.
pub const PROMPT_GEOMETRY_POINTS: usize = 5;

/// Flood status text used when the store cannot be read.
pub const FLOOD_STATUS_UNAVAILABLE: &str = "Flood status unavailable";

/// Flood status text used when no alert is active nearby.
pub const NO_ACTIVE_ALERTS: &str = "No active flood alerts nearby";

/// Where a planned route came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteSource {
    Routed,
    Direct,
}

/// Whether the text model labelled the route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Annotation {
    Generated,
    Unavailable,
    /// Direct routes are not sent to the model.
    Skipped,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchedRoute {
    pub route: Route,
    pub source: RouteSource,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedRoute {
    pub route: Route,
    pub source: RouteSource,
    pub annotation: Annotation,
}

/// Flood situation near a route.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteContext {
    pub evidence: RiskEvidence,
    pub flood_status: String,
}

impl RouteContext {
    pub fn unavailable() -> Self {
        Self {
            evidence: RiskEvidence::default(),
            flood_status: FLOOD_STATUS_UNAVAILABLE.to_string(),
        }
    }

    pub fn from_alerts(alerts: &[Nearby<FloodAlert>], distress_calls: usize) -> Self {
        let items: Vec<&FloodAlert> = alerts.iter().map(|n| &n.item).collect();
        Self {
            evidence: RiskEvidence::new(items.iter().map(|a| a.severity).collect(), distress_calls),
            flood_status: flood_status_text(&items),
        }
    }

    /// Read alerts and pending calls around `center`. Store failures and
    /// timeouts yield [`RouteContext::unavailable`].
    pub async fn load(store: &Arc<dyn FloodStore>, center: Coordinate, timeout: Duration) -> Self {
        let loaded = store::query(store, move |s| {
            let alerts =
                s.active_alerts_near(center, ROUTE_CONTEXT_RADIUS_KM, ROUTE_CONTEXT_ALERT_LIMIT)?;
            let calls = s.pending_calls_near(center, ROUTE_CONTEXT_RADIUS_KM)?;
            Ok(Self::from_alerts(&alerts, calls))
        });
        or_fallback("store", timeout, loaded, |_| Self::unavailable()).await
    }
}

/// One `"<location>: <severity> risk"` line per alert.
pub fn flood_status_text(alerts: &[&FloodAlert]) -> String {
    if alerts.is_empty() {
        return NO_ACTIVE_ALERTS.to_string();
    }
    alerts
        .iter()
        .map(|a| format!("{}: {} risk", a.location_name, a.severity))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Prompt asking the model to label a route.
pub fn route_prompt(route: &Route, start: Coordinate, end: Coordinate, flood_status: &str) -> String {
    let passes = route
        .geometry
        .points()
        .take(PROMPT_GEOMETRY_POINTS)
        .map(|p| format!("[{}, {}]", p.latitude, p.longitude))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "Analyze this evacuation route based on current flood conditions:\n\n\
         ROUTE DETAILS:\n\
         - Start: [{}, {}]\n\
         - Destination: [{}, {}]\n\
         - Distance: {:.1}km (straight line {:.1}km)\n\
         - Duration: {} minutes\n\n\
         CURRENT FLOOD STATUS:\n{}\n\n\
         Route passes through these coordinates: {}\n\n\
         Assess the evacuation route risk level (LOW/MEDIUM/HIGH) and suggest precautions \
         to take along this route. Only return the risk level and two precautions to take.",
        start.latitude,
        start.longitude,
        end.latitude,
        end.longitude,
        route.distance_km(),
        haversine_km(start, end),
        route.duration_minutes().round(),
        flood_status,
        passes,
    )
}

#[derive(Clone)]
pub struct RouteAnnotator {
    routes: Arc<dyn RouteProvider>,
    text: Arc<dyn TextGenerator>,
    timeout: Duration,
}

impl RouteAnnotator {
    pub fn new(
        routes: Arc<dyn RouteProvider>,
        text: Arc<dyn TextGenerator>,
        timeout: Duration,
    ) -> Self {
        Self {
            routes,
            text,
            timeout,
        }
    }

    /// Driving route, or a direct line when routing fails.
    pub async fn fetch_route(&self, start: Coordinate, end: Coordinate) -> FetchedRoute {
        or_fallback(
            "osrm",
            self.timeout,
            async {
                self.routes
                    .driving_route(start, end)
                    .await
                    .map(|route| FetchedRoute {
                        route,
                        source: RouteSource::Routed,
                    })
            },
            |_| FetchedRoute {
                route: Route::direct(start, end),
                source: RouteSource::Direct,
            },
        )
        .await
    }

    /// Label `route` using the model. Geometry, distance and duration are
    /// carried over unchanged.
    ///
    /// A generated level is never below the evidence level. Without a model
    /// answer the label is `MEDIUM` whatever the evidence says.
    pub async fn annotate(
        &self,
        route: Route,
        start: Coordinate,
        end: Coordinate,
        context: &RouteContext,
    ) -> (Route, Annotation) {
        let prompt = route_prompt(&route, start, end, &context.flood_status);
        let floor = context.evidence.assess().level;
        let (risk_level, warning, annotation) = or_fallback(
            "textgen",
            self.timeout,
            async {
                self.text
                    .generate(&prompt, &GenerationParams::ROUTE)
                    .await
                    .map(|text| {
                        let level = level_from_text(&text).max(floor);
                        info!(risk_level = %level, "route annotated");
                        (level, format!("AI Analysis: {}", text.trim()), Annotation::Generated)
                    })
            },
            |err| {
                (
                    RiskLevel::Medium,
                    format!("AI analysis unavailable: {err}; service degraded"),
                    Annotation::Unavailable,
                )
            },
        )
        .await;

        let labelled = Route {
            risk_level,
            warnings: vec![warning],
            ..route
        };
        (labelled, annotation)
    }

    /// Fetch a route and the flood context concurrently, then annotate.
    pub async fn plan(
        &self,
        start: Coordinate,
        end: Coordinate,
        store: &Arc<dyn FloodStore>,
        status_timeout: Duration,
    ) -> PlannedRoute {
        let (fetched, context) = tokio::join!(
            self.fetch_route(start, end),
            RouteContext::load(store, start, status_timeout)
        );

        match fetched.source {
            RouteSource::Direct => PlannedRoute {
                route: fetched.route,
                source: RouteSource::Direct,
                annotation: Annotation::Skipped,
            },
            RouteSource::Routed => {
                let (route, annotation) = self.annotate(fetched.route, start, end, &context).await;
                PlannedRoute {
                    route,
                    source: RouteSource::Routed,
                    annotation,
                }
            }
        }
    }
}

impl std::fmt::Debug for RouteAnnotator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteAnnotator")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk::Severity;
    use crate::route::LineString;

    fn alert(name: &str, severity: Severity) -> Nearby<FloodAlert> {
        Nearby {
            item: FloodAlert {
                id: 1,
                location_name: name.to_string(),
                latitude: 5.98,
                longitude: 116.07,
                severity,
                alert_type: "FLOOD".to_string(),
                description: None,
                active: true,
                timestamp: "2024-12-01 08:00:00".to_string(),
            },
            distance_km: 1.0,
        }
    }

    #[test]
    fn status_lists_each_alert() {
        let alerts = vec![alert("Likas", Severity::High), alert("Penampang", Severity::Low)];
        let context = RouteContext::from_alerts(&alerts, 2);
        assert_eq!(context.flood_status, "Likas: HIGH risk\nPenampang: LOW risk");
        assert_eq!(context.evidence.distress_calls, 2);
        assert_eq!(context.evidence.assess().level, RiskLevel::Critical);
    }

    #[test]
    fn empty_status_reads_as_no_alerts() {
        assert_eq!(RouteContext::from_alerts(&[], 0).flood_status, NO_ACTIVE_ALERTS);
    }

    #[test]
    fn prompt_includes_first_five_points_in_lat_lon_order() {
        let start = Coordinate::new(5.9804, 116.0735);
        let end = Coordinate::new(5.9731, 116.0678);
        let coords: Vec<[f64; 2]> = (0..8).map(|i| [116.0 + i as f64, 5.0]).collect();
        let route = Route::routed(start, end, LineString::new(coords), 2460.0, 330.0);

        let prompt = route_prompt(&route, start, end, "Likas: HIGH risk");
        assert!(prompt.contains("- Distance: 2.5km (straight line 1.0km)"));
        assert!(prompt.contains("- Duration: 6 minutes"));
        assert!(prompt.contains("Likas: HIGH risk"));
        assert!(prompt.contains("[5, 120]"));
        assert!(!prompt.contains("[5, 121]"));
    }
}
