use std::sync::Arc;
use std::time::Duration;

use floodwatch_lib::annotate::{RouteContext, RouteSource};
use floodwatch_lib::route::DIRECT_ROUTE_WARNING;
use floodwatch_lib::shelter::FALLBACK_ID;
use floodwatch_lib::test_helpers::{
    seeded_store, shelter_candidate, StubPoiSource, StubRouteProvider, StubTextGenerator,
};
use floodwatch_lib::{
    Annotation, Coordinate, FloodStore, NearestShelterResolver, RiskEvidence, RiskLevel,
    RouteAnnotator, Severity,
};

const PUBLIC_HALL: Coordinate = Coordinate::new(5.9804, 116.0735);
const SCHOOL_SHELTER: Coordinate = Coordinate::new(5.9731, 116.0678);

fn resolver(source: StubPoiSource) -> NearestShelterResolver {
    NearestShelterResolver::new(Arc::new(source), Duration::from_millis(200))
}

#[tokio::test]
async fn empty_search_falls_back_to_public_hall() {
    let lookup = resolver(StubPoiSource::returning(Vec::new()))
        .resolve(PUBLIC_HALL, 8000.0)
        .await;

    assert!(lookup.fallback);
    assert_eq!(lookup.point.name(), Some("Public Hall"));
    assert_eq!(lookup.point.id, FALLBACK_ID);
    assert_eq!(lookup.point.element_type, "node");
    assert!(lookup.point.dist.abs() < 1e-6);
}

#[tokio::test]
async fn network_failure_falls_back() {
    let lookup = resolver(StubPoiSource::failing("connection refused"))
        .resolve(SCHOOL_SHELTER, 8000.0)
        .await;
    assert!(lookup.fallback);
    assert_eq!(lookup.point.name(), Some("School Shelter"));
}

#[tokio::test]
async fn slow_search_falls_back() {
    let lookup = resolver(StubPoiSource::hanging(Duration::from_secs(5)))
        .resolve(PUBLIC_HALL, 8000.0)
        .await;
    assert!(lookup.fallback);
    assert_eq!(lookup.point.name(), Some("Public Hall"));
}

#[tokio::test]
async fn live_results_pick_the_closest() {
    let source = StubPoiSource::returning(vec![
        shelter_candidate("11", "Dewan Far", 6.05, 116.15),
        shelter_candidate("12", "Dewan Near", 5.981, 116.074),
    ]);
    let lookup = resolver(source).resolve(PUBLIC_HALL, 8000.0).await;

    assert!(!lookup.fallback);
    assert_eq!(lookup.point.id, "12");
    assert_eq!(lookup.point.name(), Some("Dewan Near"));
    assert!(lookup.point.dist > 0.0 && lookup.point.dist < 200.0);
}

fn annotator(routes: StubRouteProvider, text: StubTextGenerator) -> RouteAnnotator {
    RouteAnnotator::new(Arc::new(routes), Arc::new(text), Duration::from_millis(200))
}

fn geometry() -> Vec<[f64; 2]> {
    vec![[116.0735, 5.9804], [116.071, 5.977], [116.0678, 5.9731]]
}

#[tokio::test]
async fn annotation_timeout_keeps_geometry_and_marks_medium() {
    let annotator = annotator(
        StubRouteProvider::returning(geometry()),
        StubTextGenerator::hanging(Duration::from_secs(5)),
    );
    let fetched = annotator.fetch_route(PUBLIC_HALL, SCHOOL_SHELTER).await;
    assert_eq!(fetched.source, RouteSource::Routed);
    let original = fetched.route.clone();

    let (route, annotation) = annotator
        .annotate(fetched.route, PUBLIC_HALL, SCHOOL_SHELTER, &RouteContext::unavailable())
        .await;

    assert_eq!(annotation, Annotation::Unavailable);
    assert_eq!(route.geometry, original.geometry);
    assert_eq!(route.distance_m, original.distance_m);
    assert_eq!(route.risk_level, RiskLevel::Medium);
    assert_eq!(route.warnings.len(), 1);
    assert!(route.warnings[0].contains("unavailable"));
}

#[tokio::test]
async fn annotation_failure_is_medium_even_with_critical_evidence() {
    let annotator = annotator(
        StubRouteProvider::returning(geometry()),
        StubTextGenerator::failing("throttled"),
    );
    let fetched = annotator.fetch_route(PUBLIC_HALL, SCHOOL_SHELTER).await;
    let context = RouteContext {
        evidence: RiskEvidence::new(vec![Severity::High, Severity::High], 0),
        flood_status: "Likas: HIGH risk".to_string(),
    };
    assert_eq!(context.evidence.assess().level, RiskLevel::Critical);

    let (route, annotation) = annotator
        .annotate(fetched.route, PUBLIC_HALL, SCHOOL_SHELTER, &context)
        .await;

    assert_eq!(annotation, Annotation::Unavailable);
    assert_eq!(route.risk_level, RiskLevel::Medium);
    assert!(route.warnings[0].starts_with("AI analysis unavailable: "));
    assert!(route.warnings[0].ends_with("; service degraded"));
}

#[tokio::test]
async fn generated_level_is_raised_to_the_evidence_level() {
    let annotator = annotator(
        StubRouteProvider::returning(geometry()),
        StubTextGenerator::returning("  Risk level: LOW. Drive slowly.  "),
    );
    let fetched = annotator.fetch_route(PUBLIC_HALL, SCHOOL_SHELTER).await;
    let context = RouteContext {
        evidence: RiskEvidence::new(vec![Severity::High], 0),
        flood_status: "Likas: HIGH risk".to_string(),
    };

    let (route, annotation) = annotator
        .annotate(fetched.route, PUBLIC_HALL, SCHOOL_SHELTER, &context)
        .await;

    assert_eq!(annotation, Annotation::Generated);
    assert_eq!(route.risk_level, RiskLevel::Critical);
    assert_eq!(route.warnings, vec!["AI Analysis: Risk level: LOW. Drive slowly.".to_string()]);
}

#[tokio::test]
async fn routing_failure_yields_direct_high_risk_route() {
    let text = Arc::new(StubTextGenerator::returning("LOW"));
    let annotator = RouteAnnotator::new(
        Arc::new(StubRouteProvider::failing("HTTP 502")),
        text.clone(),
        Duration::from_millis(200),
    );
    let store: Arc<dyn FloodStore> = Arc::new(seeded_store().unwrap());

    let planned = annotator
        .plan(PUBLIC_HALL, SCHOOL_SHELTER, &store, Duration::from_millis(500))
        .await;

    assert_eq!(planned.source, RouteSource::Direct);
    assert_eq!(planned.annotation, Annotation::Skipped);
    assert_eq!(planned.route.risk_level, RiskLevel::High);
    assert_eq!(planned.route.geometry.coordinates.len(), 2);
    assert_eq!(planned.route.warnings, vec![DIRECT_ROUTE_WARNING.to_string()]);
    assert!(text.prompts().is_empty());
}

#[tokio::test]
async fn planned_route_prompt_carries_store_status() {
    let text = Arc::new(StubTextGenerator::returning("MEDIUM risk. Avoid the river road."));
    let annotator = RouteAnnotator::new(
        Arc::new(StubRouteProvider::returning(geometry())),
        text.clone(),
        Duration::from_millis(200),
    );
    let store: Arc<dyn FloodStore> = Arc::new(seeded_store().unwrap());

    let planned = annotator
        .plan(PUBLIC_HALL, SCHOOL_SHELTER, &store, Duration::from_millis(500))
        .await;

    // The seeded HIGH alert in Likas lifts the level above the model's answer.
    assert_eq!(planned.route.risk_level, RiskLevel::Critical);
    let prompts = text.prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("Likas: HIGH risk"));
    assert!(!prompts[0].contains("Sandakan"));
}
