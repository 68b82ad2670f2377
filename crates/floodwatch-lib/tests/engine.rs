use std::sync::Arc;
use std::time::{Duration, Instant};

use tempfile::tempdir;

use floodwatch_lib::api::{AssistantQuery, ShelterQuery};
use floodwatch_lib::assistant::ASSISTANT_FALLBACK;
use floodwatch_lib::store::NewDistressCall;
use floodwatch_lib::test_helpers::{
    seeded_store, StubPoiSource, StubRouteProvider, StubTextGenerator,
};
use floodwatch_lib::{
    Coordinate, Error, FloodStore, Floodwatch, FloodwatchConfig, RiskLevel, SqliteStore,
};

const KK: Coordinate = Coordinate::new(5.9804, 116.0735);

fn config() -> FloodwatchConfig {
    FloodwatchConfig {
        http_timeout_ms: 200,
        status_timeout_ms: 500,
        ..FloodwatchConfig::default()
    }
}

fn engine(store: Arc<dyn FloodStore>, text: StubTextGenerator) -> Floodwatch {
    Floodwatch::with_parts(
        config(),
        store,
        Arc::new(StubPoiSource::returning(Vec::new())),
        Arc::new(StubRouteProvider::failing("offline")),
        Arc::new(text),
    )
}

#[tokio::test]
async fn flood_analysis_uses_store_evidence_and_model_text() {
    let floodwatch = engine(
        Arc::new(seeded_store().unwrap()),
        StubTextGenerator::returning(" Risk is elevated near Likas. "),
    );

    let analysis = floodwatch.flood_analysis(KK).await;

    assert!(!analysis.fallback);
    assert_eq!(analysis.analysis, "Risk is elevated near Likas.");
    assert_eq!(analysis.risk_level, RiskLevel::Critical);
    // HIGH (30) + MEDIUM (15) within 20 km.
    assert_eq!(analysis.confidence, 45);
    assert_eq!(analysis.flood_alerts.len(), 2);
    assert_eq!(analysis.evacuation_points.len(), 3);
    assert_eq!(analysis.location, KK);
}

#[tokio::test]
async fn flood_analysis_falls_back_when_the_model_fails() {
    let floodwatch = engine(
        Arc::new(SqliteStore::in_memory().unwrap()),
        StubTextGenerator::failing("throttled"),
    );

    let analysis = floodwatch.flood_analysis(KK).await;

    assert!(analysis.fallback);
    assert!(analysis.analysis.contains("RISK LEVEL: MODERATE"));
    assert_eq!(analysis.risk_level, RiskLevel::Low);
    assert_eq!(analysis.confidence, 0);
}

#[tokio::test]
async fn assistant_falls_back_with_emergency_number() {
    let floodwatch = engine(
        Arc::new(seeded_store().unwrap()),
        StubTextGenerator::hanging(Duration::from_secs(5)),
    );

    let reply = floodwatch
        .ai_assistant(AssistantQuery {
            message: "Should I evacuate?".to_string(),
            location: Some(KK),
        })
        .await;

    assert!(reply.fallback);
    assert_eq!(reply.response, ASSISTANT_FALLBACK);
    assert!(!reply.timestamp.is_empty());
}

#[tokio::test]
async fn assistant_context_lists_nearby_shelters_by_capacity() {
    let text = Arc::new(StubTextGenerator::returning("Go to Stadium Likas."));
    let floodwatch = Floodwatch::with_parts(
        config(),
        Arc::new(seeded_store().unwrap()),
        Arc::new(StubPoiSource::returning(Vec::new())),
        Arc::new(StubRouteProvider::failing("offline")),
        text.clone(),
    );

    let reply = floodwatch
        .ai_assistant(AssistantQuery {
            message: "Where is the biggest shelter?".to_string(),
            location: Some(KK),
        })
        .await;

    assert!(!reply.fallback);
    let prompt = &text.prompts()[0];
    let stadium = prompt.find("Stadium Likas").unwrap();
    let school = prompt.find("SK Kota Kinabalu").unwrap();
    assert!(stadium < school);
}

#[tokio::test]
async fn nearest_shelter_uses_configured_radius_and_fallback() {
    let floodwatch = engine(
        Arc::new(SqliteStore::in_memory().unwrap()),
        StubTextGenerator::returning("unused"),
    );
    let lookup = floodwatch
        .nearest_shelter(ShelterQuery {
            location: KK,
            radius_m: None,
        })
        .await;
    assert!(lookup.fallback);
    assert_eq!(lookup.point.name(), Some("Public Hall"));
}

#[tokio::test]
async fn distress_calls_persist_across_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("floodwatch.db");

    {
        let store: Arc<dyn FloodStore> = Arc::new(SqliteStore::open(&path).unwrap());
        let floodwatch = engine(store, StubTextGenerator::returning("unused"));
        let created = floodwatch
            .record_distress_call(NewDistressCall {
                coordinate: KK,
                message: Some("Trapped on roof".to_string()),
            })
            .await
            .unwrap();
        assert!(created.success);
        assert!(created.call_id > 0);
    }

    let reopened = SqliteStore::open(&path).unwrap();
    let calls = reopened.recent_distress_calls(10).unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].user_message.as_deref(), Some("Trapped on roof"));
    assert_eq!(calls[0].rescue_status, "PENDING");
}

struct BrokenStore;

impl FloodStore for BrokenStore {
    fn active_alerts(&self) -> floodwatch_lib::Result<Vec<floodwatch_lib::store::FloodAlert>> {
        Err(Error::StoreUnavailable {
            message: "down".to_string(),
        })
    }

    fn recent_active_alerts(
        &self,
        _limit: usize,
    ) -> floodwatch_lib::Result<Vec<floodwatch_lib::store::FloodAlert>> {
        Err(Error::InvalidRequest {
            message: "wrong kind on purpose".to_string(),
        })
    }

    fn evacuation_points(
        &self,
    ) -> floodwatch_lib::Result<Vec<floodwatch_lib::store::EvacuationPoint>> {
        Err(Error::StoreUnavailable {
            message: "down".to_string(),
        })
    }

    fn insert_distress_call(&self, _call: &NewDistressCall) -> floodwatch_lib::Result<i64> {
        Err(Error::StoreUnavailable {
            message: "down".to_string(),
        })
    }

    fn recent_distress_calls(
        &self,
        _limit: usize,
    ) -> floodwatch_lib::Result<Vec<floodwatch_lib::store::DistressCall>> {
        Err(Error::StoreUnavailable {
            message: "down".to_string(),
        })
    }

    fn pending_distress_calls(
        &self,
    ) -> floodwatch_lib::Result<Vec<floodwatch_lib::store::DistressCall>> {
        Err(Error::StoreUnavailable {
            message: "down".to_string(),
        })
    }

    fn ping(&self) -> floodwatch_lib::Result<()> {
        Err(Error::StoreUnavailable {
            message: "down".to_string(),
        })
    }
}

#[tokio::test]
async fn store_outage_is_reported_as_unavailable() {
    let floodwatch = engine(Arc::new(BrokenStore), StubTextGenerator::returning("ok"));

    let err = floodwatch.recent_flood_alerts().await.unwrap_err();
    assert!(matches!(err, Error::StoreUnavailable { .. }));
    assert!(floodwatch.store_ready().await.is_err());

    // Analysis still answers without store evidence.
    let analysis = floodwatch.flood_analysis(KK).await;
    assert_eq!(analysis.risk_level, RiskLevel::Low);
    assert!(analysis.flood_alerts.is_empty());
}

/// Store whose every query blocks for `delay` before answering.
struct SlowStore {
    delay: Duration,
}

impl SlowStore {
    fn wait(&self) {
        std::thread::sleep(self.delay);
    }
}

impl FloodStore for SlowStore {
    fn active_alerts(&self) -> floodwatch_lib::Result<Vec<floodwatch_lib::store::FloodAlert>> {
        self.wait();
        Ok(Vec::new())
    }

    fn recent_active_alerts(
        &self,
        _limit: usize,
    ) -> floodwatch_lib::Result<Vec<floodwatch_lib::store::FloodAlert>> {
        self.wait();
        Ok(Vec::new())
    }

    fn evacuation_points(
        &self,
    ) -> floodwatch_lib::Result<Vec<floodwatch_lib::store::EvacuationPoint>> {
        self.wait();
        Ok(Vec::new())
    }

    fn insert_distress_call(&self, _call: &NewDistressCall) -> floodwatch_lib::Result<i64> {
        self.wait();
        Ok(1)
    }

    fn recent_distress_calls(
        &self,
        _limit: usize,
    ) -> floodwatch_lib::Result<Vec<floodwatch_lib::store::DistressCall>> {
        self.wait();
        Ok(Vec::new())
    }

    fn pending_distress_calls(
        &self,
    ) -> floodwatch_lib::Result<Vec<floodwatch_lib::store::DistressCall>> {
        self.wait();
        Ok(Vec::new())
    }

    fn ping(&self) -> floodwatch_lib::Result<()> {
        self.wait();
        Ok(())
    }
}

#[tokio::test]
async fn slow_store_listings_hit_the_status_deadline() {
    let floodwatch = Floodwatch::with_parts(
        FloodwatchConfig {
            http_timeout_ms: 200,
            status_timeout_ms: 100,
            ..FloodwatchConfig::default()
        },
        Arc::new(SlowStore {
            delay: Duration::from_secs(2),
        }),
        Arc::new(StubPoiSource::returning(Vec::new())),
        Arc::new(StubRouteProvider::failing("offline")),
        Arc::new(StubTextGenerator::returning("unused")),
    );

    let started = Instant::now();
    let err = floodwatch.recent_flood_alerts().await.unwrap_err();
    assert!(started.elapsed() < Duration::from_secs(1));
    match err {
        Error::StoreUnavailable { message } => assert!(message.contains("within 100 ms")),
        other => panic!("unexpected error: {other:?}"),
    }

    let started = Instant::now();
    let err = floodwatch
        .record_distress_call(NewDistressCall {
            coordinate: KK,
            message: None,
        })
        .await
        .unwrap_err();
    assert!(started.elapsed() < Duration::from_secs(1));
    assert!(matches!(err, Error::StoreUnavailable { .. }));

    assert!(floodwatch.recent_distress_calls().await.is_err());
    assert!(floodwatch.nearest_evacuation_points(KK).await.is_err());
    assert!(floodwatch.store_ready().await.is_err());
}
