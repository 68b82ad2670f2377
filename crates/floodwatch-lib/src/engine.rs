//! Request-level operations shared by the service and lambda surfaces.
//!
//! [`Floodwatch`] owns the configured collaborators. Each method maps to one
//! endpoint and returns the response payload; only the store-backed listings
//! can fail, with [`Error::StoreUnavailable`].

use std::sync::Arc;

use reqwest::Client;
use tracing::info;

use crate::analysis::{FloodAnalysis, FloodAnalyzer, FloodContext};
use crate::annotate::{PlannedRoute, RouteAnnotator};
use crate::api::{
    AssistantQuery, DistressCallCreated, DistressCallList, EvacuationPointList, FloodAlertList,
    ShelterQuery,
};
use crate::assistant::{Assistant, AssistantContext, AssistantReply};
use crate::config::FloodwatchConfig;
use crate::error::{Error, Result};
use crate::fetch::with_timeout;
use crate::geo::Coordinate;
use crate::osrm::{OsrmClient, RouteProvider};
use crate::overpass::{OverpassClient, PoiSource};
use crate::shelter::{NearestShelterResolver, ShelterLookup};
use crate::store::{self, FloodStore, NewDistressCall, SqliteStore};
use crate::textgen::{BedrockTextClient, TextGenerator};

/// Number of rows returned by the listing endpoints.
pub const RECENT_LIMIT: usize = 10;

/// Number of stored evacuation points returned for a location.
pub const NEAREST_POINTS_LIMIT: usize = 5;

#[derive(Clone)]
pub struct Floodwatch {
    config: Arc<FloodwatchConfig>,
    store: Arc<dyn FloodStore>,
    resolver: NearestShelterResolver,
    annotator: RouteAnnotator,
    analyzer: FloodAnalyzer,
    assistant: Assistant,
}

impl Floodwatch {
    /// Open the store and build HTTP clients from `config`.
    pub fn from_config(config: FloodwatchConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.http_timeout()).build()?;
        let store: Arc<dyn FloodStore> = Arc::new(SqliteStore::open(&config.db_path)?);
        let poi = Arc::new(OverpassClient::new(client.clone(), config.overpass_url.clone()));
        let routes = Arc::new(OsrmClient::new(client.clone(), config.osrm_url.clone()));
        let text = Arc::new(BedrockTextClient::new(
            client,
            config.textgen_url.clone(),
            config.textgen_model.clone(),
            config.textgen_api_key.clone(),
        ));
        info!(
            db_path = %config.db_path.display(),
            textgen_enabled = config.textgen_enabled(),
            "floodwatch collaborators configured"
        );
        Ok(Self::with_parts(config, store, poi, routes, text))
    }

    /// Assemble from explicit collaborators.
    pub fn with_parts(
        config: FloodwatchConfig,
        store: Arc<dyn FloodStore>,
        poi: Arc<dyn PoiSource>,
        routes: Arc<dyn RouteProvider>,
        text: Arc<dyn TextGenerator>,
    ) -> Self {
        let timeout = config.http_timeout();
        Self {
            resolver: NearestShelterResolver::new(poi, timeout),
            annotator: RouteAnnotator::new(routes, Arc::clone(&text), timeout),
            analyzer: FloodAnalyzer::new(Arc::clone(&text), timeout),
            assistant: Assistant::new(text, timeout),
            store,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &FloodwatchConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn FloodStore> {
        &self.store
    }

    pub async fn nearest_shelter(&self, query: ShelterQuery) -> ShelterLookup {
        let radius_m = query.radius_m.unwrap_or(self.config.search_radius_m);
        self.resolver.resolve(query.location, radius_m).await
    }

    pub async fn optimize_route(&self, start: Coordinate, end: Coordinate) -> PlannedRoute {
        self.annotator
            .plan(start, end, &self.store, self.config.status_timeout())
            .await
    }

    pub async fn flood_analysis(&self, location: Coordinate) -> FloodAnalysis {
        let context = FloodContext::load(&self.store, location, self.config.status_timeout()).await;
        self.analyzer.analyze(location, context).await
    }

    pub async fn ai_assistant(&self, query: AssistantQuery) -> AssistantReply {
        let context = match query.location {
            Some(location) => {
                AssistantContext::load(&self.store, location, self.config.status_timeout()).await
            }
            None => None,
        };
        self.assistant.answer(&query.message, context.as_ref()).await
    }

    pub async fn record_distress_call(&self, call: NewDistressCall) -> Result<DistressCallCreated> {
        let call_id = self.store_query(move |s| s.insert_distress_call(&call)).await?;
        info!(call_id, "distress call received");
        Ok(DistressCallCreated {
            success: true,
            call_id,
        })
    }

    pub async fn recent_distress_calls(&self) -> Result<DistressCallList> {
        let calls = self.store_query(|s| s.recent_distress_calls(RECENT_LIMIT)).await?;
        Ok(DistressCallList { calls })
    }

    pub async fn recent_flood_alerts(&self) -> Result<FloodAlertList> {
        let alerts = self.store_query(|s| s.recent_active_alerts(RECENT_LIMIT)).await?;
        Ok(FloodAlertList { alerts })
    }

    pub async fn nearest_evacuation_points(&self, location: Coordinate) -> Result<EvacuationPointList> {
        let points = self
            .store_query(move |s| s.nearest_evacuation_points(location, NEAREST_POINTS_LIMIT))
            .await?;
        Ok(EvacuationPointList { points })
    }

    /// Whether the store answers a trivial query.
    pub async fn store_ready(&self) -> Result<()> {
        self.store_query(|s| s.ping()).await
    }

    /// Store query bounded by the status timeout. Every failure, expiry
    /// included, reads as [`Error::StoreUnavailable`].
    async fn store_query<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn FloodStore) -> Result<T> + Send + 'static,
    {
        with_timeout("store", self.config.status_timeout(), store::query(&self.store, f))
            .await
            .map_err(|err| match err {
                Error::StoreUnavailable { .. } => err,
                other => Error::StoreUnavailable {
                    message: other.to_string(),
                },
            })
    }
}

impl std::fmt::Debug for Floodwatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Floodwatch")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
