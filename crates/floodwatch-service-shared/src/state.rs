//! Application state for the HTTP microservices.

use std::sync::Arc;

use floodwatch_lib::{Error as LibError, Floodwatch, FloodwatchConfig};

#[derive(Debug)]
pub enum AppStateError {
    /// The directory meant to hold the flood database does not exist.
    DatabaseDirNotFound(String),
    /// The store or HTTP clients could not be built.
    Init(LibError),
}

impl std::fmt::Display for AppStateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DatabaseDirNotFound(path) => write!(f, "database directory not found: {path}"),
            Self::Init(e) => write!(f, "failed to initialise floodwatch: {e}"),
        }
    }
}

impl std::error::Error for AppStateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Init(e) => Some(e),
            Self::DatabaseDirNotFound(_) => None,
        }
    }
}

impl From<LibError> for AppStateError {
    fn from(err: LibError) -> Self {
        Self::Init(err)
    }
}

/// State shared by every handler through axum's `State` extractor.
///
/// Cloning is cheap; the engine sits behind an `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    service: String,
    floodwatch: Floodwatch,
}

impl AppState {
    /// Open the store named by `config` and build the outbound clients.
    ///
    /// The database file is created with its schema when missing; its
    /// directory must already exist.
    pub fn load(service: &str, config: FloodwatchConfig) -> Result<Self, AppStateError> {
        let db_path = &config.db_path;
        if let Some(dir) = db_path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                return Err(AppStateError::DatabaseDirNotFound(dir.display().to_string()));
            }
        }

        tracing::info!(service, db_path = %db_path.display(), "opening flood store");
        let floodwatch = Floodwatch::from_config(config)?;
        Ok(Self::from_engine(service, floodwatch))
    }

    pub fn from_engine(service: &str, floodwatch: Floodwatch) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                service: service.to_string(),
                floodwatch,
            }),
        }
    }

    pub fn service(&self) -> &str {
        &self.inner.service
    }

    pub fn floodwatch(&self) -> &Floodwatch {
        &self.inner.floodwatch
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("service", &self.inner.service)
            .field("floodwatch", &self.inner.floodwatch)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn missing_database_directory_is_reported() {
        let config = FloodwatchConfig {
            db_path: PathBuf::from("/nonexistent/floodwatch/flood.db"),
            ..FloodwatchConfig::default()
        };
        match AppState::load("reports", config) {
            Err(AppStateError::DatabaseDirNotFound(path)) => assert!(path.contains("nonexistent")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn load_creates_a_fresh_database() {
        let dir = std::env::temp_dir().join(format!("floodwatch-state-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let config = FloodwatchConfig {
            db_path: dir.join("flood.db"),
            ..FloodwatchConfig::default()
        };

        let state = AppState::load("reports", config).unwrap();
        assert_eq!(state.service(), "reports");
        assert!(dir.join("flood.db").exists());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn debug_redacts_through_the_engine() {
        let config = FloodwatchConfig {
            textgen_api_key: Some("secret-key".to_string()),
            ..FloodwatchConfig::default()
        };
        let state = crate::test_utils::state_with_config(config);
        let debug = format!("{state:?}");
        assert!(debug.contains("AppState"));
        assert!(!debug.contains("secret-key"));
    }
}
