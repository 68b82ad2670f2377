//! Engine held for the life of the Lambda container.
//!
//! The store connection and HTTP clients are built on the first invocation
//! and reused by every later one. A failed initialisation is remembered as
//! well, so each invocation answers 500 instead of retrying.

use std::sync::OnceLock;
use std::time::Instant;

use tracing::{error, info};

use floodwatch_lib::{Error as LibError, Floodwatch, FloodwatchConfig};

static RUNTIME: OnceLock<Result<LambdaRuntime, InitError>> = OnceLock::new();

#[derive(Debug, Clone)]
pub struct InitError {
    pub message: String,
}

impl std::fmt::Display for InitError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Lambda initialization failed: {}", self.message)
    }
}

impl std::error::Error for InitError {}

impl From<LibError> for InitError {
    fn from(err: LibError) -> Self {
        Self {
            message: err.to_string(),
        }
    }
}

pub struct LambdaRuntime {
    floodwatch: Floodwatch,
}

impl LambdaRuntime {
    pub fn from_engine(floodwatch: Floodwatch) -> Self {
        Self { floodwatch }
    }

    pub fn floodwatch(&self) -> &Floodwatch {
        &self.floodwatch
    }
}

impl std::fmt::Debug for LambdaRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LambdaRuntime")
            .field("floodwatch", &self.floodwatch)
            .finish()
    }
}

/// Build the runtime from `config` on first use.
///
/// Later calls return the first outcome and ignore `config`.
pub fn init_runtime(config: FloodwatchConfig) -> Result<&'static LambdaRuntime, &'static InitError> {
    RUNTIME
        .get_or_init(|| {
            let start = Instant::now();
            let db_path = config.db_path.display().to_string();
            let built = Floodwatch::from_config(config)
                .map(LambdaRuntime::from_engine)
                .map_err(InitError::from);
            match &built {
                Ok(_) => info!(
                    db_path = %db_path,
                    init_ms = start.elapsed().as_millis(),
                    "Lambda runtime initialization complete"
                ),
                Err(e) => error!(db_path = %db_path, error = %e, "Lambda runtime initialization failed"),
            }
            built
        })
        .as_ref()
}
