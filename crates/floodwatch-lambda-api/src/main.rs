//! AWS Lambda function serving the Floodwatch API behind API Gateway.
//!
//! One function answers every path of the HTTP services, dispatching on the
//! proxy event's method and path. `OPTIONS` on any path is an empty 200 with
//! CORS headers.
//!
//! `FLOODWATCH_DB_PATH` defaults to `/tmp/floodwatch.db`, the writable
//! location inside a Lambda container.

use std::path::PathBuf;

use http::StatusCode;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use tracing::info;

use floodwatch_lambda_shared::{
    from_lib_error, init_runtime, init_tracing, InitError, LambdaRuntime, ProxyRequest,
    ProxyResponse,
};
use floodwatch_lib::api::{
    AssistantRequest, DistressCallRequest, LocationRequest, NearestShelterRequest, RouteRequest,
};
use floodwatch_lib::{parse_request, ErrorBody, Floodwatch, FloodwatchConfig, Result};

const LAMBDA_DB_PATH: &str = "/tmp/floodwatch.db";

const NEAREST_SHELTER: &str = "/nearest-evacuation-point";
const OPTIMIZE_ROUTE: &str = "/optimize-route";
const FLOOD_ANALYSIS: &str = "/flood-analysis";
const AI_ASSISTANT: &str = "/ai-assistant";
const DISTRESS_CALLS: &str = "/distress-calls";
const FLOOD_ALERTS: &str = "/flood-alerts";
const EVACUATION_POINTS: &str = "/evacuation-points";

const KNOWN_PATHS: [&str; 7] = [
    NEAREST_SHELTER,
    OPTIMIZE_ROUTE,
    FLOOD_ANALYSIS,
    AI_ASSISTANT,
    DISTRESS_CALLS,
    FLOOD_ALERTS,
    EVACUATION_POINTS,
];

#[tokio::main]
async fn main() -> std::result::Result<(), Error> {
    init_tracing();

    let runtime = init_runtime(lambda_config());

    lambda_runtime::run(service_fn(move |event| handler(runtime, event))).await
}

fn lambda_config() -> FloodwatchConfig {
    let mut config = FloodwatchConfig::from_env();
    if std::env::var_os("FLOODWATCH_DB_PATH").is_none() {
        config.db_path = PathBuf::from(LAMBDA_DB_PATH);
    }
    config
}

async fn handler(
    runtime: std::result::Result<&'static LambdaRuntime, &'static InitError>,
    event: LambdaEvent<ProxyRequest>,
) -> std::result::Result<ProxyResponse, Error> {
    let request = event.payload;
    let request_id = request
        .request_id_header()
        .map(str::to_string)
        .unwrap_or(event.context.request_id);

    info!(
        request_id = %request_id,
        method = %request.http_method,
        path = %request.path,
        "handling request"
    );

    let response = match runtime {
        Ok(runtime) => dispatch(runtime.floodwatch(), &request, &request_id).await,
        Err(e) => ProxyResponse::error(
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorBody::new("Internal server error")
                .with_details(e.message.clone())
                .with_instance(&request_id),
        ),
    };

    info!(request_id = %request_id, status = response.status_code, "request completed");
    Ok(response)
}

/// Answer one proxy request.
async fn dispatch(
    floodwatch: &Floodwatch,
    request: &ProxyRequest,
    request_id: &str,
) -> ProxyResponse {
    let method = request.http_method.to_ascii_uppercase();
    if method == "OPTIONS" {
        return ProxyResponse::preflight();
    }

    let path = request.route_path();
    let body = request.body_bytes();
    route(floodwatch, &method, path, &body, request_id)
        .await
        .unwrap_or_else(|err| from_lib_error(&err, request_id))
}

async fn route(
    floodwatch: &Floodwatch,
    method: &str,
    path: &str,
    body: &[u8],
    request_id: &str,
) -> Result<ProxyResponse> {
    let response = match (method, path) {
        ("POST", NEAREST_SHELTER) => {
            let query = parse_request::<NearestShelterRequest>(body)?;
            ProxyResponse::ok(&floodwatch.nearest_shelter(query).await)
        }
        ("POST", OPTIMIZE_ROUTE) => {
            let (start, end) = parse_request::<RouteRequest>(body)?;
            ProxyResponse::ok(&floodwatch.optimize_route(start, end).await.route)
        }
        ("POST", FLOOD_ANALYSIS) => {
            let location = parse_request::<LocationRequest>(body)?;
            ProxyResponse::ok(&floodwatch.flood_analysis(location).await)
        }
        ("POST", AI_ASSISTANT) => {
            let query = parse_request::<AssistantRequest>(body)?;
            ProxyResponse::ok(&floodwatch.ai_assistant(query).await)
        }
        ("GET", DISTRESS_CALLS) => ProxyResponse::ok(&floodwatch.recent_distress_calls().await?),
        ("POST", DISTRESS_CALLS) => {
            let call = parse_request::<DistressCallRequest>(body)?;
            ProxyResponse::ok(&floodwatch.record_distress_call(call).await?)
        }
        ("GET", FLOOD_ALERTS) => ProxyResponse::ok(&floodwatch.recent_flood_alerts().await?),
        ("POST", EVACUATION_POINTS) => {
            let location = parse_request::<LocationRequest>(body)?;
            ProxyResponse::ok(&floodwatch.nearest_evacuation_points(location).await?)
        }
        (_, path) if KNOWN_PATHS.contains(&path) => ProxyResponse::error(
            StatusCode::METHOD_NOT_ALLOWED,
            ErrorBody::new("Method not allowed").with_instance(request_id),
        ),
        _ => ProxyResponse::error(
            StatusCode::NOT_FOUND,
            ErrorBody::new("Not found").with_instance(request_id),
        ),
    };
    Ok(response)
}
