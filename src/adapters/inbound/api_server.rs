//! Weather API Server
//!
//! HTTP API exposing the aggregated weather reads behind bearer token
//! authentication, with CORS limited to the configured frontend origin.

use crate::application::auth_gateway::{AuthGateway, Claims};
use crate::application::weather_aggregator::{CityLookup, WeatherAggregator};
use crate::domain::entities::WeatherRecord;
use crate::domain::ports::{AuthError, DataLoadError};
use crate::domain::value_objects::CityCode;
use crate::infrastructure::shutdown::ShutdownController;
use anyhow::Context;
use axum::{
    extract::{Path, Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Extension, Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

/// Health response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub cached_cities: usize,
}

/// API Server state.
#[derive(Clone)]
pub struct ApiState {
    pub aggregator: Arc<WeatherAggregator>,
    pub gateway: Arc<AuthGateway>,
}

impl ApiState {
    pub fn new(aggregator: Arc<WeatherAggregator>, gateway: Arc<AuthGateway>) -> Self {
        Self {
            aggregator,
            gateway,
        }
    }
}

/// Request failures and the responses they turn into.
#[derive(Debug)]
pub enum ApiError {
    Unauthorized(AuthError),
    DatasetUnavailable(DataLoadError),
    CityNotFound(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized(err) => {
                let challenge = if err.token_presented() {
                    r#"Bearer error="invalid_token""#
                } else {
                    "Bearer"
                };
                (
                    StatusCode::UNAUTHORIZED,
                    [(header::WWW_AUTHENTICATE, challenge)],
                    Json(serde_json::json!({
                        "error": "unauthorized"
                    })),
                )
                    .into_response()
            }
            ApiError::DatasetUnavailable(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "error": "city list unavailable"
                })),
            )
                .into_response(),
            ApiError::CityNotFound(city_code) => (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({
                    "error": "weather not found for city",
                    "cityCode": city_code
                })),
            )
                .into_response(),
        }
    }
}

/// API Server for weather reads.
pub struct ApiServer {
    listen_addr: String,
    state: ApiState,
    cors_origin: HeaderValue,
}

impl ApiServer {
    pub fn new(listen_addr: String, state: ApiState, cors_allowed_origin: &str) -> anyhow::Result<Self> {
        let cors_origin = HeaderValue::from_str(cors_allowed_origin)
            .with_context(|| format!("invalid CORS origin {:?}", cors_allowed_origin))?;
        Ok(Self {
            listen_addr,
            state,
            cors_origin,
        })
    }

    pub fn router(&self) -> Router {
        build_router(self.state.clone(), self.cors_origin.clone())
    }

    /// Bind the configured address and serve until `shutdown` fires.
    pub async fn run(&self, shutdown: ShutdownController) -> anyhow::Result<()> {
        let listener = TcpListener::bind(&self.listen_addr)
            .await
            .with_context(|| format!("failed to bind {}", self.listen_addr))?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` fires.
    pub async fn serve(&self, listener: TcpListener, shutdown: ShutdownController) -> anyhow::Result<()> {
        tracing::info!("weather API listening on {}", listener.local_addr()?);

        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move { shutdown.wait().await })
            .await?;

        tracing::info!("weather API stopped");
        Ok(())
    }
}

/// Every route requires a bearer token. CORS sits outermost, so preflight
/// requests are answered before auth.
pub fn build_router(state: ApiState, cors_origin: HeaderValue) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/api/weather", get(all_weather_handler))
        .route("/api/weather/:city_code", get(city_weather_handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_bearer))
        .layer(cors_layer(cors_origin))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origin: HeaderValue) -> CorsLayer {
    // A list omits the allow-origin header for non-matching origins
    CorsLayer::new()
        .allow_origin(AllowOrigin::list([origin]))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

async fn require_bearer(
    State(state): State<ApiState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let authorization = match request.headers().get(header::AUTHORIZATION) {
        Some(value) => Some(
            value
                .to_str()
                .map_err(|_| ApiError::Unauthorized(AuthError::MalformedHeader))?
                .to_string(),
        ),
        None => None,
    };

    let claims = state
        .gateway
        .authorize(authorization.as_deref())
        .await
        .map_err(ApiError::Unauthorized)?;

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

// Handler functions

async fn health_handler(State(state): State<ApiState>) -> impl IntoResponse {
    let response = HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        cached_cities: state.aggregator.cache().len(),
    };
    Json(response)
}

async fn all_weather_handler(
    State(state): State<ApiState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<Vec<WeatherRecord>>, ApiError> {
    tracing::debug!(
        "weather list requested by {}",
        claims.sub.as_deref().unwrap_or("<none>")
    );
    let records = state
        .aggregator
        .get_all_weather()
        .await
        .map_err(ApiError::DatasetUnavailable)?;
    Ok(Json(records))
}

async fn city_weather_handler(
    State(state): State<ApiState>,
    Path(city_code): Path<String>,
) -> Result<Json<WeatherRecord>, ApiError> {
    let Some(code) = CityCode::new(&city_code) else {
        return Err(ApiError::CityNotFound(city_code));
    };

    match state.aggregator.get_weather_by_city_code(&code).await {
        CityLookup::Found(record) => Ok(Json(record)),
        CityLookup::NotFound | CityLookup::Unavailable(_) => {
            Err(ApiError::CityNotFound(code.to_string()))
        }
    }
}
