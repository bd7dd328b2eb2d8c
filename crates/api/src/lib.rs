mod rate_limit;

use std::env;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, Path, Query, State};
use axum::http::{header, HeaderValue, Method, Request, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{body::Body, Router};
use ride_booking::dispatch;
use ride_core::{
    fleet, routes, BookingSubmission, BookingWizard, Dictionary, Entries, Language,
    Translator, VehicleCategory,
};
use ride_notify::{
    build_http_client, RelayRequest, RelayResponse, TelegramConfig, TelegramNotifier,
    DEFAULT_TELEGRAM_API_BASE, RELAY_BOOKINGS_PATH,
};
use ride_observability::{AppMetrics, MetricsSnapshot};
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub use crate::rate_limit::IpRateLimiter;

const DEFAULT_BIND: &str = "0.0.0.0:8080";
const DEFAULT_RATE_LIMIT_WINDOW_SECONDS: u64 = 60;
const DEFAULT_RATE_LIMIT_MAX: usize = 10;
const DEFAULT_ALLOWED_ORIGINS: [&str; 4] = [
    "http://localhost:5173",
    "http://127.0.0.1:5173",
    "http://localhost:3000",
    "http://127.0.0.1:3000",
];

/// Runtime settings for the booking backend, normally read from `RIDE_*`
/// environment variables.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind: String,
    pub telegram: Option<TelegramConfig>,
    pub allowed_origins: Vec<String>,
    pub rate_limit_window: Duration,
    pub rate_limit_max: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            telegram: None,
            allowed_origins: parse_allowed_origins(None),
            rate_limit_window: Duration::from_secs(DEFAULT_RATE_LIMIT_WINDOW_SECONDS),
            rate_limit_max: DEFAULT_RATE_LIMIT_MAX,
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Result<Self> {
        let bind = env::var("RIDE_BIND").unwrap_or_else(|_| DEFAULT_BIND.to_string());
        let operator_language =
            Language::from_optional_str(env::var("RIDE_OPERATOR_LANG").ok().as_deref());
        let api_base = env::var("RIDE_TELEGRAM_API_BASE")
            .unwrap_or_else(|_| DEFAULT_TELEGRAM_API_BASE.to_string());

        let telegram = match (
            non_empty_env("RIDE_TELEGRAM_BOT_TOKEN"),
            non_empty_env("RIDE_TELEGRAM_CHAT_ID"),
        ) {
            (Some(token), Some(chat_id)) => Some(
                TelegramConfig::new(&api_base, token, chat_id, operator_language)
                    .context("invalid telegram configuration")?,
            ),
            (None, None) => None,
            _ => {
                warn!("RIDE_TELEGRAM_BOT_TOKEN and RIDE_TELEGRAM_CHAT_ID must be set together, telegram delivery disabled");
                None
            }
        };

        let rate_limit_window = Duration::from_secs(
            env::var("RIDE_RATE_LIMIT_WINDOW_SECONDS")
                .ok()
                .and_then(|value| value.parse::<u64>().ok())
                .unwrap_or(DEFAULT_RATE_LIMIT_WINDOW_SECONDS),
        );
        let rate_limit_max = env::var("RIDE_RATE_LIMIT_MAX")
            .ok()
            .and_then(|value| value.parse::<usize>().ok())
            .unwrap_or(DEFAULT_RATE_LIMIT_MAX);

        Ok(Self {
            bind,
            telegram,
            allowed_origins: parse_allowed_origins(env::var("RIDE_ALLOWED_ORIGINS").ok()),
            rate_limit_window,
            rate_limit_max,
        })
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_allowed_origins(raw: Option<String>) -> Vec<String> {
    raw.map(|value| {
        value
            .split(',')
            .map(|origin| origin.trim().trim_end_matches('/').to_string())
            .filter(|origin| !origin.is_empty())
            .collect::<Vec<_>>()
    })
    .unwrap_or_else(|| {
        DEFAULT_ALLOWED_ORIGINS
            .iter()
            .map(|value| value.to_string())
            .collect()
    })
}

#[derive(Clone)]
pub struct ApiState {
    pub notifier: Option<Arc<TelegramNotifier>>,
    pub metrics: Arc<AppMetrics>,
    pub limiter: IpRateLimiter,
    pub allowed_origins: Arc<Vec<String>>,
}

pub fn build_app(config: ApiConfig) -> Result<Router> {
    let metrics = AppMetrics::shared();

    let notifier = match config.telegram {
        Some(telegram) => {
            let client = build_http_client().context("failed to build http client")?;
            info!(telegram = ?telegram, "telegram delivery configured");
            Some(Arc::new(TelegramNotifier::new(client, telegram)))
        }
        None => {
            warn!("telegram credentials missing, bookings will be refused");
            None
        }
    };

    let state = ApiState {
        notifier,
        metrics,
        limiter: IpRateLimiter::new(config.rate_limit_window, config.rate_limit_max),
        allowed_origins: Arc::new(config.allowed_origins),
    };

    Ok(build_router(state))
}

pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/vehicles", get(vehicles))
        .route("/v1/routes", get(route_catalog))
        .route("/v1/i18n/{lang}", get(dictionary))
        .route(RELAY_BOOKINGS_PATH, post(create_booking))
        .layer(build_cors_layer(&state.allowed_origins))
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(RequestBodyLimitLayer::new(64 * 1024))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ))
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp_utc: String,
    telegram_configured: bool,
    metrics: MetricsSnapshot,
}

async fn health(State(state): State<ApiState>) -> impl IntoResponse {
    let payload = HealthResponse {
        status: "ok",
        timestamp_utc: chrono::Utc::now().to_rfc3339(),
        telegram_configured: state.notifier.is_some(),
        metrics: state.metrics.snapshot(),
    };
    (StatusCode::OK, Json(payload))
}

#[derive(Debug, Default, Deserialize)]
struct CatalogQuery {
    lang: Option<String>,
    popular: Option<bool>,
}

impl CatalogQuery {
    fn translator(&self) -> Dictionary {
        Dictionary::new(Language::from_optional_str(self.lang.as_deref()))
    }
}

#[derive(Debug, Serialize)]
struct VehicleView {
    category: VehicleCategory,
    capacity: u8,
    title: String,
    capacity_label: String,
    models: Vec<&'static str>,
}

async fn vehicles(Query(query): Query<CatalogQuery>) -> impl IntoResponse {
    let translator = query.translator();
    let items = fleet()
        .into_iter()
        .map(|entry| {
            let count = entry.capacity.to_string();
            VehicleView {
                category: entry.category,
                capacity: entry.capacity,
                title: translator.text(&entry.title_key),
                capacity_label: translator
                    .translate("vehicles.capacity", &[("count", count.as_str())]),
                models: entry.models,
            }
        })
        .collect::<Vec<_>>();
    Json(serde_json::json!({
        "language": translator.language(),
        "vehicles": items,
    }))
}

#[derive(Debug, Serialize)]
struct RouteView {
    id: &'static str,
    from: &'static str,
    to: &'static str,
    name: String,
    description: String,
    duration: String,
    price: String,
    distance: String,
    price_som: u32,
    distance_km: u32,
    popular: bool,
}

async fn route_catalog(Query(query): Query<CatalogQuery>) -> impl IntoResponse {
    let translator = query.translator();
    let popular_only = query.popular.unwrap_or(false);
    let items = routes()
        .iter()
        .filter(|route| !popular_only || route.popular)
        .map(|route| {
            let price = route.price_som.to_string();
            let distance = route.distance_km.to_string();
            RouteView {
                id: route.id,
                from: route.from,
                to: route.to,
                name: translator.text(route.name_key),
                description: translator.text(&route.description_key()),
                duration: translator.translate("routes.duration", &[("time", route.duration)]),
                price: translator.translate("routes.price", &[("price", price.as_str())]),
                distance: translator
                    .translate("routes.distance", &[("distance", distance.as_str())]),
                price_som: route.price_som,
                distance_km: route.distance_km,
                popular: route.popular,
            }
        })
        .collect::<Vec<_>>();
    Json(serde_json::json!({
        "language": translator.language(),
        "routes": items,
    }))
}

#[derive(Debug, Serialize)]
struct DictionaryResponse {
    language: Language,
    entries: &'static Entries,
}

async fn dictionary(Path(lang): Path<String>) -> Response {
    match Language::parse(&lang) {
        Some(language) => Json(DictionaryResponse {
            language,
            entries: Dictionary::entries(language),
        })
        .into_response(),
        None => error_response(
            StatusCode::NOT_FOUND,
            "unknown_language",
            format!("no dictionary for `{lang}`"),
        ),
    }
}

fn error_response(status: StatusCode, error: &str, message: String) -> Response {
    (
        status,
        Json(serde_json::json!({
            "error": error,
            "message": message,
        })),
    )
        .into_response()
}

/// First tag of `Accept-Language`, for responses produced before the body is read.
fn header_language(request: &Request<Body>) -> Language {
    let tag = request
        .headers()
        .get(header::ACCEPT_LANGUAGE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .and_then(|value| value.split(';').next());
    Language::from_optional_str(tag)
}

async fn create_booking(
    State(state): State<ApiState>,
    payload: Result<Json<RelayRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "malformed booking request");
            return error_response(rejection.status(), "invalid_request", rejection.body_text());
        }
    };

    let language = Language::from_optional_str(request.language.as_deref());
    let translator = Dictionary::new(language);
    let wizard = BookingWizard::from_draft(request.draft);

    if let Err(validation) = wizard.validate_all() {
        state.metrics.inc_invalid();
        let labels = validation
            .missing
            .iter()
            .map(|field| translator.text(field.label_key()))
            .collect::<Vec<_>>()
            .join(", ");
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(serde_json::json!({
                "error": "validation_failed",
                "message": translator.translate("booking.required", &[("fields", labels.as_str())]),
                "step": validation.step,
                "missing": validation.missing,
            })),
        )
            .into_response();
    }

    let Some(notifier) = state.notifier.as_ref() else {
        return error_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "delivery_unavailable",
            translator.text("errors.delivery_unavailable"),
        );
    };

    let mut submission = BookingSubmission::capture(wizard.draft().clone(), language);
    if let Some(reference) = request.reference {
        submission.reference = reference;
    }

    let result = dispatch(notifier.as_ref(), &submission, &translator, &state.metrics).await;
    let status = if result.success {
        StatusCode::OK
    } else {
        StatusCode::BAD_GATEWAY
    };

    (
        status,
        Json(RelayResponse {
            success: result.success,
            message: result.message,
            reference: Some(submission.reference),
        }),
    )
        .into_response()
}

fn build_cors_layer(allowed_origins: &Arc<Vec<String>>) -> CorsLayer {
    let origins = allowed_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect::<Vec<_>>();
    let origins = if origins.is_empty() {
        vec![HeaderValue::from_static(DEFAULT_ALLOWED_ORIGINS[0])]
    } else {
        origins
    };

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}

async fn rate_limit_middleware(
    State(state): State<ApiState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if request.method() != Method::POST || request.uri().path() != RELAY_BOOKINGS_PATH {
        return next.run(request).await;
    }

    let ip = request_ip(&request);
    if !state.limiter.allow(&ip) {
        warn!(ip = %ip, "booking rate limit exceeded");
        let translator = Dictionary::new(header_language(&request));
        return error_response(
            StatusCode::TOO_MANY_REQUESTS,
            "rate_limited",
            translator.text("errors.rate_limited"),
        );
    }

    next.run(request).await
}

fn request_ip(request: &Request<Body>) -> String {
    request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| "local".to_string())
}

async fn security_headers_middleware(request: Request<Body>, next: Next) -> Response {
    let mut response = next.run(request).await;

    let headers = response.headers_mut();
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(
        header::HeaderName::from_static("x-frame-options"),
        HeaderValue::from_static("DENY"),
    );
    headers.insert(
        header::HeaderName::from_static("referrer-policy"),
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );
    headers.insert(
        header::HeaderName::from_static("content-security-policy"),
        HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'; base-uri 'none'"),
    );

    response
}
