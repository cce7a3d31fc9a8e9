//! HTTP surface of the tracker. Handlers share one [AppState] built at startup; the event log is
//! only ever touched through [EventLog]'s lock-acquiring methods.

use std::{net::Ipv4Addr, sync::Arc, time::Duration};

use anyhow::Result;
use args::ServerArgs;
use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderName, Method, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Router,
};
use page::PageTemplate;
use secrecy::ExposeSecret;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};

use crate::{
    analysis::SumsCalculator,
    config::Config,
    error::StoreError,
    storage::event_log::EventLog,
    utils::clock::DefaultClock,
};

pub mod args;
pub mod page;
pub mod shutdown;

pub const STATE_FILE: &str = "stamps.json";

/// Trigger id that clears the log instead of being recorded.
pub const RESET_ID: &str = "Reset";

/// `EX_IOERR` from sysexits.h.
pub const PERSISTENCE_EXIT_CODE: i32 = 74;

#[derive(Clone)]
pub struct AppState {
    log: Arc<EventLog>,
    sums: Arc<SumsCalculator>,
    config: Arc<Config>,
    page: Arc<PageTemplate>,
}

impl AppState {
    pub fn new(
        log: Arc<EventLog>,
        sums: SumsCalculator,
        config: Config,
        page: PageTemplate,
    ) -> Self {
        Self {
            log,
            sums: Arc::new(sums),
            config: Arc::new(config),
            page: Arc::new(page),
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("wrong password")]
    Unauthorized,
    #[error("failed to render index page: {0}")]
    Page(#[from] std::io::Error),
    #[error("failed to serialize sums: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized").into_response(),
            e => {
                error!("Request failed {e:?}");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

/// Starts serving on `args.port` until Ctrl-C.
pub async fn start_server(args: ServerArgs, config: Config) -> Result<()> {
    let log = Arc::new(EventLog::load(args.dir.join(STATE_FILE), Box::new(DefaultClock)).await?);
    let sums = SumsCalculator::new(log.clone(), Box::new(DefaultClock));

    info!("Starting time tracker on {}", config.base_url);
    let state = AppState::new(log, sums, config, PageTemplate::new(args.index));

    let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, args.port)).await?;
    info!("Listening on {}", listener.local_addr()?);

    let shutdown_token = CancellationToken::new();
    tokio::spawn(shutdown::detect_shutdown(shutdown_token.clone()));

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_token.cancelled_owned())
        .await?;

    info!("Server stopped");
    Ok(())
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/trigger/{id}", post(trigger))
        .route("/sums", get(sums))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
        .with_state(state)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::ACCEPT,
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static("x-csrf-token"),
        ])
        .expose_headers([header::LINK])
        .max_age(Duration::from_secs(300))
}

async fn index(State(state): State<AppState>) -> Result<Html<String>, ApiError> {
    Ok(Html(state.page.render(&state.config).await?))
}

/// First `password` value of the query, empty when absent. Repeated keys are allowed.
fn password_param(params: &[(String, String)]) -> &str {
    params
        .iter()
        .find(|(key, _)| key == "password")
        .map_or("", |(_, value)| value.as_str())
}

async fn trigger(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<&'static str, ApiError> {
    if password_param(&params) != state.config.password.expose_secret() {
        warn!("Rejected trigger {id:?} with wrong password");
        return Err(ApiError::Unauthorized);
    }

    let result = if id == RESET_ID {
        state.log.reset().await
    } else {
        state.log.append(id).await
    };
    if let Err(e) = result {
        fatal_persistence(&e);
    }

    Ok("OK")
}

async fn sums(State(state): State<AppState>) -> Result<Response, ApiError> {
    let sums = state.sums.calculate().await;
    let body = serde_json::to_string_pretty(&sums)?;
    Ok(([(header::CONTENT_TYPE, "application/json")], body).into_response())
}

/// Memory and disk disagree after a failed write. Carrying on would serve history that can't be
/// recovered after a restart, so the process stops here.
fn fatal_persistence(error: &StoreError) -> ! {
    error!("Event log could not be persisted, terminating {error:?}");
    std::process::exit(PERSISTENCE_EXIT_CODE)
}
