use anyhow::{Context, Result};
use std::time::Duration;

use tracing::{error, info, warn};

use crate::background_jobs::{JobError, MAX_SYNC_INTERVAL};
use crate::category::ItemCategory;
use crate::item_store::{ItemFilter, PageRequest, SyncStatusRow, DEFAULT_PAGE_SIZE};

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use super::metrics::metrics_handler;
use super::{log_requests, state::*};

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub version: &'static str,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

#[derive(Deserialize, Debug, Default)]
struct ListItemsParams {
    pub page: Option<usize>,
    pub page_size: Option<usize>,
    pub keyword: Option<String>,
    pub item_type: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

impl ListItemsParams {
    fn page_request(&self) -> PageRequest {
        PageRequest::new(
            self.page.unwrap_or(1),
            self.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        )
    }

    fn into_filter(self) -> ItemFilter {
        ItemFilter {
            keyword: self.keyword,
            item_type: self.item_type,
            date_from: self.date_from,
            date_to: self.date_to,
        }
    }
}

#[derive(Deserialize, Debug)]
struct ItemDetailParams {
    pub serial: Option<String>,
}

#[derive(Serialize)]
struct SchedulerState {
    started: bool,
    in_progress: bool,
    interval_secs: u64,
    jobs: Vec<&'static str>,
}

#[derive(Serialize)]
struct SyncStatusResponse {
    ledger: Vec<SyncStatusRow>,
    scheduler: SchedulerState,
}

#[derive(Deserialize, Debug)]
struct SyncIntervalBody {
    pub interval_secs: u64,
}

#[derive(Serialize)]
struct SyncIntervalResponse {
    interval_secs: u64,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
        .into_response()
}

fn parse_category(category: &str) -> Result<ItemCategory, Response> {
    ItemCategory::parse(category).ok_or_else(|| {
        error_response(
            StatusCode::NOT_FOUND,
            format!("Unknown item category: {}", category),
        )
    })
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        version: env!("CARGO_PKG_VERSION"),
    };
    Json(stats)
}

async fn list_items(
    State(listing): State<GuardedListingService>,
    Path(category): Path<String>,
    Query(params): Query<ListItemsParams>,
) -> Response {
    let category = match parse_category(&category) {
        Ok(category) => category,
        Err(response) => return response,
    };
    let page = params.page_request();
    let filter = params.into_filter();
    Json(listing.list_items(category, &filter, page).await).into_response()
}

async fn get_item(
    State(listing): State<GuardedListingService>,
    Path((category, atc_id)): Path<(String, String)>,
    Query(params): Query<ItemDetailParams>,
) -> Response {
    let category = match parse_category(&category) {
        Ok(category) => category,
        Err(response) => return response,
    };
    match listing
        .get_item(category, &atc_id, params.serial.as_deref())
        .await
    {
        Ok(Some(item)) => Json(item).into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            warn!("Could not load {} item {}: {}", category, atc_id, err);
            error_response(StatusCode::SERVICE_UNAVAILABLE, err.to_string())
        }
    }
}

async fn get_sync_status(State(state): State<ServerState>) -> Response {
    let ledger = match state.status_store.list_sync_statuses() {
        Ok(rows) => rows,
        Err(err) => {
            error!("Error reading sync ledger: {:#}", err);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    let scheduler = &state.scheduler;
    Json(SyncStatusResponse {
        ledger,
        scheduler: SchedulerState {
            started: scheduler.is_started(),
            in_progress: scheduler.is_sync_in_progress(),
            interval_secs: scheduler.sync_interval().as_secs(),
            jobs: scheduler.job_ids(),
        },
    })
    .into_response()
}

async fn post_sync(State(state): State<ServerState>) -> Response {
    match state.scheduler.manual_sync().await {
        Ok(report) => Json(report).into_response(),
        Err(err @ JobError::AlreadyRunning) => {
            error_response(StatusCode::CONFLICT, err.to_string())
        }
        Err(err) => {
            error!("Manual sync failed: {}", err);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

/// Values below the minimum are clamped up; values above the maximum are rejected.
async fn put_sync_interval(
    State(state): State<ServerState>,
    Json(body): Json<SyncIntervalBody>,
) -> Response {
    let requested = Duration::from_secs(body.interval_secs);
    if requested > MAX_SYNC_INTERVAL {
        return error_response(
            StatusCode::BAD_REQUEST,
            format!(
                "interval_secs must be at most {}",
                MAX_SYNC_INTERVAL.as_secs()
            ),
        );
    }
    let effective = state.scheduler.set_sync_interval(requested);
    Json(SyncIntervalResponse {
        interval_secs: effective.as_secs(),
    })
    .into_response()
}

pub fn make_app(state: ServerState) -> Router {
    let item_routes: Router = Router::new()
        .route("/{category}", get(list_items))
        .route("/{category}/{atc_id}", get(get_item))
        .with_state(state.clone());

    let sync_routes: Router = Router::new()
        .route("/", post(post_sync))
        .route("/status", get(get_sync_status))
        .route("/interval", put(put_sync_interval))
        .with_state(state.clone());

    let home_router: Router = Router::new()
        .route("/", get(home))
        .with_state(state.clone());

    home_router
        .nest("/v1/items", item_routes)
        .nest("/v1/sync", sync_routes)
        .layer(middleware::from_fn_with_state(state, log_requests))
}

pub fn make_metrics_app() -> Router {
    Router::new().route("/metrics", get(metrics_handler))
}

/// Serves `app` on `listener` until `shutdown` is cancelled.
pub async fn serve(listener: TcpListener, app: Router, shutdown: CancellationToken) -> Result<()> {
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .context("HTTP server failed")
}

pub async fn run_server(state: ServerState, shutdown: CancellationToken) -> Result<()> {
    let port = state.config.port;
    let metrics_port = state.config.metrics_port;

    let metrics_listener = TcpListener::bind(format!("127.0.0.1:{}", metrics_port))
        .await
        .with_context(|| format!("Failed to bind metrics port {}", metrics_port))?;
    let metrics_shutdown = shutdown.clone();
    let metrics_task = tokio::spawn(async move {
        if let Err(e) = serve(metrics_listener, make_metrics_app(), metrics_shutdown).await {
            error!("Metrics server stopped: {:#}", e);
        }
    });

    let listener = TcpListener::bind(format!("127.0.0.1:{}", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;
    info!("Ready to serve at port {}!", port);
    info!("Metrics available at port {}!", metrics_port);

    let result = serve(listener, make_app(state), shutdown.clone()).await;
    // Bring the metrics server down with the main one, even on error.
    shutdown.cancel();
    if let Err(e) = metrics_task.await {
        warn!("Metrics server task panicked: {}", e);
    }
    result
}
