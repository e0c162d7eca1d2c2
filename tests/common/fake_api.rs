//! Fake public data portal
//!
//! Serves the list and detail endpoints of both lost-and-found services with
//! XML bodies shaped like the real portal, from items configured per test.

use super::constants::TEST_SERVICE_KEY;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

/// One `<item>`, as ordered `(element, text)` pairs.
#[derive(Debug, Clone)]
pub struct FakeItem {
    pub fields: Vec<(String, String)>,
}

impl FakeItem {
    pub fn new(fields: &[(&str, &str)]) -> Self {
        Self {
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    fn atc_id(&self) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == "atcId")
            .map(|(_, v)| v.as_str())
    }
}

pub fn found_item(atc_id: &str, name: &str) -> FakeItem {
    FakeItem::new(&[
        ("atcId", atc_id),
        ("fdPrdtNm", name),
        ("depPlace", "서울역 유실물센터"),
        ("fdYmd", "20240101"),
        ("fdSn", "1"),
        ("prdtClNm", "지갑 > 남성용 지갑"),
        ("fdFilePathImg", ""),
    ])
}

pub fn lost_item(atc_id: &str, name: &str) -> FakeItem {
    FakeItem::new(&[
        ("atcId", atc_id),
        ("lstPrdtNm", name),
        ("lstPlace", "지하철 2호선"),
        ("lstYmd", "20240102"),
        ("prdtClNm", "휴대폰 > 스마트폰"),
        ("orgNm", "종로경찰서"),
    ])
}

#[derive(Default)]
struct FakeApiState {
    found: Mutex<Vec<FakeItem>>,
    lost: Mutex<Vec<FakeItem>>,
    failing: AtomicBool,
    delay: Mutex<Option<Duration>>,
    list_calls: AtomicUsize,
    detail_calls: AtomicUsize,
}

type Params = Query<HashMap<String, String>>;

/// Handle to a running fake portal. Shuts down on drop.
pub struct FakePublicDataApi {
    pub base_url: String,
    state: Arc<FakeApiState>,
    shutdown: CancellationToken,
}

impl FakePublicDataApi {
    pub async fn spawn() -> Self {
        let state = Arc::new(FakeApiState::default());
        let app = Router::new()
            .route(
                "/LosfundInfoInqireService/getLosfundInfoAccToClAreaPd",
                get(list_found),
            )
            .route(
                "/LostGoodsInfoInqireService/getLostGoodsInfoAccToClAreaPd",
                get(list_lost),
            )
            .route(
                "/LosfundInfoInqireService/getLosfundDetailInfo",
                get(detail_found),
            )
            .route(
                "/LostGoodsInfoInqireService/getLostGoodsDetailInfo",
                get(detail_lost),
            )
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake API port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();

        let shutdown = CancellationToken::new();
        let token = shutdown.clone();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await
                .expect("Fake API failed");
        });

        Self {
            base_url: format!("http://127.0.0.1:{}", port),
            state,
            shutdown,
        }
    }

    pub fn set_found_items(&self, items: Vec<FakeItem>) {
        *self.state.found.lock().unwrap() = items;
    }

    pub fn set_lost_items(&self, items: Vec<FakeItem>) {
        *self.state.lost.lock().unwrap() = items;
    }

    /// Answers every request with HTTP 500 while set.
    pub fn set_failing(&self, failing: bool) {
        self.state.failing.store(failing, Ordering::SeqCst);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.state.delay.lock().unwrap() = Some(delay);
    }

    pub fn list_calls(&self) -> usize {
        self.state.list_calls.load(Ordering::SeqCst)
    }

    pub fn detail_calls(&self) -> usize {
        self.state.detail_calls.load(Ordering::SeqCst)
    }
}

impl Drop for FakePublicDataApi {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn render_item(tag: &str, item: &FakeItem) -> String {
    let fields: String = item
        .fields
        .iter()
        .map(|(k, v)| format!("<{k}>{}</{k}>", escape(v)))
        .collect();
    format!("<{tag}>{fields}</{tag}>")
}

fn xml_response(body: String) -> Response {
    (
        StatusCode::OK,
        [("content-type", "application/xml;charset=UTF-8")],
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><response><header><resultCode>00</resultCode><resultMsg>NORMAL SERVICE.</resultMsg></header>{body}</response>"#
        ),
    )
        .into_response()
}

fn gateway_error() -> Response {
    (
        StatusCode::OK,
        [("content-type", "text/xml;charset=UTF-8")],
        "<OpenAPI_ServiceResponse><cmmMsgHeader><errMsg>SERVICE ERROR</errMsg>\
         <returnAuthMsg>SERVICE_KEY_IS_NOT_REGISTERED_ERROR</returnAuthMsg>\
         <returnReasonCode>30</returnReasonCode></cmmMsgHeader></OpenAPI_ServiceResponse>",
    )
        .into_response()
}

/// Shared checks: delay, forced failure, service key.
async fn precheck(state: &FakeApiState, params: &HashMap<String, String>) -> Option<Response> {
    let delay = *state.delay.lock().unwrap();
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    if state.failing.load(Ordering::SeqCst) {
        return Some(StatusCode::INTERNAL_SERVER_ERROR.into_response());
    }
    if params.get("serviceKey").map(String::as_str) != Some(TEST_SERVICE_KEY) {
        return Some(gateway_error());
    }
    None
}

async fn list_page(
    state: &FakeApiState,
    items: &Mutex<Vec<FakeItem>>,
    params: HashMap<String, String>,
) -> Response {
    state.list_calls.fetch_add(1, Ordering::SeqCst);
    if let Some(response) = precheck(state, &params).await {
        return response;
    }

    let page_no: usize = params
        .get("pageNo")
        .and_then(|v| v.parse().ok())
        .unwrap_or(1)
        .max(1);
    let rows: usize = params
        .get("numOfRows")
        .and_then(|v| v.parse().ok())
        .unwrap_or(10)
        .max(1);

    let all = items.lock().unwrap().clone();
    let page: String = all
        .iter()
        .skip((page_no - 1) * rows)
        .take(rows)
        .map(|item| render_item("item", item))
        .collect();

    xml_response(format!(
        "<body><items>{page}</items><numOfRows>{rows}</numOfRows><pageNo>{page_no}</pageNo><totalCount>{}</totalCount></body>",
        all.len()
    ))
}

async fn detail(
    state: &FakeApiState,
    items: &Mutex<Vec<FakeItem>>,
    params: HashMap<String, String>,
) -> Response {
    state.detail_calls.fetch_add(1, Ordering::SeqCst);
    if let Some(response) = precheck(state, &params).await {
        return response;
    }

    let atc_id = params.get("ATC_ID").cloned().unwrap_or_default();
    let item = items
        .lock()
        .unwrap()
        .iter()
        .find(|item| item.atc_id() == Some(atc_id.as_str()))
        .cloned();

    match item {
        Some(item) => xml_response(format!("<body>{}</body>", render_item("item", &item))),
        None => xml_response("<body></body>".to_string()),
    }
}

async fn list_found(State(state): State<Arc<FakeApiState>>, Query(params): Params) -> Response {
    list_page(&state, &state.found, params).await
}

async fn list_lost(State(state): State<Arc<FakeApiState>>, Query(params): Params) -> Response {
    list_page(&state, &state.lost, params).await
}

async fn detail_found(State(state): State<Arc<FakeApiState>>, Query(params): Params) -> Response {
    detail(&state, &state.found, params).await
}

async fn detail_lost(State(state): State<Arc<FakeApiState>>, Query(params): Params) -> Response {
    detail(&state, &state.lost, params).await
}
