// Фейковый бэкенд ханипота для тестов: axum на 127.0.0.1:0

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use url::Url;

pub struct FakeState {
    pub rows: Vec<Value>,
    pub log_status: u16,
    pub log_delay: Option<Duration>,
    pub log_hits: usize,
    pub raw_log_body: Option<String>,
    pub simulated: Vec<u16>,
    pub listen_requests: Vec<bool>,
    pub listen_status: u16,
    pub listen_body: Value,
    pub csv: String,
    pub csv_status: u16,
    pub config_body: Option<Value>,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            log_status: 200,
            log_delay: None,
            log_hits: 0,
            raw_log_body: None,
            simulated: Vec::new(),
            listen_requests: Vec::new(),
            listen_status: 200,
            listen_body: json!({ "ok": true }),
            csv: String::new(),
            csv_status: 200,
            config_body: None,
        }
    }
}

type Shared = Arc<Mutex<FakeState>>;

pub struct FakeBackend {
    state: Shared,
    addr: std::net::SocketAddr,
    handle: JoinHandle<()>,
}

impl FakeBackend {
    pub async fn start() -> Self {
        let state: Shared = Arc::new(Mutex::new(FakeState::default()));
        let app = Router::new()
            .route("/api/log", get(log_rows))
            .route("/api/simulate", post(simulate_attack))
            .route("/api/listen", post(set_listen))
            .route("/api/download", get(download_csv))
            .route("/api/config", get(backend_config))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { state, addr, handle }
    }

    pub fn base_url(&self) -> Url {
        Url::parse(&format!("http://{}", self.addr)).unwrap()
    }

    pub fn push(&self, row: Value) {
        self.state.lock().unwrap().rows.push(row);
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut FakeState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    pub fn log_hits(&self) -> usize {
        self.state.lock().unwrap().log_hits
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub fn row(ip: &str, dst_port: u16, ts: &str) -> Value {
    json!({
        "timestamp": ts,
        "src_ip": ip,
        "src_port": 40000,
        "dst_port": dst_port,
        "recv_preview": "SIM_ATTACK_PAYLOAD",
    })
}

fn status(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

async fn log_rows(State(state): State<Shared>) -> Response {
    let (delay, code, body) = {
        let mut s = state.lock().unwrap();
        s.log_hits += 1;
        let body = s
            .raw_log_body
            .clone()
            .unwrap_or_else(|| json!({ "rows": s.rows }).to_string());
        (s.log_delay, s.log_status, body)
    };
    if let Some(d) = delay {
        tokio::time::sleep(d).await;
    }
    (status(code), [(header::CONTENT_TYPE, "application/json")], body).into_response()
}

async fn simulate_attack(State(state): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    let port = body["dst_port"].as_u64().unwrap_or(2222) as u16;
    let mut s = state.lock().unwrap();
    s.simulated.push(port);
    s.rows.push(row("192.168.1.77", port, "2024-03-01T10:00:30Z"));
    Json(json!({ "ok": true }))
}

async fn set_listen(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let mut s = state.lock().unwrap();
    s.listen_requests.push(body["listen"].as_bool().unwrap_or(true));
    if s.listen_status != 200 {
        return status(s.listen_status).into_response();
    }
    Json(s.listen_body.clone()).into_response()
}

async fn download_csv(State(state): State<Shared>) -> Response {
    let (code, csv) = {
        let s = state.lock().unwrap();
        (s.csv_status, s.csv.clone())
    };
    (status(code), [(header::CONTENT_TYPE, "text/csv")], csv).into_response()
}

async fn backend_config(State(state): State<Shared>) -> Response {
    match state.lock().unwrap().config_body.clone() {
        Some(body) => Json(body).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
