#![allow(dead_code)]

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use finanzas_game_core::config::Config;
use finanzas_game_core::services::progress_client::HttpApiClient;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use url::Url;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

#[derive(Debug, Clone)]
pub struct StoredUser {
    pub id: String,
    pub username: String,
    pub age: u32,
    pub coins: u64,
    pub xp: u64,
    pub level: u32,
    pub badges: Vec<String>,
    pub selected_level: Option<String>,
}

impl StoredUser {
    fn to_json(&self) -> Value {
        json!({
            "id": self.id,
            "username": self.username,
            "age": self.age,
            "coins": self.coins,
            "xp": self.xp,
            "level": self.level,
            "badges": self.badges,
            "selected_level": self.selected_level,
            "owned_items": [],
            "avatar_config": {},
        })
    }
}

/// In-memory stand-in for the game backend
#[derive(Default)]
pub struct BackendState {
    pub users: HashMap<String, StoredUser>,
    pub progress: HashMap<String, Value>,
    pub calls: Vec<String>,
    /// Operations answering 503 until removed
    pub failing: HashSet<String>,
    /// Operations that hang for the given time before answering
    pub delays: HashMap<String, Duration>,
    /// Raw bodies replacing the normal answer of an operation
    pub overrides: HashMap<String, (u16, Value)>,
    next_id: u32,
}

pub type SharedBackend = Arc<Mutex<BackendState>>;

pub struct FakeBackend {
    pub state: SharedBackend,
    pub base_url: Url,
}

impl FakeBackend {
    pub async fn start() -> Self {
        init_tracing();
        let state: SharedBackend = Arc::new(Mutex::new(BackendState::default()));

        let app = Router::new()
            .route("/api/auth/register", post(register))
            .route("/api/auth/login", post(login))
            .route("/api/user/level", put(update_level))
            .route("/api/user/{id}", get(get_user))
            .route("/api/modules/{level}", get(modules))
            .route("/api/coins/add", post(add_coins))
            .route("/api/xp/add", post(add_xp))
            .route("/api/progress/update", post(update_progress))
            .route("/api/progress/{id}", get(get_progress))
            .route("/api/badges/unlock", post(unlock_badge))
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            state,
            base_url: Url::parse(&format!("http://{}/", addr)).unwrap(),
        }
    }

    pub fn client(&self) -> HttpApiClient {
        self.client_with_timeout(Duration::from_secs(5))
    }

    pub fn client_with_timeout(&self, timeout: Duration) -> HttpApiClient {
        HttpApiClient::new(self.base_url.clone(), timeout)
    }

    pub fn config(&self, data_dir: &std::path::Path) -> Config {
        let mut config = Config::new(self.base_url.clone());
        config.data_dir = data_dir.to_path_buf();
        config.request_timeout = Duration::from_secs(5);
        config
    }

    pub fn add_user(&self, username: &str) -> String {
        let mut state = self.state.lock().unwrap();
        state.insert_user(username, 9)
    }

    pub fn user(&self, id: &str) -> Option<StoredUser> {
        self.state.lock().unwrap().users.get(id).cloned()
    }

    pub fn set_progress(&self, user_id: &str, progress: Value) {
        self.state
            .lock()
            .unwrap()
            .progress
            .insert(user_id.to_string(), progress);
    }

    pub fn progress(&self, user_id: &str) -> Option<Value> {
        self.state.lock().unwrap().progress.get(user_id).cloned()
    }

    pub fn fail(&self, operation: &str) {
        self.state
            .lock()
            .unwrap()
            .failing
            .insert(operation.to_string());
    }

    pub fn recover(&self, operation: &str) {
        let mut s = self.state.lock().unwrap();
        s.failing.remove(operation);
        s.overrides.remove(operation);
    }

    pub fn delay(&self, operation: &str, delay: Duration) {
        self.state
            .lock()
            .unwrap()
            .delays
            .insert(operation.to_string(), delay);
    }

    pub fn respond_with(&self, operation: &str, status: u16, body: Value) {
        self.state
            .lock()
            .unwrap()
            .overrides
            .insert(operation.to_string(), (status, body));
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count(&self, operation: &str) -> usize {
        self.calls().iter().filter(|op| *op == operation).count()
    }
}

impl BackendState {
    fn insert_user(&mut self, username: &str, age: u32) -> String {
        self.next_id += 1;
        let id = format!("user-{}", self.next_id);
        self.users.insert(
            id.clone(),
            StoredUser {
                id: id.clone(),
                username: username.to_string(),
                age,
                coins: 0,
                xp: 0,
                level: 1,
                badges: Vec::new(),
                selected_level: None,
            },
        );
        id
    }
}

fn detail(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "detail": message }))).into_response()
}

/// Logs the call and applies injected delay, failure or canned answer.
async fn intercept(state: &SharedBackend, operation: &str) -> Option<Response> {
    let (delay, failing, canned) = {
        let mut s = state.lock().unwrap();
        s.calls.push(operation.to_string());
        (
            s.delays.get(operation).copied(),
            s.failing.contains(operation),
            s.overrides.get(operation).cloned(),
        )
    };
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    if failing {
        return Some(detail(StatusCode::SERVICE_UNAVAILABLE, "injected failure"));
    }
    canned.map(|(status, body)| {
        let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(body)).into_response()
    })
}

fn level_for(xp: u64) -> u32 {
    (xp / 100) as u32 + 1
}

async fn register(State(state): State<SharedBackend>, Json(body): Json<Value>) -> Response {
    if let Some(r) = intercept(&state, "register").await {
        return r;
    }
    let username = body["username"].as_str().unwrap_or_default().to_string();
    let age = body["age"].as_u64().unwrap_or(0) as u32;
    let mut s = state.lock().unwrap();
    if s.users.values().any(|u| u.username == username) {
        return detail(StatusCode::BAD_REQUEST, "El nombre de usuario ya existe");
    }
    let id = s.insert_user(&username, age);
    Json(s.users[&id].to_json()).into_response()
}

async fn login(State(state): State<SharedBackend>, Json(body): Json<Value>) -> Response {
    if let Some(r) = intercept(&state, "login").await {
        return r;
    }
    let username = body["username"].as_str().unwrap_or_default();
    let s = state.lock().unwrap();
    match s.users.values().find(|u| u.username == username) {
        Some(user) => Json(user.to_json()).into_response(),
        None => detail(StatusCode::NOT_FOUND, "Usuario no encontrado"),
    }
}

async fn get_user(State(state): State<SharedBackend>, Path(id): Path<String>) -> Response {
    if let Some(r) = intercept(&state, "get_user").await {
        return r;
    }
    let s = state.lock().unwrap();
    match s.users.get(&id) {
        Some(user) => Json(user.to_json()).into_response(),
        None => detail(StatusCode::NOT_FOUND, "Usuario no encontrado"),
    }
}

async fn update_level(State(state): State<SharedBackend>, Json(body): Json<Value>) -> Response {
    if let Some(r) = intercept(&state, "update_level").await {
        return r;
    }
    let id = body["user_id"].as_str().unwrap_or_default();
    let level = body["level"].as_str().map(str::to_string);
    let mut s = state.lock().unwrap();
    match s.users.get_mut(id) {
        Some(user) => {
            user.selected_level = level;
            Json(user.to_json()).into_response()
        }
        None => detail(StatusCode::NOT_FOUND, "Usuario no encontrado"),
    }
}

async fn modules(State(state): State<SharedBackend>, Path(level): Path<String>) -> Response {
    if let Some(r) = intercept(&state, "modules_by_level").await {
        return r;
    }
    Json(json!([
        {
            "id": "coin_recognition",
            "title": "Reconoce las monedas",
            "description": "Aprende a identificar monedas",
            "icon": "🪙",
            "coins_reward": 20,
            "type": "game",
            "level": level,
        },
        {
            "id": "counting_money",
            "title": "Cuenta el dinero",
            "icon": "🔢",
            "coins_reward": 25,
            "type": "game",
            "level": level,
        }
    ]))
    .into_response()
}

async fn add_coins(State(state): State<SharedBackend>, Json(body): Json<Value>) -> Response {
    if let Some(r) = intercept(&state, "add_coins").await {
        return r;
    }
    let id = body["user_id"].as_str().unwrap_or_default();
    let coins = body["coins"].as_u64().unwrap_or(0);
    let mut s = state.lock().unwrap();
    match s.users.get_mut(id) {
        Some(user) => {
            user.coins += coins;
            Json(json!({ "success": true, "new_total": user.coins })).into_response()
        }
        None => detail(StatusCode::NOT_FOUND, "Usuario no encontrado"),
    }
}

async fn add_xp(State(state): State<SharedBackend>, Json(body): Json<Value>) -> Response {
    if let Some(r) = intercept(&state, "add_xp").await {
        return r;
    }
    let id = body["user_id"].as_str().unwrap_or_default();
    let xp = body["xp"].as_u64().unwrap_or(0);
    let mut s = state.lock().unwrap();
    match s.users.get_mut(id) {
        Some(user) => {
            let old_level = user.level;
            user.xp += xp;
            user.level = level_for(user.xp);
            let level_up = user.level > old_level;
            let bonus_coins = if level_up { u64::from(user.level) * 10 } else { 0 };
            user.coins += bonus_coins;
            Json(json!({
                "success": true,
                "new_xp": user.xp,
                "new_level": user.level,
                "level_up": level_up,
                "bonus_coins": bonus_coins,
                "total_coins": user.coins,
            }))
            .into_response()
        }
        None => detail(StatusCode::NOT_FOUND, "Usuario no encontrado"),
    }
}

async fn get_progress(State(state): State<SharedBackend>, Path(id): Path<String>) -> Response {
    if let Some(r) = intercept(&state, "get_progress").await {
        return r;
    }
    let s = state.lock().unwrap();
    match s.progress.get(&id) {
        Some(progress) => Json(progress.clone()).into_response(),
        None => detail(StatusCode::NOT_FOUND, "Progreso no encontrado"),
    }
}

async fn update_progress(State(state): State<SharedBackend>, Json(body): Json<Value>) -> Response {
    if let Some(r) = intercept(&state, "update_progress").await {
        return r;
    }
    let id = body["user_id"].as_str().unwrap_or_default().to_string();
    let mut s = state.lock().unwrap();
    let created = !s.progress.contains_key(&id);
    let mut stored = body.clone();
    stored["updated_at"] = json!("2026-01-01T10:00:00.000000");
    s.progress.insert(id, stored);
    Json(json!({
        "success": true,
        "message": "Progreso actualizado",
        "modified": !created,
        "created": created,
    }))
    .into_response()
}

async fn unlock_badge(State(state): State<SharedBackend>, Json(body): Json<Value>) -> Response {
    if let Some(r) = intercept(&state, "unlock_badge").await {
        return r;
    }
    let id = body["user_id"].as_str().unwrap_or_default();
    let badge = body["badge_id"].as_str().unwrap_or_default().to_string();
    let mut s = state.lock().unwrap();
    match s.users.get_mut(id) {
        Some(user) => {
            let new_badge = !user.badges.contains(&badge);
            if new_badge {
                user.badges.push(badge);
            }
            Json(json!({ "success": true, "new_badge": new_badge })).into_response()
        }
        None => detail(StatusCode::NOT_FOUND, "Usuario no encontrado"),
    }
}
