use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
    time::Duration,
};

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Form, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Error body returned for every non-2xx response that carries JSON.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: u16,
    #[serde(rename = "errorMessage", skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateUser {
    pub name: String,
}

/// What the `/echo` route saw on the wire.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Echo {
    pub method: String,
    pub query: Option<String>,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

pub type Db = Arc<RwLock<BTreeMap<i64, User>>>;

/// Timestamp given to the seeded user: 2024-01-15T09:30:00Z.
const SEED_CREATED_AT: i64 = 1_705_311_000;

fn seed() -> BTreeMap<i64, User> {
    let created_at = DateTime::from_timestamp(SEED_CREATED_AT, 0).unwrap_or_default();
    BTreeMap::from([(
        1,
        User {
            id: 1,
            name: "Ana".to_string(),
            created_at,
        },
    )])
}

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(seed()));
    Router::new()
        .route("/users", get(search_users).post(create_user))
        .route("/users/{id}", get(get_user).delete(delete_user))
        .route("/echo", get(echo).post(echo).put(echo).delete(echo))
        .route("/broken", get(broken))
        .route("/crash", get(crash))
        .route("/anonymous-error", get(anonymous_error))
        .route("/slow", get(slow))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

fn error_response(status: StatusCode, message: Option<&str>, description: Option<&str>) -> Response {
    let body = ErrorBody {
        code: status.as_u16(),
        error_message: message.map(str::to_string),
        description: description.map(str::to_string),
    };
    (status, Json(body)).into_response()
}

/// `GET /users?name=..&ids=1,2` filters by exact name and/or a comma list of ids.
async fn search_users(
    State(db): State<Db>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let ids: Option<Vec<i64>> = match query.get("ids") {
        Some(raw) => match raw.split(',').map(str::parse).collect::<Result<Vec<_>, _>>() {
            Ok(ids) => Some(ids),
            Err(_) => {
                return error_response(
                    StatusCode::BAD_REQUEST,
                    Some("invalid ids"),
                    Some("ids must be a comma separated list of integers"),
                )
            }
        },
        None => None,
    };
    let users = db.read().await;
    let found: Vec<User> = users
        .values()
        .filter(|u| query.get("name").map_or(true, |name| &u.name == name))
        .filter(|u| ids.as_ref().map_or(true, |ids| ids.contains(&u.id)))
        .cloned()
        .collect();
    Json(found).into_response()
}

async fn create_user(State(db): State<Db>, Form(input): Form<CreateUser>) -> Response {
    if input.name.trim().is_empty() {
        return error_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            Some("name must not be empty"),
            None,
        );
    }
    let mut users = db.write().await;
    let id = users.keys().next_back().copied().unwrap_or(0) + 1;
    let user = User {
        id,
        name: input.name,
        created_at: Utc::now(),
    };
    users.insert(id, user.clone());
    tracing::info!(id, "user created");
    (StatusCode::CREATED, Json(user)).into_response()
}

async fn get_user(State(db): State<Db>, Path(id): Path<i64>) -> Response {
    match db.read().await.get(&id) {
        Some(user) => Json(user.clone()).into_response(),
        None => error_response(StatusCode::NOT_FOUND, Some("not found"), None),
    }
}

async fn delete_user(State(db): State<Db>, Path(id): Path<i64>) -> Response {
    match db.write().await.remove(&id) {
        Some(_) => StatusCode::NO_CONTENT.into_response(),
        None => error_response(StatusCode::NOT_FOUND, Some("not found"), None),
    }
}

async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Json<Echo> {
    let headers = headers
        .iter()
        .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
        .collect();
    Json(Echo {
        method: method.to_string(),
        query: uri.query().map(str::to_string),
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

/// 200 with a body that is not JSON.
async fn broken() -> (StatusCode, &'static str) {
    (StatusCode::OK, "not json")
}

/// 500 with an HTML body instead of an error envelope.
async fn crash() -> (StatusCode, &'static str) {
    (StatusCode::INTERNAL_SERVER_ERROR, "<html>upstream exploded</html>")
}

/// 400 with an envelope that has no message.
async fn anonymous_error() -> Response {
    error_response(StatusCode::BAD_REQUEST, None, Some("no message given"))
}

async fn slow() -> Json<serde_json::Value> {
    tokio::time::sleep(Duration::from_secs(5)).await;
    Json(serde_json::json!({}))
}
