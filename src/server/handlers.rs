use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::{DefaultBodyLimit, Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, Method, Request, Response, StatusCode};
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Mutex;

use crate::compose::SourceImage;
use crate::data;
use crate::language::Language;
use crate::settings::Settings;
use crate::store::{NewCaption, Store};

use super::models::{
    CaptionPayload, CaptionRequest, CaptionsQuery, ErrorResponse, FavoriteCheckQuery,
    FavoriteRequest, LoginRequest, SignupRequest, ToggleResponse, UserPayload,
};
use super::state::ServerState;

/// Caption image payloads arrive as base64 data URLs, so the body limit has
/// to be generous.
const MAX_BODY_BYTES: usize = 50 * 1024 * 1024;

type HandlerError = (StatusCode, Json<ErrorResponse>);

pub async fn run_server(settings: Settings, addr: String) -> Result<()> {
    let store = Store::open(settings.store_dir())?;
    tracing::info!(dir = %store.dir().display(), "store opened");
    let state = Arc::new(ServerState {
        store: Mutex::new(store),
    });
    let app = Router::new()
        .route("/health", get(health))
        .route("/api/auth/signup", post(signup))
        .route("/api/auth/login", post(login))
        .route("/api/users", get(users))
        .route("/api/captions", get(captions_list).post(captions_create))
        .route("/api/favorites", post(favorites_toggle))
        .route("/api/favorites/:user_id", get(favorites_list))
        .route("/api/favorites/check/:user_id", get(favorites_check))
        .with_state(state)
        .layer(axum::middleware::from_fn(cors_middleware))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind server address {}", addr))?;
    tracing::info!(%addr, "caption server listening");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

async fn cors_middleware(req: Request<Body>, next: Next) -> Result<Response<Body>, StatusCode> {
    if req.method() == Method::OPTIONS {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::NO_CONTENT;
        apply_cors_headers(response.headers_mut());
        return Ok(response);
    }
    let mut response = next.run(req).await;
    apply_cors_headers(response.headers_mut());
    Ok(response)
}

fn apply_cors_headers(headers: &mut HeaderMap) {
    headers.insert("access-control-allow-origin", HeaderValue::from_static("*"));
    headers.insert(
        "access-control-allow-methods",
        HeaderValue::from_static("GET,POST,OPTIONS"),
    );
    headers.insert(
        "access-control-allow-headers",
        HeaderValue::from_static("content-type,authorization"),
    );
}

fn error(status: StatusCode, message: impl Into<String>) -> HandlerError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

fn bad_request(message: impl Into<String>) -> HandlerError {
    error(StatusCode::BAD_REQUEST, message)
}

fn internal(err: anyhow::Error) -> HandlerError {
    tracing::error!(error = %err, "request failed");
    error(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
}

async fn signup(
    State(state): State<Arc<ServerState>>,
    Json(payload): Json<SignupRequest>,
) -> Result<(StatusCode, Json<UserPayload>), HandlerError> {
    let name = non_empty(payload.name);
    let email = non_empty(payload.email);
    let password = non_empty(payload.password);
    let (Some(name), Some(email), Some(password)) = (name, email, password) else {
        return Err(bad_request("Name, email, and password are required"));
    };

    let store = lock_store(&state)?;
    if store.find_user_by_email(&email).map_err(internal)?.is_some() {
        return Err(bad_request("Email already exists"));
    }
    let user = store
        .create_user(&name, &email, &password)
        .map_err(internal)?;
    let payload = UserPayload::from_user(user).map_err(internal)?;
    Ok((StatusCode::CREATED, Json(payload)))
}

async fn login(
    State(state): State<Arc<ServerState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<UserPayload>, HandlerError> {
    let email = non_empty(payload.email);
    let password = non_empty(payload.password);
    let (Some(email), Some(password)) = (email, password) else {
        return Err(bad_request("Email and password are required"));
    };

    let store = lock_store(&state)?;
    let Some(user) = store.find_user_by_email(&email).map_err(internal)? else {
        return Err(error(StatusCode::NOT_FOUND, "User not found"));
    };
    if user.password != password {
        return Err(bad_request("Invalid credentials"));
    }
    Ok(Json(UserPayload::from_user(user).map_err(internal)?))
}

async fn users(
    State(state): State<Arc<ServerState>>,
) -> Result<Json<Vec<UserPayload>>, HandlerError> {
    let store = lock_store(&state)?;
    let users = store.list_users().map_err(internal)?;
    let payloads = users
        .into_iter()
        .map(UserPayload::from_user)
        .collect::<Result<Vec<_>>>()
        .map_err(internal)?;
    Ok(Json(payloads))
}

async fn captions_list(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<CaptionsQuery>,
) -> Result<Json<Vec<CaptionPayload>>, HandlerError> {
    let language = match query.lang.as_deref() {
        Some(raw) => raw
            .parse::<Language>()
            .map_err(|err| bad_request(err.to_string()))?,
        None => Language::English,
    };
    let store = lock_store(&state)?;
    let captions = store
        .list_captions(language, query.search.as_deref())
        .map_err(internal)?;
    let payloads = captions
        .into_iter()
        .map(CaptionPayload::from_caption)
        .collect::<Result<Vec<_>>>()
        .map_err(internal)?;
    Ok(Json(payloads))
}

async fn captions_create(
    State(state): State<Arc<ServerState>>,
    Json(payload): Json<CaptionRequest>,
) -> Result<(StatusCode, Json<CaptionPayload>), HandlerError> {
    let Some(text) = non_empty(payload.text) else {
        return Err(bad_request("Caption text is required"));
    };
    let language = match payload.language.as_deref() {
        Some(raw) => raw
            .parse::<Language>()
            .map_err(|err| bad_request(err.to_string()))?,
        None => Language::English,
    };
    if let Some(image) = payload.image.as_deref() {
        // reject payloads the feed could never display
        let (bytes, mime) = data::decode_data_url(image).map_err(|err| bad_request(err.to_string()))?;
        SourceImage::new(bytes, Some(&mime)).map_err(|err| bad_request(err.to_string()))?;
    }

    let store = lock_store(&state)?;
    let caption = store
        .insert_caption(NewCaption {
            text,
            language,
            category: payload.category,
            image: payload.image,
        })
        .map_err(internal)?;
    let payload = CaptionPayload::from_caption(caption).map_err(internal)?;
    Ok((StatusCode::CREATED, Json(payload)))
}

async fn favorites_toggle(
    State(state): State<Arc<ServerState>>,
    Json(payload): Json<FavoriteRequest>,
) -> Result<Json<ToggleResponse>, HandlerError> {
    let user_id = non_empty(payload.user_id);
    let caption_id = non_empty(payload.caption_id);
    let (Some(user_id), Some(caption_id)) = (user_id, caption_id) else {
        return Err(bad_request("Missing Data"));
    };
    let store = lock_store(&state)?;
    let favorited = store
        .toggle_favorite(&user_id, &caption_id)
        .map_err(internal)?;
    let message = if favorited {
        "Added to favorites"
    } else {
        "Removed from favorites"
    };
    Ok(Json(ToggleResponse {
        favorited,
        message: message.to_string(),
    }))
}

async fn favorites_list(
    State(state): State<Arc<ServerState>>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<CaptionPayload>>, HandlerError> {
    let store = lock_store(&state)?;
    let captions = store.favorites_for_user(&user_id).map_err(internal)?;
    let payloads = captions
        .into_iter()
        .map(CaptionPayload::from_caption)
        .collect::<Result<Vec<_>>>()
        .map_err(internal)?;
    Ok(Json(payloads))
}

async fn favorites_check(
    State(state): State<Arc<ServerState>>,
    Path(user_id): Path<String>,
    Query(query): Query<FavoriteCheckQuery>,
) -> Result<Json<HashMap<String, bool>>, HandlerError> {
    let Some(raw_ids) = non_empty(query.caption_ids) else {
        return Ok(Json(HashMap::new()));
    };
    let ids: Vec<&str> = raw_ids
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .collect();
    let store = lock_store(&state)?;
    let map = store.favorite_map(&user_id, &ids).map_err(internal)?;
    Ok(Json(map))
}

fn lock_store(state: &ServerState) -> Result<std::sync::MutexGuard<'_, Store>, HandlerError> {
    state
        .store
        .lock()
        .map_err(|_| error(StatusCode::INTERNAL_SERVER_ERROR, "store lock poisoned"))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
