use crate::{
    app::{AlbumInput, AppError, AppService, AuthResponse, SongInput},
    auth::extract_bearer_token,
    catalog::{Album, Song, Tag, User, UserSummary},
    config::Config,
    video::VideoError,
};
use anyhow::Context;
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        FromRequest, FromRequestParts, Path, Request, State,
    },
    http::{header, HeaderName, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio::{signal, sync::Semaphore};
use tower_http::cors::CorsLayer;

struct SharedState {
    app: Arc<AppService>,
    fetch_permits: Semaphore,
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            log::error!("failed to install Ctrl+C handler: {err}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => log::error!("failed to install signal handler: {err}"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    log::warn!("shutting down");
}

fn cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let origin = HeaderValue::from_str(&config.cors_origin)
        .with_context(|| format!("invalid cors_origin {:?}", config.cors_origin))?;

    Ok(CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::CONTENT_LENGTH,
            header::ACCEPT_ENCODING,
            header::AUTHORIZATION,
            header::ACCEPT,
            header::ORIGIN,
            header::CACHE_CONTROL,
            HeaderName::from_static("x-csrf-token"),
            HeaderName::from_static("x-requested-with"),
        ]))
}

pub fn router(app: Arc<AppService>) -> anyhow::Result<Router> {
    let cors = cors_layer(app.config())?;
    let shared_state = Arc::new(SharedState {
        fetch_permits: Semaphore::new(app.config().video.max_concurrent_fetches),
        app,
    });

    let protected = Router::new()
        .route("/profile", get(profile))
        .route("/albums", get(albums).post(create_album))
        .route("/albums/:id", get(album))
        .route("/albums/:id/songs", get(songs).post(add_song))
        .route("/albums/:id/songs/:song_id", delete(delete_song))
        .route("/tags", get(tags).post(create_tag))
        .route_layer(middleware::from_fn_with_state(
            shared_state.clone(),
            require_auth,
        ));

    Ok(Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .merge(protected)
        .layer(cors)
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(
                    tower_http::trace::DefaultMakeSpan::new().level(tracing::Level::INFO),
                )
                .on_response(
                    tower_http::trace::DefaultOnResponse::new().level(tracing::Level::INFO),
                ),
        )
        .with_state(shared_state))
}

async fn start_app(app: Arc<AppService>) -> anyhow::Result<()> {
    let addr = app.config().listen_addr.clone();
    let router = router(app)?;

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    log::info!("listening on {addr}");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

pub fn start_daemon(app: Arc<AppService>) -> anyhow::Result<()> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(start_app(app))
}

// Wraps `AppError` so handlers can use `?`.
#[derive(Debug)]
pub struct HttpError(AppError);

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::AlreadyExists(_) => StatusCode::CONFLICT,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Video(VideoError::InvalidUrl(_)) => StatusCode::BAD_REQUEST,
            AppError::Video(_) => {
                log::warn!("{self:?}");
                StatusCode::BAD_GATEWAY
            }
            AppError::Csv(_) | AppError::IO(_) | AppError::Other(_) => {
                log::error!("{self:?}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(json!({"error": self.0.to_string()}))).into_response()
    }
}

impl<E> From<E> for HttpError
where
    E: Into<AppError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

// `Json` and `Path` extractors answering rejections with the JSON error body.
#[derive(FromRequest)]
#[from_request(via(Json), rejection(HttpError))]
struct AppJson<T>(T);

#[derive(FromRequestParts)]
#[from_request(via(Path), rejection(HttpError))]
struct AppPath<T>(T);

async fn require_auth(
    State(state): State<Arc<SharedState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, HttpError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(extract_bearer_token)
        .map(str::to_string)
        .ok_or(AppError::Unauthorized("User not authenticated"))?;

    let app = state.app.clone();
    let user = tokio::task::block_in_place(move || app.authenticate(&token))?;

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub name: String,
}

async fn register(
    State(state): State<Arc<SharedState>>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), HttpError> {
    log::debug!("register: email={:?}", payload.email);

    let app = state.app.clone();
    let resp = tokio::task::block_in_place(move || {
        app.register(&payload.email, &payload.password, &payload.name)
    })?;

    Ok((StatusCode::CREATED, Json(resp)))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

async fn login(
    State(state): State<Arc<SharedState>>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<Json<AuthResponse>, HttpError> {
    log::debug!("login: email={:?}", payload.email);

    let app = state.app.clone();
    tokio::task::block_in_place(move || app.login(&payload.email, &payload.password))
        .map(Json)
        .map_err(Into::into)
}

async fn profile(
    State(state): State<Arc<SharedState>>,
    Extension(user): Extension<User>,
) -> Result<Json<UserSummary>, HttpError> {
    let app = state.app.clone();
    tokio::task::block_in_place(move || app.profile(user.id))
        .map(Json)
        .map_err(Into::into)
}

async fn albums(State(state): State<Arc<SharedState>>) -> Result<Json<Vec<Album>>, HttpError> {
    let app = state.app.clone();
    tokio::task::block_in_place(move || app.albums())
        .map(Json)
        .map_err(Into::into)
}

async fn album(
    State(state): State<Arc<SharedState>>,
    AppPath(id): AppPath<u64>,
) -> Result<Json<Album>, HttpError> {
    let app = state.app.clone();
    tokio::task::block_in_place(move || app.album(id))
        .map(Json)
        .map_err(Into::into)
}

#[derive(Debug, Deserialize, Serialize)]
pub struct AlbumCreateRequest {
    pub title: String,
    pub artist: String,
    pub price: f64,
    #[serde(default)]
    pub tag_ids: Vec<u64>,
}

async fn create_album(
    State(state): State<Arc<SharedState>>,
    Extension(user): Extension<User>,
    AppJson(payload): AppJson<AlbumCreateRequest>,
) -> Result<(StatusCode, Json<Album>), HttpError> {
    log::debug!("payload: {payload:?}");

    let app = state.app.clone();
    let album = tokio::task::block_in_place(move || {
        app.create_album(
            user.id,
            AlbumInput {
                title: payload.title,
                artist: payload.artist,
                price: payload.price,
                tag_ids: payload.tag_ids,
            },
        )
    })?;

    Ok((StatusCode::CREATED, Json(album)))
}

async fn tags(State(state): State<Arc<SharedState>>) -> Result<Json<Vec<Tag>>, HttpError> {
    let app = state.app.clone();
    tokio::task::block_in_place(move || app.tags())
        .map(Json)
        .map_err(Into::into)
}

#[derive(Debug, Deserialize, Serialize)]
pub struct TagCreateRequest {
    pub name: String,
}

async fn create_tag(
    State(state): State<Arc<SharedState>>,
    AppJson(payload): AppJson<TagCreateRequest>,
) -> Result<(StatusCode, Json<Tag>), HttpError> {
    let app = state.app.clone();
    let tag = tokio::task::block_in_place(move || app.create_tag(&payload.name))?;

    Ok((StatusCode::CREATED, Json(tag)))
}

#[derive(Debug, Deserialize, Serialize)]
pub struct SongCreateRequest {
    #[serde(default)]
    pub youtube_url: String,
    #[serde(default)]
    pub title: Option<String>,
}

async fn add_song(
    State(state): State<Arc<SharedState>>,
    AppPath(album_id): AppPath<u64>,
    AppJson(payload): AppJson<SongCreateRequest>,
) -> Result<(StatusCode, Json<Song>), HttpError> {
    log::debug!("payload: {payload:?}");

    // bounds concurrent calls to YouTube
    let _permit = state
        .fetch_permits
        .acquire()
        .await
        .context("fetch semaphore closed")?;

    let app = state.app.clone();
    let song = tokio::task::block_in_place(move || {
        app.add_song(
            album_id,
            SongInput {
                youtube_url: payload.youtube_url,
                title: payload.title,
            },
        )
    })?;

    Ok((StatusCode::CREATED, Json(song)))
}

async fn songs(
    State(state): State<Arc<SharedState>>,
    AppPath(album_id): AppPath<u64>,
) -> Result<Json<Vec<Song>>, HttpError> {
    let app = state.app.clone();
    tokio::task::block_in_place(move || app.songs(album_id))
        .map(Json)
        .map_err(Into::into)
}

#[derive(Debug, Deserialize, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

async fn delete_song(
    State(state): State<Arc<SharedState>>,
    AppPath((_album_id, song_id)): AppPath<(u64, u64)>,
) -> Result<Json<MessageResponse>, HttpError> {
    let app = state.app.clone();
    tokio::task::block_in_place(move || app.delete_song(song_id))?;

    Ok(Json(MessageResponse {
        message: "song deleted".to_string(),
    }))
}
