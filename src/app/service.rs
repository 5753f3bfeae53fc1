use crate::{
    app::AppError,
    auth,
    catalog::{
        Album, AlbumCreate, CatalogManager, Session, Song, SongCreate, Tag, User, UserCreate,
        UserSummary,
    },
    config::Config,
    video::VideoFetcher,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user: UserSummary,
    pub token: String,
}

#[derive(Debug, Clone, Default)]
pub struct AlbumInput {
    pub title: String,
    pub artist: String,
    pub price: f64,
    pub tag_ids: Vec<u64>,
}

#[derive(Debug, Clone, Default)]
pub struct SongInput {
    pub youtube_url: String,
    pub title: Option<String>,
}

/// Catalog operations behind the HTTP API. Every method blocks.
pub struct AppService {
    catalog: Arc<dyn CatalogManager>,
    videos: VideoFetcher,
    config: Config,
}

fn is_valid_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split_once('.')
                    .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    }
}

impl AppService {
    pub fn new(catalog: Arc<dyn CatalogManager>, videos: VideoFetcher, config: Config) -> Self {
        Self {
            catalog,
            videos,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn start_session(&self, user: &User) -> anyhow::Result<AuthResponse, AppError> {
        let now = chrono::Utc::now().timestamp();
        if let Err(err) = self.catalog.purge_sessions(now) {
            log::warn!("failed to purge expired sessions: {err}");
        }

        let issued = auth::issue_token();
        self.catalog.create_session(Session {
            id: issued.session_id,
            secret_digest: issued.secret_digest,
            user_id: user.id,
            expires_at: now + i64::from(self.config.session_ttl_hours) * 3600,
        })?;

        Ok(AuthResponse {
            user: user.into(),
            token: issued.token,
        })
    }

    pub fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> anyhow::Result<AuthResponse, AppError> {
        let email = email.trim();
        if !is_valid_email(email) {
            return Err(AppError::BadRequest("invalid email address".to_string()));
        }

        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::BadRequest(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        if self.catalog.user_by_email(email)?.is_some() {
            return Err(AppError::AlreadyExists(
                "This email is already in use".to_string(),
            ));
        }

        let password_hash = auth::hash_password(password, self.config.password_cost)?;
        let user = self.catalog.create_user(UserCreate {
            email: email.to_string(),
            password_hash,
            name: name.trim().to_string(),
        })?;

        log::info!("registered user id={}", user.id);

        self.start_session(&user)
    }

    pub fn login(&self, email: &str, password: &str) -> anyhow::Result<AuthResponse, AppError> {
        let user = self
            .catalog
            .user_by_email(email.trim())?
            .ok_or(AppError::Unauthorized("Incorrect email or password"))?;

        if !auth::verify_password(password, &user.password_hash) {
            log::debug!("login rejected for user id={}", user.id);
            return Err(AppError::Unauthorized("Incorrect email or password"));
        }

        self.start_session(&user)
    }

    /// Resolve a bearer token to its user.
    pub fn authenticate(&self, token: &str) -> anyhow::Result<User, AppError> {
        let (session_id, secret) =
            auth::split_token(token).ok_or(AppError::Unauthorized("invalid token"))?;

        let session = self
            .catalog
            .session(session_id)?
            .ok_or(AppError::Unauthorized("invalid token"))?;

        if !auth::validate_token(&auth::digest_secret(secret), &session.secret_digest) {
            return Err(AppError::Unauthorized("invalid token"));
        }

        if session.expires_at <= chrono::Utc::now().timestamp() {
            return Err(AppError::Unauthorized("session expired"));
        }

        self.catalog
            .user(session.user_id)?
            .ok_or(AppError::Unauthorized("User not authenticated"))
    }

    pub fn profile(&self, user_id: u64) -> anyhow::Result<UserSummary, AppError> {
        self.catalog
            .user(user_id)?
            .map(|user| UserSummary::from(&user))
            .ok_or(AppError::NotFound("User not found"))
    }

    pub fn albums(&self) -> anyhow::Result<Vec<Album>, AppError> {
        self.catalog.albums()
    }

    pub fn album(&self, id: u64) -> anyhow::Result<Album, AppError> {
        self.catalog
            .album(id)?
            .ok_or(AppError::NotFound("album not found"))
    }

    pub fn create_album(
        &self,
        user_id: u64,
        input: AlbumInput,
    ) -> anyhow::Result<Album, AppError> {
        let title = input.title.trim();
        let artist = input.artist.trim();

        if title.is_empty() || artist.is_empty() {
            return Err(AppError::BadRequest(
                "title and artist are required".to_string(),
            ));
        }

        if !input.price.is_finite() || input.price < 0.0 {
            return Err(AppError::BadRequest(
                "price must be a positive number".to_string(),
            ));
        }

        self.catalog.create_album(AlbumCreate {
            title: title.to_string(),
            artist: artist.to_string(),
            price: input.price,
            user_id: Some(user_id),
            tag_ids: input.tag_ids,
        })
    }

    pub fn tags(&self) -> anyhow::Result<Vec<Tag>, AppError> {
        self.catalog.tags()
    }

    pub fn create_tag(&self, name: &str) -> anyhow::Result<Tag, AppError> {
        self.catalog.create_tag(name)
    }

    /// Fetch YouTube metadata for the link and store it as a song of the album.
    pub fn add_song(&self, album_id: u64, input: SongInput) -> anyhow::Result<Song, AppError> {
        if self.catalog.album(album_id)?.is_none() {
            return Err(AppError::NotFound("album not found"));
        }

        if input.youtube_url.trim().is_empty() {
            return Err(AppError::BadRequest("youtube_url is required".to_string()));
        }

        let meta = self.videos.fetch_metadata(&input.youtube_url)?;

        let title = input
            .title
            .map(|title| title.trim().to_string())
            .filter(|title| !title.is_empty())
            .unwrap_or(meta.title);

        let song = self.catalog.create_song(SongCreate {
            title,
            youtube_url: input.youtube_url,
            thumbnail_url: meta.thumbnail_url,
            view_count: meta.view_count,
            album_id,
        })?;

        log::info!("album={album_id} song={} added", song.id);

        Ok(song)
    }

    pub fn songs(&self, album_id: u64) -> anyhow::Result<Vec<Song>, AppError> {
        self.catalog.songs(album_id)
    }

    pub fn delete_song(&self, song_id: u64) -> anyhow::Result<(), AppError> {
        self.catalog.delete_song(song_id)
    }
}
