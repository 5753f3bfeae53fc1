pub mod backend_csv;
pub mod table;

pub use backend_csv::BackendCsv;

use crate::app::AppError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub created_at: i64,
}

/// Public view of a user, never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: u64,
    pub email: String,
    pub name: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct UserCreate {
    pub email: String,
    pub password_hash: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub secret_digest: String,
    pub user_id: u64,
    /// Unix seconds
    pub expires_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: u64,
    pub name: String,
}

/// Album row as stored; tags live in the album_tags table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlbumRecord {
    pub id: u64,
    pub title: String,
    pub artist: String,
    pub price: f64,
    pub user_id: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlbumTag {
    pub album_id: u64,
    pub tag_id: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Album {
    pub id: u64,
    pub title: String,
    pub artist: String,
    pub price: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserSummary>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, Default)]
pub struct AlbumCreate {
    pub title: String,
    pub artist: String,
    pub price: f64,
    pub user_id: Option<u64>,
    pub tag_ids: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
    pub id: u64,
    pub title: String,
    pub youtube_url: String,
    pub thumbnail_url: String,
    pub view_count: u64,
    pub album_id: u64,
}

#[derive(Debug, Clone, Default)]
pub struct SongCreate {
    pub title: String,
    pub youtube_url: String,
    pub thumbnail_url: String,
    pub view_count: u64,
    pub album_id: u64,
}

pub trait CatalogManager: Send + Sync {
    fn create_user(&self, user: UserCreate) -> anyhow::Result<User, AppError>;
    fn user(&self, id: u64) -> anyhow::Result<Option<User>, AppError>;
    fn user_by_email(&self, email: &str) -> anyhow::Result<Option<User>, AppError>;

    fn create_session(&self, session: Session) -> anyhow::Result<(), AppError>;
    fn session(&self, id: &str) -> anyhow::Result<Option<Session>, AppError>;
    /// Drops sessions that expired before `now`, returns how many were removed.
    fn purge_sessions(&self, now: i64) -> anyhow::Result<usize, AppError>;

    fn albums(&self) -> anyhow::Result<Vec<Album>, AppError>;
    fn album(&self, id: u64) -> anyhow::Result<Option<Album>, AppError>;
    fn create_album(&self, album: AlbumCreate) -> anyhow::Result<Album, AppError>;

    fn tags(&self) -> anyhow::Result<Vec<Tag>, AppError>;
    fn create_tag(&self, name: &str) -> anyhow::Result<Tag, AppError>;

    fn songs(&self, album_id: u64) -> anyhow::Result<Vec<Song>, AppError>;
    fn create_song(&self, song: SongCreate) -> anyhow::Result<Song, AppError>;
    fn delete_song(&self, id: u64) -> anyhow::Result<(), AppError>;
}

/// Insert a few classic albums into an empty catalog.
pub fn seed_albums(catalog: &dyn CatalogManager) -> anyhow::Result<usize, AppError> {
    if !catalog.albums()?.is_empty() {
        return Ok(0);
    }

    let seed = [
        ("Blue Train", "John Coltrane", 56.99),
        ("Jeru", "Gerry Mulligan", 17.99),
        ("Sarah Vaughan and Clifford Brown", "Sarah Vaughan", 39.99),
    ];

    for (title, artist, price) in seed {
        catalog.create_album(AlbumCreate {
            title: title.to_string(),
            artist: artist.to_string(),
            price,
            ..Default::default()
        })?;
    }

    log::info!("seeded {} albums", seed.len());

    Ok(seed.len())
}
