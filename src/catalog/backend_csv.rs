use std::{collections::HashSet, path::Path};

use super::{
    table::{next_id, CsvTable},
    Album, AlbumCreate, AlbumRecord, AlbumTag, CatalogManager, Session, Song, SongCreate, Tag,
    User, UserCreate, UserSummary,
};
use crate::app::AppError;

/// Catalog persisted as one CSV file per table under a data directory.
///
/// Locks are always taken in field order to stay deadlock free.
#[derive(Debug)]
pub struct BackendCsv {
    users: CsvTable<User>,
    sessions: CsvTable<Session>,
    tags: CsvTable<Tag>,
    albums: CsvTable<AlbumRecord>,
    album_tags: CsvTable<AlbumTag>,
    songs: CsvTable<Song>,
}

impl BackendCsv {
    pub fn load(dir: &str) -> anyhow::Result<Self> {
        std::fs::create_dir_all(dir)?;
        let dir = Path::new(dir);

        Ok(Self {
            users: CsvTable::load(dir.join("users.csv"))?,
            sessions: CsvTable::load(dir.join("sessions.csv"))?,
            tags: CsvTable::load(dir.join("tags.csv"))?,
            albums: CsvTable::load(dir.join("albums.csv"))?,
            album_tags: CsvTable::load(dir.join("album_tags.csv"))?,
            songs: CsvTable::load(dir.join("songs.csv"))?,
        })
    }
}

fn album_view(record: &AlbumRecord, users: &[User], tags: &[Tag], links: &[AlbumTag]) -> Album {
    let user = record
        .user_id
        .and_then(|user_id| users.iter().find(|u| u.id == user_id))
        .map(UserSummary::from);

    let tags = links
        .iter()
        .filter(|link| link.album_id == record.id)
        .filter_map(|link| tags.iter().find(|t| t.id == link.tag_id))
        .cloned()
        .collect();

    Album {
        id: record.id,
        title: record.title.clone(),
        artist: record.artist.clone(),
        price: record.price,
        user_id: record.user_id,
        user,
        tags,
    }
}

impl CatalogManager for BackendCsv {
    fn create_user(&self, user_create: UserCreate) -> anyhow::Result<User, AppError> {
        self.users.update(|users| {
            if users
                .iter()
                .any(|u| u.email.eq_ignore_ascii_case(&user_create.email))
            {
                return Err(AppError::AlreadyExists(
                    "This email is already in use".to_string(),
                ));
            }

            let user = User {
                id: next_id(users.iter().map(|u| u.id)),
                email: user_create.email,
                password_hash: user_create.password_hash,
                name: user_create.name,
                created_at: chrono::Utc::now().timestamp(),
            };
            users.push(user.clone());
            Ok(user)
        })
    }

    fn user(&self, id: u64) -> anyhow::Result<Option<User>, AppError> {
        Ok(self.users.read().iter().find(|u| u.id == id).cloned())
    }

    fn user_by_email(&self, email: &str) -> anyhow::Result<Option<User>, AppError> {
        Ok(self
            .users
            .read()
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    fn create_session(&self, session: Session) -> anyhow::Result<(), AppError> {
        self.sessions.update(|sessions| {
            sessions.push(session);
            Ok(())
        })
    }

    fn session(&self, id: &str) -> anyhow::Result<Option<Session>, AppError> {
        Ok(self.sessions.read().iter().find(|s| s.id == id).cloned())
    }

    fn purge_sessions(&self, now: i64) -> anyhow::Result<usize, AppError> {
        if !self.sessions.read().iter().any(|s| s.expires_at <= now) {
            return Ok(0);
        }

        self.sessions.update(|sessions| {
            let before = sessions.len();
            sessions.retain(|s| s.expires_at > now);
            Ok(before - sessions.len())
        })
    }

    fn albums(&self) -> anyhow::Result<Vec<Album>, AppError> {
        let users = self.users.read();
        let tags = self.tags.read();
        let albums = self.albums.read();
        let links = self.album_tags.read();

        Ok(albums
            .iter()
            .map(|record| album_view(record, &users, &tags, &links))
            .collect())
    }

    fn album(&self, id: u64) -> anyhow::Result<Option<Album>, AppError> {
        let users = self.users.read();
        let tags = self.tags.read();
        let albums = self.albums.read();
        let links = self.album_tags.read();

        Ok(albums
            .iter()
            .find(|a| a.id == id)
            .map(|record| album_view(record, &users, &tags, &links)))
    }

    fn create_album(&self, album_create: AlbumCreate) -> anyhow::Result<Album, AppError> {
        let users = self.users.read();
        let tags = self.tags.read();

        let mut tag_ids = album_create.tag_ids;
        let mut seen = HashSet::new();
        tag_ids.retain(|id| seen.insert(*id));
        if let Some(unknown) = tag_ids.iter().find(|id| !tags.iter().any(|t| t.id == **id)) {
            return Err(AppError::BadRequest(format!("unknown tag id {unknown}")));
        }

        let record = self.albums.update(|albums| {
            let record = AlbumRecord {
                id: next_id(albums.iter().map(|a| a.id)),
                title: album_create.title,
                artist: album_create.artist,
                price: album_create.price,
                user_id: album_create.user_id,
            };
            albums.push(record.clone());
            Ok(record)
        })?;

        let links = self.album_tags.update(|links| {
            links.extend(tag_ids.iter().map(|tag_id| AlbumTag {
                album_id: record.id,
                tag_id: *tag_id,
            }));
            Ok(links.clone())
        });

        // an album must never be stored without its tags
        let links = match links {
            Ok(links) => links,
            Err(err) => {
                let rollback = self.albums.update(|albums| {
                    albums.retain(|a| a.id != record.id);
                    Ok(())
                });
                if let Err(rollback_err) = rollback {
                    log::error!("failed to roll back album id={}: {rollback_err}", record.id);
                }
                return Err(err);
            }
        };

        Ok(album_view(&record, &users, &tags, &links))
    }

    fn tags(&self) -> anyhow::Result<Vec<Tag>, AppError> {
        Ok(self.tags.read().clone())
    }

    fn create_tag(&self, name: &str) -> anyhow::Result<Tag, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::BadRequest("tag name cannot be empty".to_string()));
        }

        self.tags.update(|tags| {
            if tags.iter().any(|t| t.name.eq_ignore_ascii_case(name)) {
                return Err(AppError::AlreadyExists(format!("tag {name:?} already exists")));
            }

            let tag = Tag {
                id: next_id(tags.iter().map(|t| t.id)),
                name: name.to_string(),
            };
            tags.push(tag.clone());
            Ok(tag)
        })
    }

    fn songs(&self, album_id: u64) -> anyhow::Result<Vec<Song>, AppError> {
        let albums = self.albums.read();
        if !albums.iter().any(|a| a.id == album_id) {
            return Err(AppError::NotFound("album not found"));
        }

        Ok(self
            .songs
            .read()
            .iter()
            .filter(|s| s.album_id == album_id)
            .cloned()
            .collect())
    }

    fn create_song(&self, song_create: SongCreate) -> anyhow::Result<Song, AppError> {
        let albums = self.albums.read();
        if !albums.iter().any(|a| a.id == song_create.album_id) {
            return Err(AppError::NotFound("album not found"));
        }

        self.songs.update(|songs| {
            let song = Song {
                id: next_id(songs.iter().map(|s| s.id)),
                title: song_create.title,
                youtube_url: song_create.youtube_url,
                thumbnail_url: song_create.thumbnail_url,
                view_count: song_create.view_count,
                album_id: song_create.album_id,
            };
            songs.push(song.clone());
            Ok(song)
        })
    }

    fn delete_song(&self, id: u64) -> anyhow::Result<(), AppError> {
        self.songs.update(|songs| {
            let idx = songs
                .iter()
                .position(|s| s.id == id)
                .ok_or(AppError::NotFound("song not found"))?;
            songs.remove(idx);
            Ok(())
        })
    }
}
