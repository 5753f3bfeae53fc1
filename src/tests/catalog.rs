use crate::{
    app::AppError,
    catalog::{seed_albums, AlbumCreate, BackendCsv, CatalogManager, Session, SongCreate, UserCreate},
};

fn open(tmp: &tempfile::TempDir) -> BackendCsv {
    BackendCsv::load(tmp.path().join("catalog").to_str().unwrap()).expect("failed to open catalog")
}

fn user(email: &str) -> UserCreate {
    UserCreate {
        email: email.to_string(),
        password_hash: "$2b$04$hash".to_string(),
        name: "Jane".to_string(),
    }
}

fn album(title: &str, tag_ids: Vec<u64>) -> AlbumCreate {
    AlbumCreate {
        title: title.to_string(),
        artist: "John Coltrane".to_string(),
        price: 56.99,
        user_id: None,
        tag_ids,
    }
}

fn song(album_id: u64, title: &str) -> SongCreate {
    SongCreate {
        title: title.to_string(),
        youtube_url: "https://youtu.be/dQw4w9WgXcQ".to_string(),
        thumbnail_url: "https://i.ytimg.com/vi/dQw4w9WgXcQ/hqdefault.jpg".to_string(),
        view_count: 42,
        album_id,
    }
}

#[test]
fn test_catalog_survives_reload() {
    let tmp = tempfile::tempdir().unwrap();

    {
        let catalog = open(&tmp);
        let jane = catalog.create_user(user("jane@example.com")).unwrap();
        let tag = catalog.create_tag("jazz").unwrap();
        let created = catalog
            .create_album(AlbumCreate {
                user_id: Some(jane.id),
                ..album("Blue Train", vec![tag.id])
            })
            .unwrap();
        catalog.create_song(song(created.id, "Moment's Notice")).unwrap();
    }

    let catalog = open(&tmp);

    let jane = catalog.user_by_email("jane@example.com").unwrap().unwrap();
    assert_eq!(jane.id, 1);
    assert!(jane.created_at > 0);

    let albums = catalog.albums().unwrap();
    assert_eq!(albums.len(), 1);
    assert_eq!(albums[0].title, "Blue Train");
    assert_eq!(albums[0].tags.len(), 1);
    assert_eq!(albums[0].tags[0].name, "jazz");
    assert_eq!(albums[0].user.as_ref().unwrap().email, "jane@example.com");

    let songs = catalog.songs(albums[0].id).unwrap();
    assert_eq!(songs.len(), 1);
    assert_eq!(songs[0].title, "Moment's Notice");
    assert_eq!(songs[0].view_count, 42);
}

#[test]
fn test_ids_are_sequential() {
    let tmp = tempfile::tempdir().unwrap();
    let catalog = open(&tmp);

    let first = catalog.create_album(album("Blue Train", vec![])).unwrap();
    let second = catalog.create_album(album("Giant Steps", vec![])).unwrap();
    assert_eq!(first.id, 1);
    assert_eq!(second.id, 2);

    let a = catalog.create_song(song(first.id, "a")).unwrap();
    let b = catalog.create_song(song(first.id, "b")).unwrap();
    assert_eq!((a.id, b.id), (1, 2));

    // deleting the newest song frees its id
    catalog.delete_song(b.id).unwrap();
    let c = catalog.create_song(song(second.id, "c")).unwrap();
    assert_eq!(c.id, 2);
}

#[test]
fn test_duplicate_email() {
    let tmp = tempfile::tempdir().unwrap();
    let catalog = open(&tmp);

    catalog.create_user(user("jane@example.com")).unwrap();
    let err = catalog.create_user(user("JANE@example.com")).unwrap_err();
    assert!(matches!(err, AppError::AlreadyExists(_)));

    assert!(catalog.user_by_email("Jane@Example.com").unwrap().is_some());
    assert!(catalog.user_by_email("john@example.com").unwrap().is_none());
}

#[test]
fn test_tags() {
    let tmp = tempfile::tempdir().unwrap();
    let catalog = open(&tmp);

    let jazz = catalog.create_tag("  jazz ").unwrap();
    assert_eq!(jazz.name, "jazz");

    assert!(matches!(
        catalog.create_tag("Jazz"),
        Err(AppError::AlreadyExists(_))
    ));
    assert!(matches!(catalog.create_tag("   "), Err(AppError::BadRequest(_))));

    catalog.create_tag("bebop").unwrap();
    let names: Vec<_> = catalog.tags().unwrap().into_iter().map(|t| t.name).collect();
    assert_eq!(names, vec!["jazz", "bebop"]);
}

#[test]
fn test_album_tags() {
    let tmp = tempfile::tempdir().unwrap();
    let catalog = open(&tmp);

    let jazz = catalog.create_tag("jazz").unwrap();
    let bebop = catalog.create_tag("bebop").unwrap();

    let created = catalog
        .create_album(album("Jeru", vec![bebop.id, jazz.id, bebop.id]))
        .unwrap();
    assert_eq!(created.tags, vec![bebop.clone(), jazz.clone()]);
    assert!(created.user.is_none());

    let err = catalog.create_album(album("Nope", vec![jazz.id, 99])).unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    // nothing stored for the rejected album
    assert_eq!(catalog.albums().unwrap().len(), 1);

    assert_eq!(catalog.album(created.id).unwrap().unwrap(), created);
    assert!(catalog.album(99).unwrap().is_none());
}

#[test]
fn test_album_rolled_back_when_tags_cannot_be_saved() {
    let tmp = tempfile::tempdir().unwrap();
    let catalog = open(&tmp);
    let jazz = catalog.create_tag("jazz").unwrap();

    // a directory in place of the temp file makes the link write fail
    let blocker = tmp.path().join("catalog").join("album_tags.csv-tmp");
    std::fs::create_dir(&blocker).unwrap();

    let err = catalog.create_album(album("Blue Train", vec![jazz.id])).unwrap_err();
    assert!(matches!(err, AppError::Csv(_) | AppError::IO(_)), "{err:?}");
    assert!(catalog.albums().unwrap().is_empty());
    assert!(open(&tmp).albums().unwrap().is_empty());

    std::fs::remove_dir(&blocker).unwrap();

    let created = catalog.create_album(album("Blue Train", vec![jazz.id])).unwrap();
    assert_eq!(created.id, 1);
    assert_eq!(created.tags, vec![jazz]);
}

#[test]
fn test_songs_of_missing_album() {
    let tmp = tempfile::tempdir().unwrap();
    let catalog = open(&tmp);

    assert!(matches!(catalog.songs(7), Err(AppError::NotFound(_))));
    assert!(matches!(
        catalog.create_song(song(7, "orphan")),
        Err(AppError::NotFound(_))
    ));
}

#[test]
fn test_songs_are_scoped_to_album() {
    let tmp = tempfile::tempdir().unwrap();
    let catalog = open(&tmp);

    let first = catalog.create_album(album("Blue Train", vec![])).unwrap();
    let second = catalog.create_album(album("Giant Steps", vec![])).unwrap();

    catalog.create_song(song(first.id, "Locomotion")).unwrap();
    catalog.create_song(song(second.id, "Naima")).unwrap();

    let titles: Vec<_> = catalog
        .songs(second.id)
        .unwrap()
        .into_iter()
        .map(|s| s.title)
        .collect();
    assert_eq!(titles, vec!["Naima"]);
}

#[test]
fn test_delete_song() {
    let tmp = tempfile::tempdir().unwrap();
    let catalog = open(&tmp);

    let created = catalog.create_album(album("Blue Train", vec![])).unwrap();
    let locomotion = catalog.create_song(song(created.id, "Locomotion")).unwrap();

    catalog.delete_song(locomotion.id).unwrap();
    assert!(catalog.songs(created.id).unwrap().is_empty());

    assert!(matches!(
        catalog.delete_song(locomotion.id),
        Err(AppError::NotFound(_))
    ));

    // deletion is persisted
    let reloaded = open(&tmp);
    assert!(reloaded.songs(created.id).unwrap().is_empty());
}

#[test]
fn test_sessions() {
    let tmp = tempfile::tempdir().unwrap();
    let catalog = open(&tmp);

    for (id, expires_at) in [("old", 100), ("fresh", 10_000)] {
        catalog
            .create_session(Session {
                id: id.to_string(),
                secret_digest: "digest".to_string(),
                user_id: 1,
                expires_at,
            })
            .unwrap();
    }

    assert_eq!(catalog.purge_sessions(5_000).unwrap(), 1);
    assert!(catalog.session("old").unwrap().is_none());
    assert_eq!(catalog.session("fresh").unwrap().unwrap().user_id, 1);
    assert_eq!(catalog.purge_sessions(5_000).unwrap(), 0);
}

#[test]
fn test_seed_albums_only_into_empty_catalog() {
    let tmp = tempfile::tempdir().unwrap();
    let catalog = open(&tmp);

    assert_eq!(seed_albums(&catalog).unwrap(), 3);
    assert_eq!(seed_albums(&catalog).unwrap(), 0);

    let albums = catalog.albums().unwrap();
    assert_eq!(albums.len(), 3);
    assert_eq!(albums[0].title, "Blue Train");
    assert_eq!(albums[0].artist, "John Coltrane");
    assert_eq!(albums[0].price, 56.99);
}
