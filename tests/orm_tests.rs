mod common;

use chrono::{TimeZone, Utc};
use common::*;
use gigboard::models::{Artist, NewShow, Show, Venue};
use gigboard::orm::{self, Db, Model};
use sqlx::Row;
use std::sync::Arc;

#[tokio::test]
async fn test_db_basic_crud() {
    use sqlx::FromRow;

    #[derive(Debug, FromRow, PartialEq, Eq)]
    struct Person {
        name: String,
    }

    let db = Db::connect("sqlite::memory:", 1).await.unwrap();
    db.execute("CREATE TABLE person (id INTEGER PRIMARY KEY, name TEXT)")
        .await
        .unwrap();
    db.execute("INSERT INTO person (name) VALUES ('Alice')")
        .await
        .unwrap();

    let people: Vec<Person> = sqlx::query_as("SELECT name FROM person")
        .fetch_all(db.pool())
        .await
        .unwrap();
    let names: Vec<String> = people.into_iter().map(|person| person.name).collect();
    assert_eq!(names, vec!["Alice"]);
}

#[test]
fn test_derived_schema() {
    assert_eq!(<Venue as Model>::table_name(), "venues");
    let sql = <Show as Model>::create_table_sql();
    assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS shows"));
    assert!(sql.contains("id INTEGER PRIMARY KEY AUTOINCREMENT"));
    assert!(sql.contains("venue_id INTEGER NOT NULL REFERENCES venues(id) ON DELETE CASCADE"));
    assert!(sql.contains("start_time DATETIME NOT NULL"));

    let columns = <Venue as Model>::columns();
    assert!(columns.contains(&("genres".to_string(), "TEXT NOT NULL DEFAULT '[]'".to_string())));
    assert!(columns.contains(&("seeking_talent".to_string(), "BOOLEAN NOT NULL DEFAULT 0".to_string())));
}

#[tokio::test]
async fn test_migrate_records_schema_hash() {
    let db = memory_db().await;
    let row = sqlx::query("SELECT hash FROM __gigboard_migrations WHERE table_name = 'venues'")
        .fetch_one(db.pool())
        .await
        .unwrap();
    let hash: String = row.get("hash");
    assert_eq!(hash.len(), 64);

    // Running again is a no-op, as is the registry-driven migration.
    <Venue as Model>::migrate(db.clone()).await.unwrap();
    orm::auto_migrate(db.clone()).await.unwrap();
    assert_eq!(count_venues(&db).await, 0);
}

#[tokio::test]
async fn test_migrate_adds_missing_columns() {
    let db = Arc::new(Db::connect("sqlite::memory:", 1).await.unwrap());
    // Creates the bookkeeping table.
    <Artist as Model>::migrate(db.clone()).await.unwrap();

    db.execute(
        "CREATE TABLE venues (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL, \
         city TEXT NOT NULL, state TEXT NOT NULL, address TEXT NOT NULL, phone TEXT NOT NULL)",
    )
    .await
    .unwrap();
    db.execute("INSERT INTO __gigboard_migrations (table_name, schema_sql, hash) VALUES ('venues', '', 'stale')")
        .await
        .unwrap();
    db.execute("INSERT INTO venues (name, city, state, address, phone) VALUES ('Old Hall', 'Austin', 'TX', '1 Main St', '555')")
        .await
        .unwrap();

    <Venue as Model>::migrate(db.clone()).await.unwrap();

    let columns: Vec<String> = sqlx::query("PRAGMA table_info(venues)")
        .fetch_all(db.pool())
        .await
        .unwrap()
        .into_iter()
        .map(|row| row.get::<String, _>("name"))
        .collect();
    for expected in ["genres", "image_link", "website", "seeking_talent", "seeking_description"] {
        assert!(columns.contains(&expected.to_string()), "missing {expected}");
    }

    // The pre-existing row picks up the declared defaults.
    let mut conn = db.pool().acquire().await.unwrap();
    let venue = Venue::find(&mut *conn, 1).await.unwrap().unwrap();
    assert_eq!(venue.name, "Old Hall");
    assert!(venue.genres.0.is_empty());
    assert!(!venue.seeking_talent);
}

#[tokio::test]
async fn test_venue_round_trip() {
    let db = memory_db().await;
    let mut fields = venue_fields("The Musical Hop", "San Francisco", "CA");
    fields.genres = vec!["Jazz".to_string(), "Reggae".to_string()];
    fields.website = "https://www.themusicalhop.com".to_string();
    fields.seeking_talent = true;
    fields.seeking_description = "Looking for a local artist".to_string();

    let mut tx = db.begin().await.unwrap();
    let id = Venue::insert(&mut *tx, &fields).await.unwrap();
    tx.commit().await.unwrap();

    let mut conn = db.pool().acquire().await.unwrap();
    let venue = Venue::find(&mut *conn, id).await.unwrap().unwrap();
    assert_eq!(venue.id, id);
    assert_eq!(gigboard::models::VenueFields::from(&venue), fields);
}

#[tokio::test]
async fn test_update_and_delete_report_missing_rows() {
    let db = memory_db().await;
    let mut conn = db.pool().acquire().await.unwrap();
    assert!(!Venue::update(&mut *conn, 42, &venue_fields("X", "Y", "CA")).await.unwrap());
    assert!(!Artist::delete(&mut *conn, 42).await.unwrap());
}

#[tokio::test]
async fn test_dropped_transaction_rolls_back() {
    let db = memory_db().await;
    {
        let mut tx = db.begin().await.unwrap();
        Venue::insert(&mut *tx, &venue_fields("Ghost", "Nowhere", "NV"))
            .await
            .unwrap();
    }
    assert_eq!(count_venues(&db).await, 0);
}

#[tokio::test]
async fn test_show_foreign_keys_are_enforced() {
    let db = memory_db().await;
    let venue_id = add_venue(&db, "The Musical Hop", "San Francisco", "CA").await;

    let mut tx = db.begin().await.unwrap();
    let result = Show::insert(
        &mut *tx,
        &NewShow {
            venue_id,
            artist_id: 999,
            start_time: Utc.with_ymd_and_hms(2035, 4, 1, 20, 0, 0).unwrap(),
        },
    )
    .await;
    assert!(result.is_err());
    drop(tx);

    assert_eq!(count_shows(&db).await, 0);
}

#[tokio::test]
async fn test_deleting_venue_cascades_to_shows() {
    let db = memory_db().await;
    let hop = add_venue(&db, "The Musical Hop", "San Francisco", "CA").await;
    let bar = add_venue(&db, "The Dueling Pianos Bar", "New York", "NY").await;
    let artist = add_artist(&db, "Guns N Petals").await;
    let when = Utc.with_ymd_and_hms(2019, 5, 21, 21, 30, 0).unwrap();
    add_show(&db, hop, artist, when).await;
    add_show(&db, bar, artist, when).await;

    let mut tx = db.begin().await.unwrap();
    assert!(Venue::delete(&mut *tx, hop).await.unwrap());
    tx.commit().await.unwrap();

    let mut conn = db.pool().acquire().await.unwrap();
    let remaining = Show::all(&mut *conn).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].venue_id, bar);
    assert_eq!(remaining[0].start_time, when);
}

#[tokio::test]
async fn test_show_joins() {
    let db = memory_db().await;
    let venue = add_venue(&db, "Park Square Live Music & Coffee", "San Francisco", "CA").await;
    let artist = add_artist(&db, "The Wild Sax Band").await;
    let when = Utc.with_ymd_and_hms(2035, 4, 1, 20, 0, 0).unwrap();
    add_show(&db, venue, artist, when).await;

    let mut conn = db.pool().acquire().await.unwrap();
    let at_venue = Show::for_venue(&mut *conn, venue).await.unwrap();
    assert_eq!(at_venue.len(), 1);
    assert_eq!(at_venue[0].artist_name, "The Wild Sax Band");

    let by_artist = Show::for_artist(&mut *conn, artist).await.unwrap();
    assert_eq!(by_artist[0].venue_name, "Park Square Live Music & Coffee");

    let listing = Show::listing(&mut *conn).await.unwrap();
    assert_eq!(listing[0].venue_id, venue);
    assert_eq!(listing[0].artist_id, artist);
    assert_eq!(listing[0].start_time, when);
}

#[tokio::test]
async fn test_apply_migration_files_once() {
    let db = memory_db().await;
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("0002_more.sql"),
        "INSERT INTO artists (name, city, state, phone) VALUES ('Matt Quevedo', 'New York', 'NY', '300-400-5000');",
    )
    .unwrap();
    std::fs::write(
        dir.path().join("0001_first.sql"),
        "INSERT INTO venues (name, city, state, address, phone) VALUES ('Hall', 'Austin', 'TX', '1 Main', '555');",
    )
    .unwrap();
    std::fs::write(dir.path().join("notes.txt"), "not a migration").unwrap();

    let applied = orm::apply_migration_files(db.clone(), dir.path()).await.unwrap();
    assert_eq!(applied, 2);
    let again = orm::apply_migration_files(db.clone(), dir.path()).await.unwrap();
    assert_eq!(again, 0);

    assert_eq!(count_venues(&db).await, 1);
    assert_eq!(count_artists(&db).await, 1);
}

#[tokio::test]
async fn test_failed_migration_file_leaves_nothing_behind() {
    let db = memory_db().await;
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("0001_broken.sql"),
        "INSERT INTO venues (name, city, state, address, phone) VALUES ('Hall', 'Austin', 'TX', '1 Main', '555');\nINSERT INTO nowhere VALUES (1);",
    )
    .unwrap();

    assert!(orm::apply_migration_files(db.clone(), dir.path()).await.is_err());
    assert_eq!(count_venues(&db).await, 0);
}

#[tokio::test]
async fn test_seed_listings_load() {
    let db = memory_db().await;
    let dir = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations");
    orm::apply_migration_files(db.clone(), &dir).await.unwrap();

    assert_eq!(count_venues(&db).await, 3);
    assert_eq!(count_artists(&db).await, 3);
    assert_eq!(count_shows(&db).await, 5);

    let mut conn = db.pool().acquire().await.unwrap();
    let hop = Venue::find(&mut *conn, 1).await.unwrap().unwrap();
    assert_eq!(hop.name, "The Musical Hop");
    assert_eq!(hop.genres.0, vec!["Jazz", "Reggae", "Swing", "Classical", "Folk"]);
    assert!(hop.seeking_talent);
}
