#![allow(dead_code)]

use chrono::{DateTime, Utc};
use gigboard::app::build_router;
use gigboard::forms::FormData;
use gigboard::models::{Artist, ArtistFields, NewShow, Show, Venue, VenueFields};
use gigboard::orm::{Db, Model};
use gigboard::router::{AppState, Method, RequestContext, Response, Router};
use gigboard::settings::Settings;
use std::path::PathBuf;
use std::sync::Arc;

/// Fresh in-memory database with every table created.
pub async fn memory_db() -> Arc<Db> {
    let db = Arc::new(Db::connect("sqlite::memory:", 1).await.unwrap());
    <Venue as Model>::migrate(db.clone()).await.unwrap();
    <Artist as Model>::migrate(db.clone()).await.unwrap();
    <Show as Model>::migrate(db.clone()).await.unwrap();
    db
}

/// App state over an in-memory database, rendering the crate's own templates.
pub async fn memory_state() -> AppState {
    let mut settings = Settings::default();
    settings.template.dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("templates");
    AppState::new(memory_db().await, settings)
}

pub async fn app() -> (Router, AppState) {
    let state = memory_state().await;
    (build_router(state.clone()), state)
}

pub fn form(pairs: &[(&str, &str)]) -> FormData {
    FormData::from_pairs(pairs.iter().copied())
}

pub async fn get(router: &Router, path: &str) -> Response {
    router.dispatch(RequestContext::new(Method::Get, path)).await
}

pub async fn post(router: &Router, path: &str, pairs: &[(&str, &str)]) -> Response {
    router
        .dispatch(RequestContext::new(Method::Post, path).with_form(form(pairs)))
        .await
}

pub async fn delete(router: &Router, path: &str) -> Response {
    router.dispatch(RequestContext::new(Method::Delete, path)).await
}

pub fn venue_fields(name: &str, city: &str, state: &str) -> VenueFields {
    VenueFields {
        name: name.to_string(),
        city: city.to_string(),
        state: state.to_string(),
        address: "1015 Folsom Street".to_string(),
        phone: "123-123-1234".to_string(),
        ..VenueFields::default()
    }
}

pub fn artist_fields(name: &str) -> ArtistFields {
    ArtistFields {
        name: name.to_string(),
        city: "San Francisco".to_string(),
        state: "CA".to_string(),
        phone: "326-123-5000".to_string(),
        ..ArtistFields::default()
    }
}

pub async fn add_venue(db: &Db, name: &str, city: &str, state: &str) -> i64 {
    let mut tx = db.begin().await.unwrap();
    let id = Venue::insert(&mut *tx, &venue_fields(name, city, state))
        .await
        .unwrap();
    tx.commit().await.unwrap();
    id
}

pub async fn add_artist(db: &Db, name: &str) -> i64 {
    let mut tx = db.begin().await.unwrap();
    let id = Artist::insert(&mut *tx, &artist_fields(name)).await.unwrap();
    tx.commit().await.unwrap();
    id
}

pub async fn add_show(db: &Db, venue_id: i64, artist_id: i64, start_time: DateTime<Utc>) -> i64 {
    let mut tx = db.begin().await.unwrap();
    let id = Show::insert(
        &mut *tx,
        &NewShow {
            venue_id,
            artist_id,
            start_time,
        },
    )
    .await
    .unwrap();
    tx.commit().await.unwrap();
    id
}

pub async fn count_venues(db: &Db) -> i64 {
    let mut conn = db.pool().acquire().await.unwrap();
    Venue::count(&mut *conn).await.unwrap()
}

pub async fn count_artists(db: &Db) -> i64 {
    let mut conn = db.pool().acquire().await.unwrap();
    Artist::count(&mut *conn).await.unwrap()
}

pub async fn count_shows(db: &Db) -> i64 {
    let mut conn = db.pool().acquire().await.unwrap();
    Show::count(&mut *conn).await.unwrap()
}
