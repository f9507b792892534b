mod common;

use chrono::{Duration, Utc};
use common::*;
use gigboard::models::{Venue, VenueFields};
use serde_json::Value;

const HOP: &[(&str, &str)] = &[
    ("name", "The Musical Hop"),
    ("city", "San Francisco"),
    ("state", "CA"),
    ("address", "1015 Folsom Street"),
    ("phone", "123-123-1234"),
    ("genres", "Jazz"),
    ("genres", "Reggae"),
    ("image_link", "https://example.com/hop.jpg"),
    ("facebook_link", "https://www.facebook.com/TheMusicalHop"),
    ("website_link", "https://www.themusicalhop.com"),
    ("seeking_talent", "y"),
    ("seeking_description", "Looking for a local artist"),
];

#[tokio::test]
async fn test_create_then_fetch_round_trips_every_field() {
    let (router, state) = app().await;

    let resp = post(&router, "/venues/create", HOP).await;
    assert_eq!(resp.status_code, 200);
    assert!(resp.body.contains("Venue The Musical Hop was successfully listed!"));

    let mut conn = state.db.pool().acquire().await.unwrap();
    let venues = Venue::all(&mut *conn).await.unwrap();
    drop(conn);
    assert_eq!(venues.len(), 1);
    let stored = VenueFields::from(&venues[0]);
    assert_eq!(stored, VenueFields::from_form(&form(HOP)).unwrap());
    assert_eq!(stored.genres, vec!["Jazz", "Reggae"]);
    assert_eq!(stored.website, "https://www.themusicalhop.com");
    assert!(stored.seeking_talent);

    let page = get(&router, &format!("/venues/{}", venues[0].id)).await;
    assert_eq!(page.status_code, 200);
    assert!(page.body.contains("The Musical Hop"));
    assert!(page.body.contains("1015 Folsom Street"));
    assert!(page.body.contains("Reggae"));
    assert!(page.body.contains("Looking for a local artist"));
}

#[tokio::test]
async fn test_create_keeps_submitted_whitespace() {
    let (router, state) = app().await;
    let mut padded: Vec<(&str, &str)> = HOP.to_vec();
    padded[0] = ("name", " The Hop ");
    padded[11] = ("seeking_description", "Line one\n\nLine two\n");

    let resp = post(&router, "/venues/create", &padded).await;
    assert_eq!(resp.status_code, 200);

    let mut conn = state.db.pool().acquire().await.unwrap();
    let venues = Venue::all(&mut *conn).await.unwrap();
    assert_eq!(venues.len(), 1);
    assert_eq!(venues[0].name, " The Hop ");
    assert_eq!(venues[0].seeking_description, "Line one\n\nLine two\n");
}

#[tokio::test]
async fn test_failed_create_changes_nothing_and_flashes() {
    let (router, state) = app().await;
    let incomplete: Vec<(&str, &str)> = HOP.iter().copied().filter(|(k, _)| *k != "phone").collect();

    let resp = post(&router, "/venues/create", &incomplete).await;
    assert_eq!(resp.status_code, 200);
    assert!(resp.body.contains("An error occurred. Venue The Musical Hop could not be listed."));
    assert_eq!(count_venues(&state.db).await, 0);
}

#[tokio::test]
async fn test_directory_page() {
    let (router, state) = app().await;
    let hop = add_venue(&state.db, "The Musical Hop", "San Francisco", "CA").await;
    add_venue(&state.db, "The Dueling Pianos Bar", "New York", "NY").await;
    add_venue(&state.db, "Park Square Live Music & Coffee", "San Francisco", "CA").await;
    let artist = add_artist(&state.db, "Guns N Petals").await;
    add_show(&state.db, hop, artist, Utc::now() + Duration::days(3)).await;

    let resp = get(&router, "/venues").await;
    assert_eq!(resp.status_code, 200);
    let sf = resp.body.find("San Francisco, CA").unwrap();
    let ny = resp.body.find("New York, NY").unwrap();
    assert!(sf < ny);
    assert_eq!(resp.body.matches("San Francisco, CA").count(), 1);
    assert!(resp.body.contains("Park Square Live Music &amp; Coffee"));
    assert!(resp.body.contains("(1 upcoming)"));
}

#[tokio::test]
async fn test_search_page() {
    let (router, state) = app().await;
    add_venue(&state.db, "The Musical Hop", "San Francisco", "CA").await;
    add_venue(&state.db, "Park Square Live Music & Coffee", "San Francisco", "CA").await;
    add_venue(&state.db, "The Dueling Pianos Bar", "New York", "NY").await;

    let resp = post(&router, "/venues/search", &[("search_term", "music")]).await;
    assert_eq!(resp.status_code, 200);
    assert!(resp.body.contains("Number of search results for \"music\": 2"));
    assert!(resp.body.contains("The Musical Hop"));
    assert!(!resp.body.contains("Dueling Pianos"));
}

#[tokio::test]
async fn test_detail_of_missing_venue_is_404() {
    let (router, _state) = app().await;
    assert_eq!(get(&router, "/venues/99").await.status_code, 404);
    assert_eq!(get(&router, "/venues/abc").await.status_code, 404);
}

#[tokio::test]
async fn test_detail_splits_past_and_upcoming() {
    let (router, state) = app().await;
    let hop = add_venue(&state.db, "The Musical Hop", "San Francisco", "CA").await;
    let petals = add_artist(&state.db, "Guns N Petals").await;
    let sax = add_artist(&state.db, "The Wild Sax Band").await;
    add_show(&state.db, hop, petals, Utc::now() - Duration::days(300)).await;
    add_show(&state.db, hop, sax, Utc::now() + Duration::days(30)).await;

    let page = get(&router, &format!("/venues/{hop}")).await;
    assert!(page.body.contains("1 Upcoming Shows"));
    assert!(page.body.contains("1 Past Shows"));
    let upcoming = page.body.find("Upcoming Shows").unwrap();
    let past = page.body.find("Past Shows").unwrap();
    let sax_at = page.body.find("The Wild Sax Band").unwrap();
    let petals_at = page.body.find("Guns N Petals").unwrap();
    assert!(upcoming < sax_at && sax_at < past);
    assert!(past < petals_at);
}

#[tokio::test]
async fn test_edit_form_is_prefilled() {
    let (router, state) = app().await;
    let hop = add_venue(&state.db, "The Musical Hop", "San Francisco", "CA").await;

    let page = get(&router, &format!("/venues/{hop}/edit")).await;
    assert_eq!(page.status_code, 200);
    assert!(page.body.contains("value=\"The Musical Hop\""));
    assert!(page.body.contains("<option value=\"CA\" selected>"));
    assert!(page.body.contains(&format!("action=\"/venues/{hop}/edit\"")));
}

#[tokio::test]
async fn test_update_redirects_with_flash() {
    let (router, state) = app().await;
    let hop = add_venue(&state.db, "The Musical Hop", "San Francisco", "CA").await;
    let mut edited: Vec<(&str, &str)> = HOP.to_vec();
    edited[0] = ("name", "The Musical Hop Reloaded");

    let resp = post(&router, &format!("/venues/{hop}/edit"), &edited).await;
    assert_eq!(resp.status_code, 303);
    assert_eq!(resp.header("Location"), Some(format!("/venues/{hop}").as_str()));
    assert_eq!(
        resp.flashes,
        vec!["Venue \"The Musical Hop Reloaded\" was successfully updated!"]
    );
    assert!(resp.header("Set-Cookie").unwrap().starts_with("flash="));

    let mut conn = state.db.pool().acquire().await.unwrap();
    let venue = Venue::find(&mut *conn, hop).await.unwrap().unwrap();
    assert_eq!(venue.name, "The Musical Hop Reloaded");
    assert_eq!(venue.genres.0, vec!["Jazz", "Reggae"]);
}

#[tokio::test]
async fn test_invalid_update_keeps_record() {
    let (router, state) = app().await;
    let hop = add_venue(&state.db, "The Musical Hop", "San Francisco", "CA").await;

    let resp = post(&router, &format!("/venues/{hop}/edit"), &[("name", "Renamed")]).await;
    assert_eq!(resp.status_code, 303);
    assert_eq!(
        resp.flashes,
        vec!["An error occurred. Venue \"The Musical Hop\" could not be updated."]
    );

    let mut conn = state.db.pool().acquire().await.unwrap();
    let venue = Venue::find(&mut *conn, hop).await.unwrap().unwrap();
    assert_eq!(venue.name, "The Musical Hop");
}

#[tokio::test]
async fn test_failed_write_rolls_back_update() {
    let (router, state) = app().await;
    let hop = add_venue(&state.db, "Hop", "San Francisco", "CA").await;
    sqlx::query("CREATE TRIGGER venues_frozen BEFORE UPDATE ON venues BEGIN SELECT RAISE(ABORT, 'frozen'); END")
        .execute(state.db.pool())
        .await
        .unwrap();

    let mut edited: Vec<(&str, &str)> = HOP.to_vec();
    edited[0] = ("name", "Renamed");
    let resp = post(&router, &format!("/venues/{hop}/edit"), &edited).await;
    assert_eq!(resp.status_code, 303);
    assert_eq!(resp.flashes, vec!["An error occurred. Venue \"Hop\" could not be updated."]);

    let mut conn = state.db.pool().acquire().await.unwrap();
    let venue = Venue::find(&mut *conn, hop).await.unwrap().unwrap();
    assert_eq!(venue.name, "Hop");
}

#[tokio::test]
async fn test_update_of_missing_venue_redirects_home() {
    let (router, _state) = app().await;
    let resp = post(&router, "/venues/77/edit", HOP).await;
    assert_eq!(resp.status_code, 303);
    assert_eq!(resp.header("Location"), Some("/"));
    assert_eq!(resp.flashes, vec!["Venue with ID 77 not found."]);
}

#[tokio::test]
async fn test_delete_venue() {
    let (router, state) = app().await;
    let hop = add_venue(&state.db, "The Musical Hop", "San Francisco", "CA").await;
    let artist = add_artist(&state.db, "Guns N Petals").await;
    add_show(&state.db, hop, artist, Utc::now()).await;

    let resp = delete(&router, &format!("/venues/{hop}")).await;
    assert_eq!(resp.status_code, 200);
    let body: Value = serde_json::from_str(&resp.body).unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Venue \"The Musical Hop\" was successfully deleted.");

    assert_eq!(count_venues(&state.db).await, 0);
    assert_eq!(count_shows(&state.db).await, 0);
    assert_eq!(count_artists(&state.db).await, 1);
}

#[tokio::test]
async fn test_delete_nonexistent_venue_is_404_json() {
    let (router, _state) = app().await;
    for path in ["/venues/12345", "/venues/nope"] {
        let resp = delete(&router, path).await;
        assert_eq!(resp.status_code, 404);
        assert_eq!(resp.header("Content-Type"), Some("application/json; charset=utf-8"));
        let body: Value = serde_json::from_str(&resp.body).unwrap();
        assert_eq!(body["success"], false);
        assert!(body["message"].as_str().unwrap().ends_with("not found."));
    }
}

#[tokio::test]
async fn test_new_venue_form() {
    let (router, _state) = app().await;
    let page = get(&router, "/venues/create").await;
    assert_eq!(page.status_code, 200);
    assert!(page.body.contains("name=\"seeking_talent\""));
    assert!(page.body.contains("<option value=\"Rock n Roll\">"));
    assert!(page.body.contains("<option value=\"WY\">"));
}
