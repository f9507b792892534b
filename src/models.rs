//! Venue, Artist and Show records and their queries.
//!
//! Every query takes the request's connection (`&mut *tx`) so that all reads and
//! writes of one request share a single transaction.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::types::Json;
use sqlx::{FromRow, SqliteConnection};

use crate::Model;

#[derive(Debug, Clone, PartialEq, Serialize, FromRow, Model)]
#[model(table = "venues")]
pub struct Venue {
    #[model(primary_key)]
    pub id: i64,
    pub name: String,
    pub city: String,
    pub state: String,
    pub address: String,
    pub phone: String,
    #[model(default = "'[]'")]
    pub genres: Json<Vec<String>>,
    #[model(default = "''")]
    pub image_link: String,
    #[model(default = "''")]
    pub facebook_link: String,
    #[model(default = "''")]
    pub website: String,
    #[model(default = "0")]
    pub seeking_talent: bool,
    #[model(default = "''")]
    pub seeking_description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, FromRow, Model)]
#[model(table = "artists")]
pub struct Artist {
    #[model(primary_key)]
    pub id: i64,
    pub name: String,
    pub city: String,
    pub state: String,
    pub phone: String,
    #[model(default = "'[]'")]
    pub genres: Json<Vec<String>>,
    #[model(default = "''")]
    pub image_link: String,
    #[model(default = "''")]
    pub facebook_link: String,
    #[model(default = "''")]
    pub website: String,
    #[model(default = "0")]
    pub seeking_venue: bool,
    #[model(default = "''")]
    pub seeking_description: String,
}

#[derive(Debug, Clone, PartialEq, FromRow, Model)]
#[model(table = "shows")]
pub struct Show {
    #[model(primary_key)]
    pub id: i64,
    #[model(references = "venues(id) ON DELETE CASCADE")]
    pub venue_id: i64,
    #[model(references = "artists(id) ON DELETE CASCADE")]
    pub artist_id: i64,
    pub start_time: DateTime<Utc>,
}

/// Editable venue columns. Required fields are checked by the form layer; the
/// `Default` values are the declared defaults for everything optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct VenueFields {
    pub name: String,
    pub city: String,
    pub state: String,
    pub address: String,
    pub phone: String,
    pub genres: Vec<String>,
    pub image_link: String,
    pub facebook_link: String,
    pub website: String,
    pub seeking_talent: bool,
    pub seeking_description: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ArtistFields {
    pub name: String,
    pub city: String,
    pub state: String,
    pub phone: String,
    pub genres: Vec<String>,
    pub image_link: String,
    pub facebook_link: String,
    pub website: String,
    pub seeking_venue: bool,
    pub seeking_description: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewShow {
    pub venue_id: i64,
    pub artist_id: i64,
    pub start_time: DateTime<Utc>,
}

/// A show at one venue, joined with its artist.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct ShowWithArtist {
    pub artist_id: i64,
    pub artist_name: String,
    pub artist_image_link: String,
    pub start_time: DateTime<Utc>,
}

/// A show by one artist, joined with its venue.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct ShowWithVenue {
    pub venue_id: i64,
    pub venue_name: String,
    pub venue_image_link: String,
    pub start_time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct ShowListingRow {
    pub venue_id: i64,
    pub venue_name: String,
    pub artist_id: i64,
    pub artist_name: String,
    pub artist_image_link: String,
    pub start_time: DateTime<Utc>,
}

impl From<&Venue> for VenueFields {
    fn from(venue: &Venue) -> Self {
        VenueFields {
            name: venue.name.clone(),
            city: venue.city.clone(),
            state: venue.state.clone(),
            address: venue.address.clone(),
            phone: venue.phone.clone(),
            genres: venue.genres.0.clone(),
            image_link: venue.image_link.clone(),
            facebook_link: venue.facebook_link.clone(),
            website: venue.website.clone(),
            seeking_talent: venue.seeking_talent,
            seeking_description: venue.seeking_description.clone(),
        }
    }
}

impl From<&Artist> for ArtistFields {
    fn from(artist: &Artist) -> Self {
        ArtistFields {
            name: artist.name.clone(),
            city: artist.city.clone(),
            state: artist.state.clone(),
            phone: artist.phone.clone(),
            genres: artist.genres.0.clone(),
            image_link: artist.image_link.clone(),
            facebook_link: artist.facebook_link.clone(),
            website: artist.website.clone(),
            seeking_venue: artist.seeking_venue,
            seeking_description: artist.seeking_description.clone(),
        }
    }
}

impl Venue {
    /// All venues in insertion order.
    pub async fn all(conn: &mut SqliteConnection) -> Result<Vec<Venue>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM venues ORDER BY id")
            .fetch_all(&mut *conn)
            .await
    }

    pub async fn find(conn: &mut SqliteConnection, id: i64) -> Result<Option<Venue>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM venues WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
    }

    pub async fn count(conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM venues")
            .fetch_one(&mut *conn)
            .await
    }

    /// Insert a venue and return its new id.
    pub async fn insert(
        conn: &mut SqliteConnection,
        fields: &VenueFields,
    ) -> Result<i64, sqlx::Error> {
        let done = sqlx::query(
            "INSERT INTO venues (name, city, state, address, phone, genres, image_link, \
             facebook_link, website, seeking_talent, seeking_description) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&fields.name)
        .bind(&fields.city)
        .bind(&fields.state)
        .bind(&fields.address)
        .bind(&fields.phone)
        .bind(Json(&fields.genres))
        .bind(&fields.image_link)
        .bind(&fields.facebook_link)
        .bind(&fields.website)
        .bind(fields.seeking_talent)
        .bind(&fields.seeking_description)
        .execute(&mut *conn)
        .await?;
        Ok(done.last_insert_rowid())
    }

    /// Overwrite every editable column; `false` when no venue has this id.
    pub async fn update(
        conn: &mut SqliteConnection,
        id: i64,
        fields: &VenueFields,
    ) -> Result<bool, sqlx::Error> {
        let done = sqlx::query(
            "UPDATE venues SET name = ?, city = ?, state = ?, address = ?, phone = ?, \
             genres = ?, image_link = ?, facebook_link = ?, website = ?, \
             seeking_talent = ?, seeking_description = ? WHERE id = ?",
        )
        .bind(&fields.name)
        .bind(&fields.city)
        .bind(&fields.state)
        .bind(&fields.address)
        .bind(&fields.phone)
        .bind(Json(&fields.genres))
        .bind(&fields.image_link)
        .bind(&fields.facebook_link)
        .bind(&fields.website)
        .bind(fields.seeking_talent)
        .bind(&fields.seeking_description)
        .bind(id)
        .execute(&mut *conn)
        .await?;
        Ok(done.rows_affected() > 0)
    }

    /// Shows referencing the venue go with it (`ON DELETE CASCADE`).
    pub async fn delete(conn: &mut SqliteConnection, id: i64) -> Result<bool, sqlx::Error> {
        let done = sqlx::query("DELETE FROM venues WHERE id = ?")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(done.rows_affected() > 0)
    }
}

impl Artist {
    pub async fn all(conn: &mut SqliteConnection) -> Result<Vec<Artist>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM artists ORDER BY id")
            .fetch_all(&mut *conn)
            .await
    }

    pub async fn find(
        conn: &mut SqliteConnection,
        id: i64,
    ) -> Result<Option<Artist>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM artists WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await
    }

    pub async fn count(conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM artists")
            .fetch_one(&mut *conn)
            .await
    }

    pub async fn insert(
        conn: &mut SqliteConnection,
        fields: &ArtistFields,
    ) -> Result<i64, sqlx::Error> {
        let done = sqlx::query(
            "INSERT INTO artists (name, city, state, phone, genres, image_link, \
             facebook_link, website, seeking_venue, seeking_description) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&fields.name)
        .bind(&fields.city)
        .bind(&fields.state)
        .bind(&fields.phone)
        .bind(Json(&fields.genres))
        .bind(&fields.image_link)
        .bind(&fields.facebook_link)
        .bind(&fields.website)
        .bind(fields.seeking_venue)
        .bind(&fields.seeking_description)
        .execute(&mut *conn)
        .await?;
        Ok(done.last_insert_rowid())
    }

    pub async fn update(
        conn: &mut SqliteConnection,
        id: i64,
        fields: &ArtistFields,
    ) -> Result<bool, sqlx::Error> {
        let done = sqlx::query(
            "UPDATE artists SET name = ?, city = ?, state = ?, phone = ?, genres = ?, \
             image_link = ?, facebook_link = ?, website = ?, seeking_venue = ?, \
             seeking_description = ? WHERE id = ?",
        )
        .bind(&fields.name)
        .bind(&fields.city)
        .bind(&fields.state)
        .bind(&fields.phone)
        .bind(Json(&fields.genres))
        .bind(&fields.image_link)
        .bind(&fields.facebook_link)
        .bind(&fields.website)
        .bind(fields.seeking_venue)
        .bind(&fields.seeking_description)
        .bind(id)
        .execute(&mut *conn)
        .await?;
        Ok(done.rows_affected() > 0)
    }

    pub async fn delete(conn: &mut SqliteConnection, id: i64) -> Result<bool, sqlx::Error> {
        let done = sqlx::query("DELETE FROM artists WHERE id = ?")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(done.rows_affected() > 0)
    }
}

impl Show {
    pub async fn all(conn: &mut SqliteConnection) -> Result<Vec<Show>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM shows ORDER BY id")
            .fetch_all(&mut *conn)
            .await
    }

    pub async fn count(conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar("SELECT COUNT(*) FROM shows")
            .fetch_one(&mut *conn)
            .await
    }

    /// Insert a show. Dangling venue/artist ids are rejected by the foreign keys.
    pub async fn insert(conn: &mut SqliteConnection, show: &NewShow) -> Result<i64, sqlx::Error> {
        let done =
            sqlx::query("INSERT INTO shows (venue_id, artist_id, start_time) VALUES (?, ?, ?)")
                .bind(show.venue_id)
                .bind(show.artist_id)
                .bind(show.start_time)
                .execute(&mut *conn)
                .await?;
        Ok(done.last_insert_rowid())
    }

    pub async fn for_venue(
        conn: &mut SqliteConnection,
        venue_id: i64,
    ) -> Result<Vec<ShowWithArtist>, sqlx::Error> {
        sqlx::query_as(
            "SELECT artists.id AS artist_id, artists.name AS artist_name, \
             artists.image_link AS artist_image_link, shows.start_time AS start_time \
             FROM shows JOIN artists ON artists.id = shows.artist_id \
             WHERE shows.venue_id = ? ORDER BY shows.id",
        )
        .bind(venue_id)
        .fetch_all(&mut *conn)
        .await
    }

    pub async fn for_artist(
        conn: &mut SqliteConnection,
        artist_id: i64,
    ) -> Result<Vec<ShowWithVenue>, sqlx::Error> {
        sqlx::query_as(
            "SELECT venues.id AS venue_id, venues.name AS venue_name, \
             venues.image_link AS venue_image_link, shows.start_time AS start_time \
             FROM shows JOIN venues ON venues.id = shows.venue_id \
             WHERE shows.artist_id = ? ORDER BY shows.id",
        )
        .bind(artist_id)
        .fetch_all(&mut *conn)
        .await
    }

    /// Every show joined with its venue and artist, in insertion order.
    pub async fn listing(conn: &mut SqliteConnection) -> Result<Vec<ShowListingRow>, sqlx::Error> {
        sqlx::query_as(
            "SELECT venues.id AS venue_id, venues.name AS venue_name, \
             artists.id AS artist_id, artists.name AS artist_name, \
             artists.image_link AS artist_image_link, shows.start_time AS start_time \
             FROM shows \
             JOIN venues ON venues.id = shows.venue_id \
             JOIN artists ON artists.id = shows.artist_id \
             ORDER BY shows.id",
        )
        .fetch_all(&mut *conn)
        .await
    }
}
