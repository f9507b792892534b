//! View-ready shapes built from raw rows.
//!
//! Everything here is a pure function of its inputs and a reference instant `now`;
//! past/upcoming is never stored, so the same show moves from upcoming to past as
//! time passes.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::collections::HashMap;

use crate::models::{Artist, Show, ShowListingRow, ShowWithArtist, ShowWithVenue, Venue};

/// Anything with a scheduled start.
pub trait Scheduled {
    fn start_time(&self) -> DateTime<Utc>;
}

impl Scheduled for Show {
    fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }
}

impl Scheduled for ShowWithArtist {
    fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }
}

impl Scheduled for ShowWithVenue {
    fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }
}

/// `YYYY-MM-DDTHH:MM:SS.mmmZ`
pub fn format_start_time(start_time: &DateTime<Utc>) -> String {
    start_time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Number of shows starting strictly after `now`, keyed by `key(show)`.
pub fn upcoming_show_counts<F>(shows: &[Show], now: DateTime<Utc>, key: F) -> HashMap<i64, usize>
where
    F: Fn(&Show) -> i64,
{
    let mut counts = HashMap::new();
    for show in shows.iter().filter(|show| show.start_time > now) {
        *counts.entry(key(show)).or_insert(0) += 1;
    }
    counts
}

/// Split shows into `(past, upcoming)`: past is `start < now`, a show starting
/// exactly at `now` is upcoming.
pub fn partition_shows<T: Scheduled>(shows: &[T], now: DateTime<Utc>) -> (Vec<&T>, Vec<&T>) {
    shows.iter().partition(|show| show.start_time() < now)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VenueSummary {
    pub id: i64,
    pub name: String,
    pub num_upcoming_shows: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityArea {
    pub city: String,
    pub state: String,
    pub venues: Vec<VenueSummary>,
}

/// Group venues by `(city, state)`. Buckets appear in the order their first venue
/// appears; venues keep their input order inside a bucket.
pub fn build_venue_directory(
    venues: &[Venue],
    shows: &[Show],
    now: DateTime<Utc>,
) -> Vec<CityArea> {
    let upcoming = upcoming_show_counts(shows, now, |show| show.venue_id);
    let mut areas: Vec<CityArea> = Vec::new();
    let mut index: HashMap<(&str, &str), usize> = HashMap::new();

    for venue in venues {
        let summary = VenueSummary {
            id: venue.id,
            name: venue.name.clone(),
            num_upcoming_shows: upcoming.get(&venue.id).copied().unwrap_or(0),
        };
        let key = (venue.city.as_str(), venue.state.as_str());
        match index.get(&key) {
            Some(&slot) => areas[slot].venues.push(summary),
            None => {
                index.insert(key, areas.len());
                areas.push(CityArea {
                    city: venue.city.clone(),
                    state: venue.state.clone(),
                    venues: vec![summary],
                });
            }
        }
    }
    areas
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VenueShow {
    pub artist_id: i64,
    pub artist_name: String,
    pub artist_image_link: String,
    pub start_time: String,
}

impl From<&ShowWithArtist> for VenueShow {
    fn from(show: &ShowWithArtist) -> Self {
        VenueShow {
            artist_id: show.artist_id,
            artist_name: show.artist_name.clone(),
            artist_image_link: show.artist_image_link.clone(),
            start_time: format_start_time(&show.start_time),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VenueDetail {
    pub id: i64,
    pub name: String,
    pub genres: Vec<String>,
    pub address: String,
    pub city: String,
    pub state: String,
    pub phone: String,
    pub website: String,
    pub facebook_link: String,
    pub seeking_talent: bool,
    pub seeking_description: String,
    pub image_link: String,
    pub past_shows: Vec<VenueShow>,
    pub upcoming_shows: Vec<VenueShow>,
    pub past_shows_count: usize,
    pub upcoming_shows_count: usize,
}

/// `shows` must already be limited to this venue.
pub fn build_venue_detail(
    venue: &Venue,
    shows: &[ShowWithArtist],
    now: DateTime<Utc>,
) -> VenueDetail {
    let (past, upcoming) = partition_shows(shows, now);
    let past_shows: Vec<VenueShow> = past.into_iter().map(VenueShow::from).collect();
    let upcoming_shows: Vec<VenueShow> = upcoming.into_iter().map(VenueShow::from).collect();

    VenueDetail {
        id: venue.id,
        name: venue.name.clone(),
        genres: venue.genres.0.clone(),
        address: venue.address.clone(),
        city: venue.city.clone(),
        state: venue.state.clone(),
        phone: venue.phone.clone(),
        website: venue.website.clone(),
        facebook_link: venue.facebook_link.clone(),
        seeking_talent: venue.seeking_talent,
        seeking_description: venue.seeking_description.clone(),
        image_link: venue.image_link.clone(),
        past_shows_count: past_shows.len(),
        upcoming_shows_count: upcoming_shows.len(),
        past_shows,
        upcoming_shows,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtistShow {
    pub venue_id: i64,
    pub venue_name: String,
    pub venue_image_link: String,
    pub start_time: String,
}

impl From<&ShowWithVenue> for ArtistShow {
    fn from(show: &ShowWithVenue) -> Self {
        ArtistShow {
            venue_id: show.venue_id,
            venue_name: show.venue_name.clone(),
            venue_image_link: show.venue_image_link.clone(),
            start_time: format_start_time(&show.start_time),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtistDetail {
    pub id: i64,
    pub name: String,
    pub genres: Vec<String>,
    pub city: String,
    pub state: String,
    pub phone: String,
    pub website: String,
    pub facebook_link: String,
    pub seeking_venue: bool,
    pub seeking_description: String,
    pub image_link: String,
    pub past_shows: Vec<ArtistShow>,
    pub upcoming_shows: Vec<ArtistShow>,
    pub past_shows_count: usize,
    pub upcoming_shows_count: usize,
}

/// `shows` must already be limited to this artist.
pub fn build_artist_detail(
    artist: &Artist,
    shows: &[ShowWithVenue],
    now: DateTime<Utc>,
) -> ArtistDetail {
    let (past, upcoming) = partition_shows(shows, now);
    let past_shows: Vec<ArtistShow> = past.into_iter().map(ArtistShow::from).collect();
    let upcoming_shows: Vec<ArtistShow> = upcoming.into_iter().map(ArtistShow::from).collect();

    ArtistDetail {
        id: artist.id,
        name: artist.name.clone(),
        genres: artist.genres.0.clone(),
        city: artist.city.clone(),
        state: artist.state.clone(),
        phone: artist.phone.clone(),
        website: artist.website.clone(),
        facebook_link: artist.facebook_link.clone(),
        seeking_venue: artist.seeking_venue,
        seeking_description: artist.seeking_description.clone(),
        image_link: artist.image_link.clone(),
        past_shows_count: past_shows.len(),
        upcoming_shows_count: upcoming_shows.len(),
        past_shows,
        upcoming_shows,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtistSummary {
    pub id: i64,
    pub name: String,
}

pub fn build_artist_listing(artists: &[Artist]) -> Vec<ArtistSummary> {
    artists
        .iter()
        .map(|artist| ArtistSummary {
            id: artist.id,
            name: artist.name.clone(),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShowEntry {
    pub venue_id: i64,
    pub venue_name: String,
    pub artist_id: i64,
    pub artist_name: String,
    pub artist_image_link: String,
    pub start_time: String,
}

pub fn build_show_listing(rows: &[ShowListingRow]) -> Vec<ShowEntry> {
    rows.iter()
        .map(|row| ShowEntry {
            venue_id: row.venue_id,
            venue_name: row.venue_name.clone(),
            artist_id: row.artist_id,
            artist_name: row.artist_name.clone(),
            artist_image_link: row.artist_image_link.clone(),
            start_time: format_start_time(&row.start_time),
        })
        .collect()
}
