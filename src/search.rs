//! Case-insensitive substring search over record names.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{Artist, Show, Venue};
use crate::read_model::upcoming_show_counts;

pub trait Named {
    fn id(&self) -> i64;
    fn name(&self) -> &str;
}

impl Named for Venue {
    fn id(&self) -> i64 {
        self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
}

impl Named for Artist {
    fn id(&self) -> i64 {
        self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
}

/// Entities whose name contains `term`, ignoring case, in input order.
/// An empty term matches everything.
pub fn search<'a, T: Named>(entities: &'a [T], term: &str) -> Vec<&'a T> {
    let needle = term.to_lowercase();
    entities
        .iter()
        .filter(|entity| entity.name().to_lowercase().contains(&needle))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub id: i64,
    pub name: String,
    pub num_upcoming_shows: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResults {
    pub count: usize,
    pub data: Vec<SearchHit>,
}

impl SearchResults {
    fn from_hits(data: Vec<SearchHit>) -> Self {
        SearchResults {
            count: data.len(),
            data,
        }
    }
}

/// Venue hits always report `num_upcoming_shows = 0`; the venue search page has
/// never shown that number.
pub fn search_venues(venues: &[Venue], term: &str) -> SearchResults {
    let hits = search(venues, term)
        .into_iter()
        .map(|venue| SearchHit {
            id: venue.id,
            name: venue.name.clone(),
            num_upcoming_shows: 0,
        })
        .collect();
    SearchResults::from_hits(hits)
}

pub fn search_artists(
    artists: &[Artist],
    shows: &[Show],
    term: &str,
    now: DateTime<Utc>,
) -> SearchResults {
    let upcoming = upcoming_show_counts(shows, now, |show| show.artist_id);
    let hits = search(artists, term)
        .into_iter()
        .map(|artist| SearchHit {
            id: artist.id,
            name: artist.name.clone(),
            num_upcoming_shows: upcoming.get(&artist.id).copied().unwrap_or(0),
        })
        .collect();
    SearchResults::from_hits(hits)
}
