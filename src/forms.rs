//! Form bodies (`application/x-www-form-urlencoded`) and the field sets built from them.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::models::{Artist, ArtistFields, NewShow, Venue, VenueFields};

pub const GENRES: &[&str] = &[
    "Alternative",
    "Blues",
    "Classical",
    "Country",
    "Electronic",
    "Folk",
    "Funk",
    "Hip-Hop",
    "Heavy Metal",
    "Instrumental",
    "Jazz",
    "Musical Theatre",
    "Pop",
    "Punk",
    "R&B",
    "Reggae",
    "Rock n Roll",
    "Soul",
    "Other",
];

pub const STATES: &[&str] = &[
    "AL", "AK", "AZ", "AR", "CA", "CO", "CT", "DE", "DC", "FL", "GA", "HI", "ID", "IL", "IN",
    "IA", "KS", "KY", "LA", "ME", "MT", "NE", "NV", "NH", "NJ", "NM", "NY", "NC", "ND", "OH",
    "OK", "OR", "MD", "MA", "MI", "MN", "MS", "MO", "PA", "RI", "SC", "SD", "TN", "TX", "UT",
    "VT", "VA", "WA", "WV", "WI", "WY",
];

/// Accepted `start_time` layouts besides RFC 3339; all are read as UTC.
const START_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Decoded form body. Keeps every pair so repeated keys (`genres`) survive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormData {
    pairs: Vec<(String, String)>,
}

impl FormData {
    pub fn parse(body: &[u8]) -> Self {
        FormData {
            pairs: url::form_urlencoded::parse(body).into_owned().collect(),
        }
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        FormData {
            pairs: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// First value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.pairs
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Checkbox semantics: present means checked.
    pub fn contains(&self, key: &str) -> bool {
        self.pairs.iter().any(|(k, _)| k == key)
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Whitespace-only counts as missing; a present value is kept as submitted.
    fn required(&self, key: &str) -> Result<String> {
        match self.get(key) {
            Some(value) if !value.trim().is_empty() => Ok(value.to_string()),
            _ => Err(Error::validation(format!("`{key}` is required"))),
        }
    }

    fn optional(&self, key: &str) -> String {
        self.get(key).unwrap_or_default().to_string()
    }

    fn genres(&self) -> Vec<String> {
        self.get_all("genres")
            .into_iter()
            .filter(|g| !g.trim().is_empty())
            .map(str::to_string)
            .collect()
    }
}

impl VenueFields {
    pub fn from_form(form: &FormData) -> Result<Self> {
        Ok(VenueFields {
            name: form.required("name")?,
            city: form.required("city")?,
            state: form.required("state")?,
            address: form.required("address")?,
            phone: form.required("phone")?,
            genres: form.genres(),
            image_link: form.optional("image_link"),
            facebook_link: form.optional("facebook_link"),
            website: form.optional("website_link"),
            seeking_talent: form.contains("seeking_talent"),
            seeking_description: form.optional("seeking_description"),
        })
    }
}

impl ArtistFields {
    pub fn from_form(form: &FormData) -> Result<Self> {
        Ok(ArtistFields {
            name: form.required("name")?,
            city: form.required("city")?,
            state: form.required("state")?,
            phone: form.required("phone")?,
            genres: form.genres(),
            image_link: form.optional("image_link"),
            facebook_link: form.optional("facebook_link"),
            website: form.optional("website_link"),
            seeking_venue: form.contains("seeking_venue"),
            seeking_description: form.optional("seeking_description"),
        })
    }
}

impl NewShow {
    pub fn from_form(form: &FormData) -> Result<Self> {
        Ok(NewShow {
            venue_id: parse_id(&form.required("venue_id")?, "venue_id")?,
            artist_id: parse_id(&form.required("artist_id")?, "artist_id")?,
            start_time: parse_start_time(&form.required("start_time")?)?,
        })
    }
}

fn parse_id(raw: &str, field: &str) -> Result<i64> {
    raw.trim()
        .parse()
        .map_err(|_| Error::validation(format!("`{field}` must be a number, got `{raw}`")))
}

pub fn parse_start_time(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    START_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| Error::validation(format!("`start_time` is not a date and time: `{raw}`")))
}

/// One `<option>` of a select box.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Choice {
    pub value: String,
    pub selected: bool,
}

pub fn choices(options: &[&str], selected: &[String]) -> Vec<Choice> {
    options
        .iter()
        .map(|option| Choice {
            value: option.to_string(),
            selected: selected.iter().any(|s| s == option),
        })
        .collect()
}

/// Template model for the new/edit venue pages.
#[derive(Debug, Clone, Serialize)]
pub struct VenueForm {
    pub fields: VenueFields,
    pub states: Vec<Choice>,
    pub genres: Vec<Choice>,
}

impl VenueForm {
    pub fn blank() -> Self {
        Self::prefilled(VenueFields::default())
    }

    pub fn prefilled(fields: VenueFields) -> Self {
        VenueForm {
            states: choices(STATES, std::slice::from_ref(&fields.state)),
            genres: choices(GENRES, &fields.genres),
            fields,
        }
    }

    pub fn from_venue(venue: &Venue) -> Self {
        Self::prefilled(VenueFields::from(venue))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ArtistForm {
    pub fields: ArtistFields,
    pub states: Vec<Choice>,
    pub genres: Vec<Choice>,
}

impl ArtistForm {
    pub fn blank() -> Self {
        Self::prefilled(ArtistFields::default())
    }

    pub fn prefilled(fields: ArtistFields) -> Self {
        ArtistForm {
            states: choices(STATES, std::slice::from_ref(&fields.state)),
            genres: choices(GENRES, &fields.genres),
            fields,
        }
    }

    pub fn from_artist(artist: &Artist) -> Self {
        Self::prefilled(ArtistFields::from(artist))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ShowForm {
    pub default_start_time: String,
}

impl ShowForm {
    pub fn starting_at(now: DateTime<Utc>) -> Self {
        ShowForm {
            default_start_time: now.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}
