use chrono::{TimeZone, Utc};
use gigboard::Error;
use gigboard::forms::*;
use gigboard::models::{ArtistFields, NewShow, VenueFields};

fn venue_body() -> FormData {
    FormData::parse(
        b"name=The+Musical+Hop&city=San+Francisco&state=CA&address=1015+Folsom+Street\
          &phone=123-123-1234&genres=Jazz&genres=Reggae&website_link=https%3A%2F%2Fwww.themusicalhop.com\
          &seeking_talent=y&seeking_description=Call+us.",
    )
}

#[test]
fn test_parse_keeps_repeated_keys() {
    let form = venue_body();
    assert_eq!(form.get("name"), Some("The Musical Hop"));
    assert_eq!(form.get_all("genres"), vec!["Jazz", "Reggae"]);
    assert!(form.contains("seeking_talent"));
    assert!(!form.contains("image_link"));
    assert!(FormData::parse(b"").is_empty());
}

#[test]
fn test_venue_fields_from_form() {
    let fields = VenueFields::from_form(&venue_body()).unwrap();
    assert_eq!(fields.name, "The Musical Hop");
    assert_eq!(fields.address, "1015 Folsom Street");
    assert_eq!(fields.genres, vec!["Jazz", "Reggae"]);
    assert_eq!(fields.website, "https://www.themusicalhop.com");
    assert!(fields.seeking_talent);
    assert_eq!(fields.seeking_description, "Call us.");
    assert_eq!(fields.image_link, "");
}

#[test]
fn test_missing_required_field_is_validation_error() {
    let form = FormData::from_pairs([("name", "Hall"), ("city", "Austin"), ("state", "TX"), ("phone", "555")]);
    let err = VenueFields::from_form(&form).unwrap_err();
    assert!(matches!(err, Error::Validation(ref m) if m.contains("address")));

    let blank = FormData::from_pairs([("name", "   "), ("city", "Austin"), ("state", "TX"), ("phone", "555")]);
    assert!(matches!(ArtistFields::from_form(&blank), Err(Error::Validation(_))));
}

#[test]
fn test_artist_fields_unchecked_box() {
    let form = FormData::from_pairs([
        ("name", "Matt Quevedo"),
        ("city", "New York"),
        ("state", "NY"),
        ("phone", "300-400-5000"),
    ]);
    let fields = ArtistFields::from_form(&form).unwrap();
    assert!(!fields.seeking_venue);
    assert!(fields.genres.is_empty());
}

#[test]
fn test_new_show_from_form() {
    let form = FormData::from_pairs([
        ("venue_id", "1"),
        ("artist_id", "4"),
        ("start_time", "2019-05-21 21:30:00"),
    ]);
    let show = NewShow::from_form(&form).unwrap();
    assert_eq!(
        show,
        NewShow {
            venue_id: 1,
            artist_id: 4,
            start_time: Utc.with_ymd_and_hms(2019, 5, 21, 21, 30, 0).unwrap(),
        }
    );

    let bad_id = FormData::from_pairs([("venue_id", "one"), ("artist_id", "4"), ("start_time", "2019-05-21 21:30:00")]);
    assert!(matches!(NewShow::from_form(&bad_id), Err(Error::Validation(_))));

    let no_time = FormData::from_pairs([("venue_id", "1"), ("artist_id", "4")]);
    assert!(matches!(NewShow::from_form(&no_time), Err(Error::Validation(_))));
}

#[test]
fn test_start_time_formats() {
    let expected = Utc.with_ymd_and_hms(2035, 4, 1, 20, 0, 0).unwrap();
    for raw in [
        "2035-04-01T20:00:00Z",
        "2035-04-01T22:00:00+02:00",
        "2035-04-01 20:00:00",
        "2035-04-01T20:00",
        "2035-04-01 20:00",
    ] {
        assert_eq!(parse_start_time(raw).unwrap(), expected, "{raw}");
    }
    assert!(parse_start_time("next tuesday").is_err());
}

#[test]
fn test_choices_preselect() {
    let states = choices(STATES, &["NY".to_string()]);
    assert_eq!(states.len(), STATES.len());
    assert_eq!(states.iter().filter(|c| c.selected).count(), 1);
    assert!(states.iter().any(|c| c.value == "NY" && c.selected));

    let mut fields = VenueFields::default();
    fields.genres = vec!["Jazz".to_string(), "Folk".to_string()];
    let form = VenueForm::prefilled(fields);
    let picked: Vec<&str> = form
        .genres
        .iter()
        .filter(|c| c.selected)
        .map(|c| c.value.as_str())
        .collect();
    assert_eq!(picked, vec!["Folk", "Jazz"]);
    assert!(!form.states.iter().any(|c| c.selected));
}

#[test]
fn test_show_form_default_start_time() {
    let form = ShowForm::starting_at(Utc.with_ymd_and_hms(2024, 2, 3, 4, 5, 6).unwrap());
    assert_eq!(form.default_start_time, "2024-02-03 04:05:06");
}
