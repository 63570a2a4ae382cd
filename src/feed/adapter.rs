//! Document Adapter
//!
//! Maps the loosely-shaped JSON documents kept by the stores into
//! [`CandidateItem`] and [`Viewer`]. Each concept is read from an ordered list
//! of alias keys; the first present, non-null key wins. Malformed fields are
//! dropped rather than reported: a bad date or coordinate simply becomes `None`.

use chrono::{
    DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc,
};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap, HashSet};

use super::matching::{category_root, HIERARCHY_DELIMITERS};
use super::model::{
    CandidateItem, ContentType, FrequentLocation, GeoPoint, PastInteraction, PerType,
    ScheduleEntry, Viewer,
};
use super::temporal::local_time;

const ID_KEYS: &[&str] = &["_id", "id"];
const TITLE_KEYS: &[&str] = &["title", "intitulé", "name"];
const CONTENT_KEYS: &[&str] = &["content", "description", "détail"];
const AUTHOR_KEYS: &[&str] = &["user_id", "author_id"];
const POSTED_KEYS: &[&str] = &["posted_at", "time_posted"];
const EVENT_DATE_KEYS: &[&str] = &["event_date", "date_debut", "prochaines_dates"];
const EVENT_END_KEYS: &[&str] = &["event_end_date", "date_fin"];
const CATEGORY_KEYS: &[&str] = &["category", "categories"];
const HIERARCHICAL_CATEGORY_KEYS: &[&str] = &["catégorie", "hierarchical_categories"];
const LIKES_KEYS: &[&str] = &["likes", "liked_by"];

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y"];

/// French month abbreviations as they appear in "sam 15 févr."
const FRENCH_MONTHS: &[(&str, u32)] = &[
    ("janv", 1),
    ("févr", 2),
    ("fevr", 2),
    ("mars", 3),
    ("avr", 4),
    ("mai", 5),
    ("juin", 6),
    ("juil", 7),
    ("août", 8),
    ("aout", 8),
    ("sept", 9),
    ("oct", 10),
    ("nov", 11),
    ("déc", 12),
    ("dec", 12),
];

/// Converts store documents into feed entities.
///
/// Wall-clock dates without a zone are read in `offset`; the French short
/// form, which carries no year, is resolved against `reference_year`.
#[derive(Debug, Clone, Copy)]
pub struct DocumentAdapter {
    offset: FixedOffset,
    reference_year: i32,
}

/// A parsed date, remembering whether a time of day was present
#[derive(Debug, Clone, Copy, PartialEq)]
enum ParsedDate {
    Instant(DateTime<Utc>),
    Local(NaiveDateTime),
    Day(NaiveDate),
}

impl DocumentAdapter {
    pub fn new(offset: FixedOffset, now: DateTime<Utc>) -> Self {
        Self {
            offset,
            reference_year: local_time(now, offset).year(),
        }
    }

    /// Build a candidate from a post document; `None` when it has no id
    pub fn candidate_from_document(&self, doc: &Value) -> Option<CandidateItem> {
        let id = first_of(doc, ID_KEYS).and_then(string_value)?;

        let location = doc.get("location");
        let location_name = location
            .and_then(|loc| match loc {
                Value::Object(_) => loc.get("name").and_then(string_value),
                other => string_value(other),
            })
            .or_else(|| doc.get("lieu").and_then(string_value));

        let coordinates = location
            .and_then(coordinates_value)
            .or_else(|| doc.get("coordinates").and_then(coordinates_value));

        let categories = first_of(doc, CATEGORY_KEYS).map(string_list).unwrap_or_default();

        // Plain categories that carry a hierarchy ("Theatre > Comedy") also yield a root
        let mut category_roots: Vec<String> = Vec::new();
        let hierarchical = first_of(doc, HIERARCHICAL_CATEGORY_KEYS)
            .map(string_list)
            .unwrap_or_default();
        let nested_plain = categories
            .iter()
            .filter(|c| c.contains(HIERARCHY_DELIMITERS))
            .cloned();
        for raw in hierarchical.into_iter().chain(nested_plain) {
            let root = category_root(&raw);
            if !root.is_empty() && !category_roots.iter().any(|r| r == root) {
                category_roots.push(root.to_string());
            }
        }

        Some(CandidateItem {
            id,
            content_type: content_type_of(doc),
            title: first_of(doc, TITLE_KEYS).and_then(string_value),
            content: first_of(doc, CONTENT_KEYS)
                .and_then(string_value)
                .unwrap_or_default(),
            tags: doc.get("tags").map(string_list).unwrap_or_default().into_iter().collect(),
            categories,
            category_roots,
            author_id: first_of(doc, AUTHOR_KEYS).and_then(string_value),
            liked_by: first_of(doc, LIKES_KEYS)
                .map(member_ids)
                .unwrap_or_default()
                .into_iter()
                .collect(),
            posted_at: first_of(doc, POSTED_KEYS).and_then(|v| self.instant(v)),
            coordinates,
            location_name,
            schedule: schedule_entries(doc),
            event_date: first_of(doc, EVENT_DATE_KEYS).and_then(|v| self.wall_clock(v, false)),
            event_end_date: first_of(doc, EVENT_END_KEYS).and_then(|v| self.wall_clock(v, true)),
        })
    }

    /// Build the viewer profile; missing sections become empty
    pub fn viewer_from_document(&self, id: &str, doc: &Value) -> Viewer {
        let list = |key: &str| doc.get(key).map(member_ids).unwrap_or_default();

        let mutual_connections = doc
            .get("mutual_connections")
            .and_then(Value::as_object)
            .map(|counts| {
                counts
                    .iter()
                    .filter_map(|(author, n)| {
                        let count = u32::try_from(count_value(n)?).unwrap_or(u32::MAX);
                        Some((author.clone(), count))
                    })
                    .collect::<HashMap<_, _>>()
            })
            .unwrap_or_default();

        let frequent_locations = doc
            .get("frequent_locations")
            .and_then(Value::as_array)
            .map(|locations| {
                locations
                    .iter()
                    .filter_map(|loc| match loc {
                        Value::Object(_) => loc.get("name").and_then(string_value),
                        other => string_value(other),
                    })
                    .map(|name| FrequentLocation { name })
                    .collect()
            })
            .unwrap_or_default();

        Viewer {
            id: id.to_string(),
            liked_tags: list("liked_tags").into_iter().collect::<BTreeSet<_>>(),
            following: list("following").into_iter().collect::<HashSet<_>>(),
            trusted_circle: list("trusted_circle").into_iter().collect::<HashSet<_>>(),
            mutual_connections,
            location: doc.get("location").and_then(coordinates_value),
            frequent_locations,
            engagement_stats: doc
                .get("engagement_stats")
                .map(engagement_stats)
                .unwrap_or_default(),
            liked_items: doc.get("liked_posts").map(interactions).unwrap_or_default(),
            past_choices: doc.get("choices").map(interactions).unwrap_or_default(),
        }
    }

    /// An absolute instant: strings, `{"$date": ..}` wrappers, or epoch millis
    fn instant(&self, value: &Value) -> Option<DateTime<Utc>> {
        match value {
            Value::Number(n) => n
                .as_i64()
                .and_then(DateTime::<Utc>::from_timestamp_millis),
            Value::Object(map) => map.get("$date").and_then(|v| self.instant(v)),
            Value::String(s) => match self.parse(s)? {
                ParsedDate::Instant(at) => Some(at),
                ParsedDate::Local(naive) => self.to_utc(naive),
                ParsedDate::Day(day) => self.to_utc(day.and_time(NaiveTime::MIN)),
            },
            _ => None,
        }
    }

    /// A wall-clock time in the feed's zone. A bare day is read as its start,
    /// or as its last second when `end_of_day` is set.
    fn wall_clock(&self, value: &Value, end_of_day: bool) -> Option<NaiveDateTime> {
        match value {
            Value::Array(items) => items.iter().find_map(|v| self.wall_clock(v, end_of_day)),
            Value::Object(map) => map
                .get("$date")
                .and_then(|v| self.instant(v))
                .map(|at| local_time(at, self.offset)),
            Value::Number(_) => self.instant(value).map(|at| local_time(at, self.offset)),
            Value::String(s) => match self.parse(s)? {
                ParsedDate::Instant(at) => Some(local_time(at, self.offset)),
                ParsedDate::Local(naive) => Some(naive),
                ParsedDate::Day(day) if end_of_day => day.and_hms_opt(23, 59, 59),
                ParsedDate::Day(day) => Some(day.and_time(NaiveTime::MIN)),
            },
            _ => None,
        }
    }

    fn parse(&self, raw: &str) -> Option<ParsedDate> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }

        if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
            return Some(ParsedDate::Instant(at.with_timezone(&Utc)));
        }
        for format in NAIVE_DATETIME_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
                return Some(ParsedDate::Local(naive));
            }
        }
        for format in DATE_FORMATS {
            if let Ok(day) = NaiveDate::parse_from_str(raw, format) {
                return Some(ParsedDate::Day(day));
            }
        }
        self.parse_french_short(raw).map(ParsedDate::Day)
    }

    /// "sam 15 févr." or "15 févr. 2027"
    fn parse_french_short(&self, raw: &str) -> Option<NaiveDate> {
        let parts: Vec<String> = raw
            .split_whitespace()
            .map(|p| p.trim_end_matches(['.', ',']).to_lowercase())
            .collect();

        let day_index = parts.iter().position(|p| p.parse::<u32>().is_ok())?;
        let day: u32 = parts[day_index].parse().ok()?;
        let month_name = parts.get(day_index + 1)?;
        let month = FRENCH_MONTHS
            .iter()
            .find(|(name, _)| month_name.starts_with(name))
            .map(|(_, m)| *m)?;
        let year = parts
            .get(day_index + 2)
            .and_then(|y| y.parse::<i32>().ok())
            .unwrap_or(self.reference_year);

        NaiveDate::from_ymd_opt(year, month, day)
    }

    fn to_utc(&self, naive: NaiveDateTime) -> Option<DateTime<Utc>> {
        self.offset
            .from_local_datetime(&naive)
            .single()
            .map(|at| at.with_timezone(&Utc))
    }
}

/// Explicit `target_type` first, then whichever id field the document carries
pub fn content_type_of(doc: &Value) -> ContentType {
    if let Some(explicit) = doc.get("target_type").and_then(Value::as_str).and_then(parse_content_type) {
        return explicit;
    }
    if has_value(doc, "producer_id") {
        ContentType::Producer
    } else if has_value(doc, "event_id") || has_value(doc, "intitulé") {
        ContentType::Event
    } else if has_value(doc, "user_id") {
        ContentType::User
    } else {
        ContentType::Other
    }
}

fn parse_content_type(raw: &str) -> Option<ContentType> {
    match raw.trim().to_lowercase().as_str() {
        "producer" | "restaurant" | "leisure_producer" | "wellness_producer" => {
            Some(ContentType::Producer)
        }
        "event" => Some(ContentType::Event),
        "user" => Some(ContentType::User),
        _ => None,
    }
}

/// Type of a past like/choice: `target_type`, else its id fields, else user
fn interaction_type(doc: &Value) -> ContentType {
    doc.get("target_type")
        .and_then(Value::as_str)
        .and_then(parse_content_type)
        .unwrap_or_else(|| {
            if has_value(doc, "producer_id") {
                ContentType::Producer
            } else if has_value(doc, "event_id") {
                ContentType::Event
            } else {
                ContentType::User
            }
        })
}

fn interactions(value: &Value) -> Vec<PastInteraction> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .map(|item| PastInteraction {
                    content_type: interaction_type(item),
                    item_id: first_of(item, &["post_id", "target_id", "_id", "id"])
                        .and_then(string_value)
                        .or_else(|| string_value(item)),
                })
                .collect()
        })
        .unwrap_or_default()
}

fn engagement_stats(value: &Value) -> PerType<u64> {
    PerType::from_fn(|t| {
        let keyed = format!("{}_engagements", t.as_str());
        value
            .get(&keyed)
            .or_else(|| value.get(t.as_str()))
            .and_then(count_value)
            .unwrap_or(0)
    })
}

fn schedule_entries(doc: &Value) -> Vec<ScheduleEntry> {
    let (entries, day_key, range_key) = match doc.get("horaires").and_then(Value::as_array) {
        Some(entries) => (entries, "jour", "heure"),
        None => match doc.get("schedule").and_then(Value::as_array) {
            Some(entries) => (entries, "day", "time_range"),
            None => return Vec::new(),
        },
    };

    entries
        .iter()
        .filter(|entry| entry.is_object())
        .map(|entry| ScheduleEntry {
            day: entry.get(day_key).and_then(string_value),
            time_range: entry.get(range_key).and_then(string_value),
        })
        .collect()
}

/// GeoJSON `[lon, lat]` arrays, `{coordinates: [..]}`, or lat/lon objects
fn coordinates_value(value: &Value) -> Option<GeoPoint> {
    let point = match value {
        Value::Array(pair) if pair.len() >= 2 => {
            GeoPoint::new(number_value(&pair[1])?, number_value(&pair[0])?)
        }
        Value::Object(map) => {
            if let Some(inner) = map.get("coordinates") {
                return coordinates_value(inner);
            }
            let lat = ["lat", "latitude"].iter().find_map(|k| map.get(*k))?;
            let lon = ["lon", "lng", "longitude"].iter().find_map(|k| map.get(*k))?;
            GeoPoint::new(number_value(lat)?, number_value(lon)?)
        }
        _ => return None,
    };

    let valid = point.lat.is_finite()
        && point.lon.is_finite()
        && (-90.0..=90.0).contains(&point.lat)
        && (-180.0..=180.0).contains(&point.lon);
    valid.then_some(point)
}

fn first_of<'a>(doc: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|key| doc.get(*key))
        .find(|value| !value.is_null())
}

fn has_value(doc: &Value, key: &str) -> bool {
    doc.get(key).and_then(string_value).is_some()
}

/// Non-empty string form of a scalar id or text; `{"$oid": ..}` is unwrapped
fn string_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Object(map) => map.get("$oid").and_then(string_value),
        _ => None,
    }
}

/// A list of strings; a scalar counts as a one-element list
fn string_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(string_value).collect(),
        other => string_value(other).into_iter().collect(),
    }
}

/// Ids from a list of ids or of `{user_id}` / `{id}` objects
fn member_ids(value: &Value) -> Vec<String> {
    let id_of = |item: &Value| match item {
        Value::Object(map) if !map.contains_key("$oid") => {
            first_of(item, &["user_id", "_id", "id"]).and_then(string_value)
        }
        other => string_value(other),
    };
    match value {
        Value::Array(items) => items.iter().filter_map(id_of).collect(),
        other => id_of(other).into_iter().collect(),
    }
}

fn number_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn count_value(value: &Value) -> Option<u64> {
    number_value(value)
        .filter(|n| n.is_finite() && *n >= 0.0)
        .map(|n| n as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};
    use serde_json::json;

    fn adapter() -> DocumentAdapter {
        let now = Utc.with_ymd_and_hms(2026, 10, 17, 12, 0, 0).unwrap();
        DocumentAdapter::new(FixedOffset::east_opt(3600).unwrap(), now)
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_missing_id_is_rejected() {
        assert!(adapter().candidate_from_document(&json!({"content": "x"})).is_none());
        assert!(adapter().candidate_from_document(&json!({"_id": "  "})).is_none());
    }

    #[test]
    fn test_ids_in_any_shape() {
        let a = adapter();
        let oid = a.candidate_from_document(&json!({"_id": {"$oid": "65f0"}})).unwrap();
        assert_eq!(oid.id, "65f0");
        let numeric = a.candidate_from_document(&json!({"id": 42})).unwrap();
        assert_eq!(numeric.id, "42");
    }

    #[test]
    fn test_content_type_derivation() {
        assert_eq!(content_type_of(&json!({"producer_id": "p"})), ContentType::Producer);
        assert_eq!(content_type_of(&json!({"event_id": "e", "user_id": "u"})), ContentType::Event);
        assert_eq!(content_type_of(&json!({"intitulé": "Concert"})), ContentType::Event);
        assert_eq!(content_type_of(&json!({"user_id": "u"})), ContentType::User);
        assert_eq!(content_type_of(&json!({})), ContentType::Other);
        assert_eq!(
            content_type_of(&json!({"target_type": "event", "producer_id": "p"})),
            ContentType::Event
        );
        assert_eq!(
            content_type_of(&json!({"target_type": "unknown", "user_id": "u"})),
            ContentType::User
        );
    }

    #[test]
    fn test_french_event_document() {
        let doc = json!({
            "_id": "evt-1",
            "intitulé": "Soirée jazz",
            "détail": "Concert au sous-sol",
            "catégorie": "Musique » Jazz » Bebop",
            "lieu": "Le Caveau",
            "location": {"type": "Point", "coordinates": [2.3522, 48.8566]},
            "prochaines_dates": "sam 15 févr.",
            "date_fin": "2027-02-15",
            "horaires": [{"jour": "samedi", "heure": "20:00 - 23:00"}],
        });

        let item = adapter().candidate_from_document(&doc).unwrap();
        assert_eq!(item.content_type, ContentType::Event);
        assert_eq!(item.title.as_deref(), Some("Soirée jazz"));
        assert_eq!(item.content, "Concert au sous-sol");
        assert_eq!(item.category_roots, vec!["Musique".to_string()]);
        assert_eq!(item.location_name.as_deref(), Some("Le Caveau"));

        let coords = item.coordinates.unwrap();
        assert_eq!((coords.lat, coords.lon), (48.8566, 2.3522));

        assert_eq!(item.event_date, day(2026, 2, 15).and_hms_opt(0, 0, 0));
        assert_eq!(item.event_end_date, day(2027, 2, 15).and_hms_opt(23, 59, 59));
        assert_eq!(item.schedule[0].day.as_deref(), Some("samedi"));
        assert_eq!(item.schedule[0].time_range.as_deref(), Some("20:00 - 23:00"));
    }

    #[test]
    fn test_english_post_document() {
        let doc = json!({
            "id": "post-9",
            "user_id": "alice",
            "content": "Brunch spot",
            "tags": ["food", "brunch"],
            "categories": "Restaurants",
            "likes": [{"user_id": "bob"}, "carol"],
            "posted_at": "2026-10-17T09:30:00Z",
            "location": {"name": "Canal Saint-Martin", "lat": 48.87, "lng": 2.36},
            "schedule": [{"day": "sunday", "time_range": "10:00 - 14:00"}],
        });

        let item = adapter().candidate_from_document(&doc).unwrap();
        assert_eq!(item.content_type, ContentType::User);
        assert_eq!(item.author_id.as_deref(), Some("alice"));
        assert!(item.tags.contains("brunch"));
        assert_eq!(item.categories, vec!["Restaurants".to_string()]);
        assert!(item.liked_by.contains("bob") && item.liked_by.contains("carol"));
        assert_eq!(item.posted_at, Some(Utc.with_ymd_and_hms(2026, 10, 17, 9, 30, 0).unwrap()));
        assert_eq!(item.location_name.as_deref(), Some("Canal Saint-Martin"));
        assert_eq!(item.coordinates, Some(GeoPoint::new(48.87, 2.36)));
        assert_eq!(item.schedule[0].day.as_deref(), Some("sunday"));
    }

    #[test]
    fn test_posted_at_variants() {
        let a = adapter();
        let expected = Utc.with_ymd_and_hms(2026, 10, 17, 9, 0, 0).unwrap();

        // naive strings are wall-clock in UTC+1
        let naive = a
            .candidate_from_document(&json!({"id": 1, "time_posted": "2026-10-17 10:00:00"}))
            .unwrap();
        assert_eq!(naive.posted_at, Some(expected));

        let wrapped = a
            .candidate_from_document(&json!({"id": 1, "posted_at": {"$date": "2026-10-17T09:00:00Z"}}))
            .unwrap();
        assert_eq!(wrapped.posted_at, Some(expected));

        let millis = a
            .candidate_from_document(&json!({"id": 1, "posted_at": expected.timestamp_millis()}))
            .unwrap();
        assert_eq!(millis.posted_at, Some(expected));

        let junk = a
            .candidate_from_document(&json!({"id": 1, "posted_at": "yesterday-ish"}))
            .unwrap();
        assert_eq!(junk.posted_at, None);
    }

    #[test]
    fn test_event_dates_in_local_time() {
        let a = adapter();
        let item = a
            .candidate_from_document(&json!({
                "id": "e",
                "event_date": "2026-10-20T18:00:00Z",
                "event_end_date": "20/10/2026",
            }))
            .unwrap();

        // 18:00 UTC is 19:00 at UTC+1
        assert_eq!(item.event_date.map(|d| d.hour()), Some(19));
        assert_eq!(item.event_end_date, day(2026, 10, 20).and_hms_opt(23, 59, 59));
    }

    #[test]
    fn test_bad_coordinates_are_dropped() {
        let a = adapter();
        for coords in [json!([]), json!([200.0, 10.0]), json!(["x", "y"]), json!({"lat": 91, "lon": 0})] {
            let item = a
                .candidate_from_document(&json!({"id": "c", "coordinates": coords.clone()}))
                .unwrap();
            assert!(item.coordinates.is_none(), "{coords} should be rejected");
        }
    }

    #[test]
    fn test_viewer_document() {
        let doc = json!({
            "liked_tags": ["jazz", "brunch"],
            "following": ["alice", {"user_id": "bob"}],
            "trusted_circle": ["alice"],
            "mutual_connections": {"carol": 3, "dave": "2"},
            "location": {"type": "Point", "coordinates": [2.35, 48.85]},
            "frequent_locations": [{"name": "Le Marais"}, "Belleville"],
            "engagement_stats": {"producer_engagements": 4, "event_engagements": 1},
            "liked_posts": [{"target_type": "event", "post_id": "p1"}, {"producer_id": "r1"}],
            "choices": [{"event_id": "e1"}, {}],
        });

        let viewer = adapter().viewer_from_document("v1", &doc);
        assert_eq!(viewer.id, "v1");
        assert!(viewer.liked_tags.contains("jazz"));
        assert!(viewer.following.contains("bob"));
        assert!(viewer.trusted_circle.contains("alice"));
        assert_eq!(viewer.mutual_connections.get("carol"), Some(&3));
        assert_eq!(viewer.mutual_connections.get("dave"), Some(&2));
        assert_eq!(viewer.location, Some(GeoPoint::new(48.85, 2.35)));
        assert_eq!(viewer.frequent_locations.len(), 2);
        assert_eq!(viewer.engagement_stats.producer, 4);
        assert_eq!(viewer.engagement_stats.user, 0);

        let liked: Vec<ContentType> = viewer.liked_items.iter().map(|i| i.content_type).collect();
        assert_eq!(liked, vec![ContentType::Event, ContentType::Producer]);
        assert_eq!(viewer.liked_items[0].item_id.as_deref(), Some("p1"));

        let chosen: Vec<ContentType> = viewer.past_choices.iter().map(|i| i.content_type).collect();
        assert_eq!(chosen, vec![ContentType::Event, ContentType::User]);
    }

    #[test]
    fn test_empty_viewer_document() {
        let viewer = adapter().viewer_from_document("v2", &json!({}));
        assert!(viewer.liked_tags.is_empty());
        assert!(viewer.location.is_none());
        assert_eq!(viewer.engagement_stats.sum(), 0);
    }

    #[test]
    fn test_french_short_dates() {
        let a = adapter();
        assert_eq!(a.parse_french_short("sam 15 févr."), Some(day(2026, 2, 15)));
        assert_eq!(a.parse_french_short("3 août 2027"), Some(day(2027, 8, 3)));
        assert_eq!(a.parse_french_short("mer 31 déc."), Some(day(2026, 12, 31)));
        assert_eq!(a.parse_french_short("31 févr."), None);
        assert_eq!(a.parse_french_short("bientôt"), None);
    }

    #[test]
    fn test_nested_plain_category_scores_on_its_root() {
        use crate::feed::scorer::ItemScorer;

        let a = adapter();
        let item = a
            .candidate_from_document(&json!({"id": "x", "categories": ["Theatre > Comedy", "Cinéma"]}))
            .unwrap();
        assert_eq!(item.categories, vec!["Theatre > Comedy".to_string(), "Cinéma".to_string()]);
        assert_eq!(item.category_roots, vec!["Theatre".to_string()]);

        let viewer = a.viewer_from_document("v1", &json!({"liked_tags": ["Theatre"]}));
        let now = Utc.with_ymd_and_hms(2026, 10, 14, 15, 0, 0).unwrap();
        let score = ItemScorer::default().score(&viewer, &item, now);
        assert_eq!(score.interest, 10.0);
    }

    #[test]
    fn test_roots_are_not_duplicated() {
        let item = adapter()
            .candidate_from_document(&json!({
                "id": "x",
                "catégorie": "Théâtre » Comédie",
                "categories": ["Théâtre > Drame"],
            }))
            .unwrap();
        assert_eq!(item.category_roots, vec!["Théâtre".to_string()]);
    }

    #[test]
    fn test_huge_mutual_count_saturates() {
        let viewer = adapter()
            .viewer_from_document("v1", &json!({"mutual_connections": {"x": 5_000_000_000u64}}));
        assert_eq!(viewer.mutual_connections.get("x"), Some(&u32::MAX));
    }
}
