use serde::Serialize;

/// Streaming services shown in the UI, keyed by slug
pub const STREAMING_SERVICES: &[(&str, &str)] = &[
    ("netflix", "Netflix"),
    ("prime", "Amazon Prime Video"),
    ("hulu", "Hulu"),
    ("paramount", "Paramount+"),
    ("hbo", "HBO Max"),
    ("disney", "Disney+"),
    ("apple", "Apple TV+"),
    ("peacock", "Peacock"),
    ("showtime", "Showtime"),
    ("starz", "Starz"),
    ("tubi", "Tubi"),
    ("pluto", "Pluto TV"),
    ("crackle", "Crackle"),
    ("vudu", "Vudu"),
    ("max", "Max"),
];

/// Genre slugs and display names. Every provider's genres are normalised to
/// these slugs.
/// Provider display names each service slug covers. Listing providers spell
/// some services differently ("Amazon Prime", "HBO Max", "Max").
const SERVICE_PROVIDER_NAMES: &[(&str, &[&str])] = &[
    ("netflix", &["Netflix"]),
    ("prime", &["Amazon Prime", "Amazon Prime Video"]),
    ("hulu", &["Hulu"]),
    ("paramount", &["Paramount+"]),
    ("hbo", &["Max", "HBO Max", "HBO"]),
    ("disney", &["Disney+"]),
    ("apple", &["Apple TV+"]),
    ("peacock", &["Peacock"]),
    ("showtime", &["Showtime"]),
    ("starz", &["Starz"]),
    ("tubi", &["Tubi"]),
    ("pluto", &["Pluto TV"]),
    ("crackle", &["Crackle"]),
    ("vudu", &["Vudu"]),
    ("max", &["Max", "HBO Max", "HBO"]),
];

/// Provider names matching a service slug, catalog display name or provider
/// spelling, compared case-insensitively
pub fn service_provider_names(service: &str) -> Option<&'static [&'static str]> {
    let service = service.trim();
    let slug = STREAMING_SERVICES
        .iter()
        .find(|(id, name)| id.eq_ignore_ascii_case(service) || name.eq_ignore_ascii_case(service))
        .map(|(id, _)| *id);

    SERVICE_PROVIDER_NAMES
        .iter()
        .find(|(id, names)| {
            Some(*id) == slug || names.iter().any(|n| n.eq_ignore_ascii_case(service))
        })
        .map(|(_, names)| *names)
}

pub const GENRES: &[(&str, &str)] = &[
    ("action", "Action"),
    ("adventure", "Adventure"),
    ("animation", "Animation"),
    ("comedy", "Comedy"),
    ("crime", "Crime"),
    ("documentary", "Documentary"),
    ("drama", "Drama"),
    ("family", "Family"),
    ("fantasy", "Fantasy"),
    ("history", "History"),
    ("horror", "Horror"),
    ("music", "Music"),
    ("mystery", "Mystery"),
    ("romance", "Romance"),
    ("scifi", "Science Fiction"),
    ("thriller", "Thriller"),
    ("war", "War"),
    ("western", "Western"),
];

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CatalogEntry {
    pub id: &'static str,
    pub name: &'static str,
}

pub fn entries(table: &[(&'static str, &'static str)]) -> Vec<CatalogEntry> {
    table
        .iter()
        .map(|(id, name)| CatalogEntry { id: *id, name: *name })
        .collect()
}

pub fn genre_name(slug: &str) -> Option<&'static str> {
    GENRES
        .iter()
        .find(|(id, _)| *id == slug)
        .map(|(_, name)| *name)
}

/// TMDB genre id (movie and TV lists) to genre slug
pub fn tmdb_genre_slug(id: u64) -> Option<&'static str> {
    let slug = match id {
        28 | 10759 => "action",
        12 => "adventure",
        16 => "animation",
        35 => "comedy",
        80 => "crime",
        99 => "documentary",
        18 => "drama",
        10751 | 10762 => "family",
        14 => "fantasy",
        36 => "history",
        27 => "horror",
        10402 => "music",
        9648 => "mystery",
        10749 => "romance",
        878 | 10765 => "scifi",
        53 => "thriller",
        10752 | 10768 => "war",
        37 => "western",
        _ => return None,
    };
    Some(slug)
}

/// Genre slug from a free-form genre name ("Science Fiction", "Sci-Fi & Fantasy")
pub fn genre_slug_from_name(name: &str) -> Option<&'static str> {
    let lowered = name.trim().to_lowercase();
    if lowered.starts_with("sci") {
        return Some("scifi");
    }
    if lowered.starts_with("action") {
        return Some("action");
    }
    if lowered.starts_with("war") {
        return Some("war");
    }
    if lowered == "kids" {
        return Some("family");
    }
    GENRES
        .iter()
        .find(|(id, display)| *id == lowered || display.to_lowercase() == lowered)
        .map(|(id, _)| *id)
}

/// TMDB watch-provider id to service display name
pub fn tmdb_provider_name(provider_id: u64) -> Option<&'static str> {
    let name = match provider_id {
        8 => "Netflix",
        9 | 10 | 119 => "Amazon Prime",
        15 => "Hulu",
        531 | 582 => "Paramount+",
        384 | 31 | 118 => "HBO Max",
        1899 => "Max",
        387 => "HBO",
        337 | 390 => "Disney+",
        350 | 2 => "Apple TV+",
        386 => "Peacock",
        73 | 283 => "Tubi",
        43 | 37 | 1853 | 642 => "Showtime",
        300 | 279 => "Pluto TV",
        _ => return None,
    };
    Some(name)
}

/// Streaming Availability service codes queried for listings
pub const STREAMING_AVAILABILITY_SERVICES: &[(&str, &str)] = &[
    ("netflix", "Netflix"),
    ("prime", "Amazon Prime"),
    ("hulu", "Hulu"),
    ("disney", "Disney+"),
    ("hbo", "Max"),
    ("apple", "Apple TV+"),
    ("paramount", "Paramount+"),
    ("peacock", "Peacock"),
    ("showtime", "Showtime"),
];

pub fn streaming_availability_name(code: &str) -> Option<&'static str> {
    STREAMING_AVAILABILITY_SERVICES
        .iter()
        .find(|(id, _)| *id == code)
        .map(|(_, name)| *name)
}

/// Watchmode source ids per service display name
pub const WATCHMODE_SOURCES: &[(&str, u64)] = &[
    ("Netflix", 203),
    ("Amazon Prime", 26),
    ("Hulu", 157),
    ("Disney+", 372),
    ("Max", 387),
    ("Apple TV+", 371),
    ("Paramount+", 444),
    ("Peacock", 389),
    ("Showtime", 37),
];

pub fn watchmode_source_id(service: &str) -> Option<u64> {
    WATCHMODE_SOURCES
        .iter()
        .find(|(name, _)| *name == service)
        .map(|(_, id)| *id)
}

pub fn watchmode_source_name(source_id: u64) -> Option<&'static str> {
    WATCHMODE_SOURCES
        .iter()
        .find(|(_, id)| *id == source_id)
        .map(|(name, _)| *name)
}

/// Services an LLM guess may name
pub const GUESSABLE_SERVICES: &[&str] = &[
    "Netflix",
    "Amazon Prime",
    "Hulu",
    "Disney+",
    "Max",
    "Apple TV+",
    "Paramount+",
    "Peacock",
];

/// Canonical spelling of a guessable service, compared case-insensitively
pub fn guessable_service(name: &str) -> Option<&'static str> {
    let name = name.trim();
    GUESSABLE_SERVICES
        .iter()
        .find(|service| service.eq_ignore_ascii_case(name))
        .copied()
}
