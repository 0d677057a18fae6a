use crate::models::{catalog, MediaItem};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Release-date window relative to today
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum DateFilter {
    #[default]
    All,
    ThisWeek,
    ThisMonth,
    ComingSoon,
}

impl DateFilter {
    /// Whether a release date falls inside the window
    ///
    /// Undated items only pass `All`.
    pub fn matches(&self, date: Option<NaiveDate>, today: NaiveDate) -> bool {
        let week = today + Duration::days(7);
        let month = today + Duration::days(30);

        match (self, date) {
            (DateFilter::All, _) => true,
            (_, None) => false,
            (DateFilter::ThisWeek, Some(d)) => d >= today && d <= week,
            (DateFilter::ThisMonth, Some(d)) => d >= today && d <= month,
            (DateFilter::ComingSoon, Some(d)) => d > month,
        }
    }
}

/// Genre, date and service constraints applied to a listing
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaFilter {
    /// Genre slug; `None` or `"all"` keeps everything
    pub genre: Option<String>,
    pub date: DateFilter,
    /// Service slug or display name; see [`filter_by_service`]
    pub service: Option<String>,
}

impl MediaFilter {
    pub fn apply(&self, items: Vec<MediaItem>, today: NaiveDate) -> Vec<MediaItem> {
        let mut items = filter_by_genre(items, self.genre.as_deref());
        items.retain(|item| self.date.matches(item.release(), today));
        let mut items = filter_by_service(items, self.service.as_deref());
        sort_by_release(&mut items);
        items
    }
}

pub fn filter_by_genre(items: Vec<MediaItem>, genre: Option<&str>) -> Vec<MediaItem> {
    match genre.map(str::trim) {
        None | Some("") | Some("all") => items,
        Some(genre) => items
            .into_iter()
            .filter(|item| item.genre_ids.iter().any(|g| g == genre))
            .collect(),
    }
}

/// Keeps items streaming on a service
///
/// Known slugs and names expand to every provider spelling of that service;
/// anything else is compared case-insensitively as-is.
pub fn filter_by_service(items: Vec<MediaItem>, service: Option<&str>) -> Vec<MediaItem> {
    let Some(service) = service.map(str::trim).filter(|s| !s.is_empty() && *s != "all") else {
        return items;
    };
    let names = catalog::service_provider_names(service);
    let wanted = service.to_lowercase();

    items
        .into_iter()
        .filter(|item| {
            item.providers.iter().any(|p| match names {
                Some(names) => names.iter().any(|n| n.eq_ignore_ascii_case(p)),
                None => p.to_lowercase() == wanted,
            })
        })
        .collect()
}

/// Stable ascending sort by release date, undated items last
pub fn sort_by_release(items: &mut [MediaItem]) {
    items.sort_by_key(|item| match item.release() {
        Some(date) => (false, date),
        None => (true, NaiveDate::MIN),
    });
}

/// Case-insensitive match on title or overview
pub fn search_items(items: &[MediaItem], query: &str) -> Vec<MediaItem> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return items.to_vec();
    }

    items
        .iter()
        .filter(|item| {
            item.title.to_lowercase().contains(&query)
                || item.overview.to_lowercase().contains(&query)
        })
        .cloned()
        .collect()
}
