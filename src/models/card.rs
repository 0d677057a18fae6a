use serde::Serialize;

use super::{catalog, format_date, MediaItem};

/// Presentation view of a media item
///
/// Carries everything a card needs besides the item itself: the labels are
/// computed here so every client renders them the same way.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MediaCard {
    #[serde(flatten)]
    pub item: MediaItem,
    pub type_label: &'static str,
    pub date_label: String,
    /// `vote_average` as a percentage, absent for unrated items
    pub score_percent: Option<u32>,
    pub service_badge: Option<String>,
    /// Display names of the first two known genres
    pub genre_names: Vec<&'static str>,
}

impl From<MediaItem> for MediaCard {
    fn from(item: MediaItem) -> Self {
        let date_label = item
            .available_date
            .clone()
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| format_date(&item.release_date));

        let score_percent = if item.vote_average > 0.0 {
            Some((item.vote_average * 10.0).round() as u32)
        } else {
            None
        };

        let service_badge = item
            .service
            .as_ref()
            .filter(|s| !s.is_empty())
            .map(|s| format!("Coming to {}", s));

        let genre_names = item
            .genre_ids
            .iter()
            .filter_map(|slug| catalog::genre_name(slug))
            .take(2)
            .collect();

        Self {
            type_label: item.media_type.label(),
            date_label,
            score_percent,
            service_badge,
            genre_names,
            item,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MediaType;

    fn item() -> MediaItem {
        MediaItem {
            id: "tmdb-1".to_string(),
            title: "Andor".to_string(),
            overview: "Rebellion".to_string(),
            poster_path: None,
            release_date: "2025-04-22".to_string(),
            vote_average: 8.46,
            genre_ids: vec!["scifi".to_string(), "drama".to_string(), "action".to_string()],
            media_type: MediaType::Tv,
            providers: vec!["Disney+".to_string()],
            service: Some("Disney+".to_string()),
            available_date: None,
            imdb_rating: None,
            imdb_id: None,
            year: Some("2025".to_string()),
        }
    }

    #[test]
    fn test_card_labels() {
        let card = MediaCard::from(item());
        assert_eq!(card.type_label, "TV Show");
        assert_eq!(card.date_label, "Apr 22, 2025");
        assert_eq!(card.score_percent, Some(85));
        assert_eq!(card.service_badge, Some("Coming to Disney+".to_string()));
        assert_eq!(card.genre_names, vec!["Science Fiction", "Drama"]);
    }

    #[test]
    fn test_card_prefers_available_date() {
        let mut media = item();
        media.available_date = Some("Streaming Now".to_string());
        let card = MediaCard::from(media);
        assert_eq!(card.date_label, "Streaming Now");
    }

    #[test]
    fn test_card_without_score_or_service() {
        let mut media = item();
        media.vote_average = 0.0;
        media.service = None;
        media.release_date = String::new();
        let card = MediaCard::from(media);
        assert_eq!(card.score_percent, None);
        assert_eq!(card.service_badge, None);
        assert_eq!(card.date_label, "TBA");
    }

    #[test]
    fn test_card_serializes_item_fields_inline() {
        let json = serde_json::to_value(MediaCard::from(item())).unwrap();
        assert_eq!(json["id"], "tmdb-1");
        assert_eq!(json["title"], "Andor");
        assert_eq!(json["type_label"], "TV Show");
    }
}
