//! Content catalog.
//!
//! The catalog is the authority on which content exists and how large it is.
//! Nodes only ever see it through [`ContentCatalog::resolve`]; the concrete
//! [`InMemoryCatalog`] adds browsing helpers used by the CLI and the workload
//! generator.

use crate::error::{OrbitalError, Result};
use crate::types::{ContentId, ContentItem, ContentType};
use std::collections::HashMap;
use std::sync::Arc;

/// Read-only lookup from content id to item.
pub trait ContentCatalog: Send + Sync {
    fn resolve(&self, content_id: &str) -> Option<Arc<ContentItem>>;
}

/// Catalog held in memory, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    items: Vec<Arc<ContentItem>>,
    index: HashMap<ContentId, usize>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a catalog from items. A later item replaces an earlier one with
    /// the same id.
    pub fn from_items(items: impl IntoIterator<Item = ContentItem>) -> Self {
        let mut catalog = Self::new();
        for item in items {
            catalog.insert(item);
        }
        catalog
    }

    /// Adds or replaces an item.
    pub fn insert(&mut self, item: ContentItem) {
        let item = Arc::new(item);
        match self.index.get(&item.content_id) {
            Some(&position) => self.items[position] = item,
            None => {
                self.index.insert(item.content_id.clone(), self.items.len());
                self.items.push(item);
            }
        }
    }

    /// The built-in catalog of fifteen items typical of a satellite CDN:
    /// news, weather, education and emergency content in several formats.
    pub fn realistic() -> Self {
        use ContentType::*;

        #[rustfmt::skip]
        let table: [(&str, &str, ContentType, f64, &str, f64, &str, &[(&str, &str)]); 15] = [
            ("video_news_bulletin_1080p", "Daily News Bulletin", Video, 450.0,
             "1080p news broadcast - 30 minutes", 0.85, "news",
             &[("duration_minutes", "30"), ("resolution", "1920x1080"), ("format", "mp4")]),
            ("video_educational_tutorial", "Python Programming Tutorial", Video, 320.0,
             "Educational video tutorial - 45 minutes", 0.75, "education",
             &[("duration_minutes", "45"), ("resolution", "1280x720"), ("format", "mp4")]),
            ("video_sports_highlights", "Sports Highlights Reel", Video, 280.0,
             "Sports highlights compilation - 20 minutes", 0.90, "sports",
             &[("duration_minutes", "20"), ("resolution", "1920x1080"), ("format", "mp4")]),
            ("video_weather_forecast", "Weather Forecast", Video, 120.0,
             "Daily weather forecast - 5 minutes", 0.70, "weather",
             &[("duration_minutes", "5"), ("resolution", "1280x720"), ("format", "mp4")]),
            ("image_satellite_map", "Satellite Imagery Map", Image, 45.0,
             "High-resolution satellite map", 0.65, "maps",
             &[("resolution", "4096x4096"), ("format", "png")]),
            ("image_news_photo", "Breaking News Photo", Image, 12.0,
             "High-quality news photograph", 0.80, "news",
             &[("resolution", "2048x1536"), ("format", "jpg")]),
            ("image_infographic", "Data Visualization Infographic", Image, 8.0,
             "Educational infographic", 0.60, "education",
             &[("resolution", "1920x1080"), ("format", "png")]),
            ("doc_emergency_protocol", "Emergency Response Protocol", Document, 5.0,
             "Emergency procedures document", 0.55, "emergency",
             &[("pages", "25"), ("format", "pdf")]),
            ("doc_weather_report", "Detailed Weather Report", Document, 3.0,
             "Comprehensive weather analysis", 0.70, "weather",
             &[("pages", "10"), ("format", "pdf")]),
            ("doc_news_article", "Breaking News Article", Document, 2.0,
             "Latest news article", 0.85, "news",
             &[("pages", "5"), ("format", "pdf")]),
            ("audio_news_podcast", "News Podcast Episode", Audio, 35.0,
             "Daily news podcast - 30 minutes", 0.75, "news",
             &[("duration_minutes", "30"), ("format", "mp3"), ("bitrate", "128kbps")]),
            ("audio_emergency_alert", "Emergency Alert Broadcast", Audio, 2.0,
             "Emergency alert message", 0.95, "emergency",
             &[("duration_minutes", "2"), ("format", "mp3")]),
            ("audio_educational_lecture", "Educational Lecture", Audio, 45.0,
             "University lecture recording - 60 minutes", 0.65, "education",
             &[("duration_minutes", "60"), ("format", "mp3")]),
            ("app_emergency_guide", "Emergency Response App", Application, 25.0,
             "Mobile emergency response application", 0.80, "emergency",
             &[("platform", "android"), ("version", "2.1")]),
            ("app_weather_monitor", "Weather Monitoring Tool", Application, 18.0,
             "Real-time weather monitoring application", 0.70, "weather",
             &[("platform", "cross-platform"), ("version", "1.5")]),
        ];

        Self::from_items(table.iter().map(
            |&(id, title, content_type, size_mb, description, popularity, category, metadata)| {
                metadata.iter().fold(
                    ContentItem::new(id, content_type, size_mb)
                        .with_title(title)
                        .with_description(description)
                        .with_popularity(popularity)
                        .with_category(category),
                    |item, &(key, value)| item.with_metadata(key, value),
                )
            },
        ))
    }

    /// Looks up an item that must exist.
    pub fn get(&self, content_id: &str) -> Result<Arc<ContentItem>> {
        self.resolve(content_id)
            .ok_or_else(|| OrbitalError::ContentNotFound(content_id.to_string()))
    }

    pub fn items(&self) -> &[Arc<ContentItem>] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn by_type(&self, content_type: ContentType) -> Vec<Arc<ContentItem>> {
        self.items
            .iter()
            .filter(|item| item.content_type == content_type)
            .cloned()
            .collect()
    }

    /// Items by descending popularity; equal scores keep catalog order.
    pub fn most_popular(&self, limit: usize) -> Vec<Arc<ContentItem>> {
        let mut items = self.items.clone();
        items.sort_by(|a, b| b.popularity.total_cmp(&a.popularity));
        items.truncate(limit);
        items
    }

    /// Case-insensitive substring search over titles and descriptions.
    pub fn search(&self, query: &str) -> Vec<Arc<ContentItem>> {
        let query = query.to_lowercase();
        self.items
            .iter()
            .filter(|item| {
                item.title.to_lowercase().contains(&query)
                    || item.description.to_lowercase().contains(&query)
            })
            .cloned()
            .collect()
    }
}

impl ContentCatalog for InMemoryCatalog {
    fn resolve(&self, content_id: &str) -> Option<Arc<ContentItem>> {
        self.index
            .get(content_id)
            .map(|&position| Arc::clone(&self.items[position]))
    }
}
