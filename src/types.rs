//! Core type definitions for orbital-cdn.
//!
//! # Key Types
//!
//! - [`ContentItem`]: an immutable catalog entry shared with caches by `Arc`
//! - [`ContentType`]: closed set of content kinds
//!
//! # Type Aliases
//!
//! - [`ContentId`] = `String`: catalog key
//! - [`NodeId`] = `String`: satellite identifier such as `LEO-1`
//! - [`SimTime`] = `f64`: virtual time in seconds, owned by the scheduler
//!
//! # Example
//!
//! ```rust
//! use orbital_cdn::types::{ContentItem, ContentType};
//!
//! let item = ContentItem::new("doc_news_article", ContentType::Document, 2.0)
//!     .with_title("Breaking News Article")
//!     .with_popularity(0.85);
//! assert_eq!(item.size_mb, 2.0);
//! assert_eq!(item.popularity, 0.85);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Unique identifier for a content item.
pub type ContentId = String;

/// Unique identifier for a satellite node.
pub type NodeId = String;

/// Virtual simulation time in seconds.
pub type SimTime = f64;

/// Kind of content carried by the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Video,
    Image,
    Document,
    Audio,
    Application,
    Game,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Video => "video",
            ContentType::Image => "image",
            ContentType::Document => "document",
            ContentType::Audio => "audio",
            ContentType::Application => "application",
            ContentType::Game => "game",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A catalog entry. Immutable once built; caches hold it behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    /// Unique catalog key.
    pub content_id: ContentId,
    /// Human readable title.
    pub title: String,
    /// Content kind.
    pub content_type: ContentType,
    /// Size in megabytes.
    pub size_mb: f64,
    /// Short description.
    pub description: String,
    /// Editorial category (news, education, emergency, ...).
    pub category: String,
    /// Popularity score in `[0, 1]`, used to weight generated requests.
    pub popularity: f64,
    /// Free-form attributes such as resolution or format.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl ContentItem {
    /// Creates an item with empty human metadata and popularity 1.0.
    pub fn new(content_id: impl Into<ContentId>, content_type: ContentType, size_mb: f64) -> Self {
        Self {
            content_id: content_id.into(),
            title: String::new(),
            content_type,
            size_mb,
            description: String::new(),
            category: String::new(),
            popularity: 1.0,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Sets the popularity score, clamped to `[0, 1]`.
    pub fn with_popularity(mut self, popularity: f64) -> Self {
        self.popularity = popularity.clamp(0.0, 1.0);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}
