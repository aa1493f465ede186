//! Content preferences: the sources, categories and authors a user follows.
//!
//! Config values serve as defaults; CLI selections are layered on top.
//! Nothing is ever written back.
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::config::PreferencesConfig;

/// A followed source, category or author.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct PreferenceItem {
    pub uri: String,
    /// Human-readable label. Suggestion payloads call this `title` (sources)
    /// or `name` (authors).
    #[serde(default, alias = "title", alias = "name")]
    pub label: String,
}

impl PreferenceItem {
    pub fn new(uri: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            label: label.into(),
        }
    }

    /// An item known only by URI; the URI doubles as its label.
    pub fn from_uri(uri: impl Into<String>) -> Self {
        let uri = uri.into();
        Self {
            label: uri.clone(),
            uri,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PreferenceKind {
    Source,
    Category,
    Author,
}

impl PreferenceKind {
    pub const ALL: [PreferenceKind; 3] = [
        PreferenceKind::Category,
        PreferenceKind::Source,
        PreferenceKind::Author,
    ];

    /// Plural name, used in query keys.
    pub fn as_str(self) -> &'static str {
        match self {
            PreferenceKind::Source => "sources",
            PreferenceKind::Category => "categories",
            PreferenceKind::Author => "authors",
        }
    }
}

impl fmt::Display for PreferenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PreferenceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "source" | "sources" => Ok(PreferenceKind::Source),
            "category" | "categories" => Ok(PreferenceKind::Category),
            "author" | "authors" => Ok(PreferenceKind::Author),
            other => Err(format!("unknown preference kind '{other}'")),
        }
    }
}

// ============================================================================
// Preferences
// ============================================================================

/// Ordered preference lists, one per [`PreferenceKind`].
///
/// No list ever holds two items with the same URI: construction keeps the
/// first occurrence and [`Preferences::add`] refuses duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Preferences {
    sources: Vec<PreferenceItem>,
    categories: Vec<PreferenceItem>,
    authors: Vec<PreferenceItem>,
}

impl Preferences {
    pub fn new(
        sources: Vec<PreferenceItem>,
        categories: Vec<PreferenceItem>,
        authors: Vec<PreferenceItem>,
    ) -> Self {
        let mut prefs = Self::default();
        prefs.set(PreferenceKind::Source, sources);
        prefs.set(PreferenceKind::Category, categories);
        prefs.set(PreferenceKind::Author, authors);
        prefs
    }

    pub fn from_config(config: &PreferencesConfig) -> Self {
        Self::new(
            config.sources.clone(),
            config.categories.clone(),
            config.authors.clone(),
        )
    }

    pub fn sources(&self) -> &[PreferenceItem] {
        &self.sources
    }

    pub fn categories(&self) -> &[PreferenceItem] {
        &self.categories
    }

    pub fn authors(&self) -> &[PreferenceItem] {
        &self.authors
    }

    pub fn list(&self, kind: PreferenceKind) -> &[PreferenceItem] {
        match kind {
            PreferenceKind::Source => &self.sources,
            PreferenceKind::Category => &self.categories,
            PreferenceKind::Author => &self.authors,
        }
    }

    fn list_mut(&mut self, kind: PreferenceKind) -> &mut Vec<PreferenceItem> {
        match kind {
            PreferenceKind::Source => &mut self.sources,
            PreferenceKind::Category => &mut self.categories,
            PreferenceKind::Author => &mut self.authors,
        }
    }

    /// Append `item` unless its URI is already present. Returns whether it
    /// was added.
    pub fn add(&mut self, kind: PreferenceKind, item: PreferenceItem) -> bool {
        let list = self.list_mut(kind);
        if list.iter().any(|existing| existing.uri == item.uri) {
            return false;
        }
        list.push(item);
        true
    }

    /// Remove the item with `uri`. Returns whether anything was removed.
    pub fn remove(&mut self, kind: PreferenceKind, uri: &str) -> bool {
        let list = self.list_mut(kind);
        let before = list.len();
        list.retain(|item| item.uri != uri);
        list.len() != before
    }

    /// Replace a whole list, dropping later duplicates.
    pub fn set(&mut self, kind: PreferenceKind, items: Vec<PreferenceItem>) {
        self.list_mut(kind).clear();
        for item in items {
            self.add(kind, item);
        }
    }

    /// Layer URI-only selections (from the command line) on top.
    pub fn with_overrides(
        mut self,
        sources: &[String],
        categories: &[String],
        authors: &[String],
    ) -> Self {
        for (kind, uris) in [
            (PreferenceKind::Source, sources),
            (PreferenceKind::Category, categories),
            (PreferenceKind::Author, authors),
        ] {
            for uri in uris {
                self.add(kind, PreferenceItem::from_uri(uri.as_str()));
            }
        }
        self
    }

    /// Total number of items across all three lists.
    pub fn len(&self) -> usize {
        self.sources.len() + self.categories.len() + self.authors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
