use futures::stream::{self, StreamExt};

use super::cache::QueryCache;
use super::preferred::{is_displayable, ArticleAggregator, PageState};
use super::query::{QueryKey, QueryState};
use crate::api::{ApiError, Article, ArticleQuery, CategorySuggestion, EventRegistryClient};
use crate::util::extract_category_label;

/// Articles fetched per displayed category.
pub const CATEGORY_PREVIEW_SIZE: u32 = 12;

/// A category shown on the front page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayedCategory {
    pub uri: String,
    pub label: Option<String>,
}

impl From<&Category> for DisplayedCategory {
    fn from(category: &Category) -> Self {
        Self {
            uri: category.uri.clone(),
            label: Some(category.label.clone()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CategoryArticles {
    pub label: String,
    pub uri: String,
    pub results: Vec<Article>,
}

/// Per-category sections plus the aggregate flags.
#[derive(Debug, Clone, Default)]
pub struct CategorySections {
    pub sections: Vec<CategoryArticles>,
    pub is_loading: bool,
    pub has_error: bool,
}

impl CategorySections {
    /// `states[i]` is the outcome for `categories[i]`. Sections exist only for
    /// succeeded queries of labelled categories.
    pub fn from_states(categories: &[DisplayedCategory], states: &[PageState]) -> Self {
        let sections = categories
            .iter()
            .zip(states)
            .filter_map(|(category, state)| {
                let page = state.data()?;
                let label = category.label.clone().filter(|l| !l.is_empty())?;
                Some(CategoryArticles {
                    label,
                    uri: category.uri.clone(),
                    results: page
                        .results
                        .iter()
                        .filter(|a| is_displayable(a))
                        .cloned()
                        .collect(),
                })
            })
            .collect();

        Self {
            sections,
            is_loading: states.iter().any(QueryState::is_loading),
            has_error: states.iter().any(QueryState::is_error),
        }
    }
}

impl ArticleAggregator {
    /// One preview query per displayed category, run concurrently.
    pub async fn fetch_by_categories(&self, categories: &[DisplayedCategory]) -> CategorySections {
        tracing::info!(categories = categories.len(), "Fetching category previews");

        let states: Vec<PageState> = stream::iter(categories)
            .map(|category| async move {
                let key = QueryKey::new(["articles", category.uri.as_str()]);
                let query = ArticleQuery {
                    category_uri: Some(category.uri.clone()),
                    count: CATEGORY_PREVIEW_SIZE,
                    ..ArticleQuery::default()
                };
                self.run(key, &query).await
            })
            .buffered(self.max_concurrent)
            .collect()
            .await;

        CategorySections::from_states(categories, &states)
    }
}

// ============================================================================
// Category List
// ============================================================================

/// A category with its display label resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub uri: String,
    pub label: String,
    pub parent_uri: Option<String>,
}

/// Resolve display labels, dropping categories without one, and keep at
/// most `size` of them.
pub fn resolve_categories(raw: &[CategorySuggestion], size: Option<usize>) -> Vec<Category> {
    raw.iter()
        .filter_map(|c| {
            extract_category_label(&c.label).map(|label| Category {
                uri: c.uri.clone(),
                label: label.to_string(),
                parent_uri: c.parent_uri.clone(),
            })
        })
        .take(size.unwrap_or(usize::MAX))
        .collect()
}

/// Fetch the category list through `cache` (key `categories`).
pub async fn fetch_categories(
    client: &EventRegistryClient,
    cache: &QueryCache<Vec<CategorySuggestion>>,
    size: Option<usize>,
) -> Result<Vec<Category>, ApiError> {
    let raw = cache
        .get_or_fetch(QueryKey::new(["categories"]), || client.suggest_categories())
        .await
        .inspect_err(|e| tracing::warn!(error = %e, "Failed to load categories"))?;
    Ok(resolve_categories(&raw, size))
}
