//! Preference-driven article aggregation.
//!
//! Each followed source, category and author becomes one Event Registry
//! query. The queries run concurrently through a shared [`QueryCache`] and
//! their outcomes are merged into a single view that exposes loading and
//! error flags alongside whatever data has already arrived.

mod cache;
mod categories;
mod preferred;
mod query;

pub use cache::{QueryCache, DEFAULT_STALE_TIME};
pub use categories::{
    fetch_categories, resolve_categories, Category, CategoryArticles, CategorySections,
    DisplayedCategory, CATEGORY_PREVIEW_SIZE,
};
pub use preferred::{
    is_displayable, plan_queries, ArticleAggregator, FanOut, PageState, Pager, PlannedQuery,
    PreferredArticles, DEFAULT_MAX_CONCURRENT, PREFERRED_PAGE_SIZE,
};
pub use query::{QueryKey, QueryState};
