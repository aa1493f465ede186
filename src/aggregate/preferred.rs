use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::cache::QueryCache;
use super::query::{QueryKey, QueryState};
use crate::api::{ApiError, Article, ArticlePage, ArticleQuery, EventRegistryClient};
use crate::preferences::{PreferenceKind, PreferenceItem, Preferences};

/// Articles requested per preference query.
pub const PREFERRED_PAGE_SIZE: u32 = 70;

/// Default bound on in-flight queries during a fan-out.
pub const DEFAULT_MAX_CONCURRENT: usize = 16;

pub type PageState = QueryState<Arc<ArticlePage>>;

/// Whether a fetched article is shown: not flagged duplicate, and has an image.
pub fn is_displayable(article: &Article) -> bool {
    !article.is_duplicate && article.has_image()
}

// ============================================================================
// Query Planning
// ============================================================================

/// One article query derived from a preference item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedQuery {
    pub kind: PreferenceKind,
    pub key: QueryKey,
    pub query: ArticleQuery,
}

impl PlannedQuery {
    fn for_item(kind: PreferenceKind, item: &PreferenceItem, page: u32, page_size: u32) -> Self {
        let mut query = ArticleQuery {
            page,
            count: page_size,
            ..ArticleQuery::default()
        };
        let uri = Some(item.uri.clone());
        match kind {
            PreferenceKind::Category => query.category_uri = uri,
            PreferenceKind::Source => query.source_uri = uri,
            PreferenceKind::Author => query.author_uri = uri,
        }

        Self {
            kind,
            key: QueryKey::new([
                "articles".to_string(),
                kind.as_str().to_string(),
                item.uri.clone(),
                page.to_string(),
            ]),
            query,
        }
    }
}

/// One query per preference item: categories first, then sources, then
/// authors, each in list order.
pub fn plan_queries(prefs: &Preferences, page: u32, page_size: u32) -> Vec<PlannedQuery> {
    let page = page.max(1);
    PreferenceKind::ALL
        .iter()
        .flat_map(|&kind| {
            prefs
                .list(kind)
                .iter()
                .map(move |item| PlannedQuery::for_item(kind, item, page, page_size))
        })
        .collect()
}

// ============================================================================
// Aggregate View
// ============================================================================

/// Merged view over every query of a preference fan-out.
#[derive(Debug, Clone, Default)]
pub struct PreferredArticles {
    /// Displayable articles from every settled query, flattened in query order.
    pub articles: Vec<Article>,
    /// True while any query is still pending.
    pub is_loading: bool,
    /// True if any query failed.
    pub has_error: bool,
    pub errors: Vec<Arc<ApiError>>,
    pub query_count: usize,
}

impl PreferredArticles {
    pub fn from_states(states: &[PageState]) -> Self {
        Self {
            articles: states
                .iter()
                .filter_map(QueryState::data)
                .flat_map(|page| page.results.iter())
                .filter(|article| is_displayable(article))
                .cloned()
                .collect(),
            is_loading: states.iter().any(QueryState::is_loading),
            has_error: states.iter().any(QueryState::is_error),
            errors: states
                .iter()
                .filter_map(QueryState::error)
                .cloned()
                .collect(),
            query_count: states.len(),
        }
    }
}

// ============================================================================
// Aggregator
// ============================================================================

/// Runs article queries for preferences and displayed categories through a
/// shared [`QueryCache`].
///
/// Cloning is cheap; clones share the client and the cache.
#[derive(Debug, Clone)]
pub struct ArticleAggregator {
    pub(crate) client: Arc<EventRegistryClient>,
    pub(crate) cache: Arc<QueryCache<ArticlePage>>,
    page_size: u32,
    pub(crate) max_concurrent: usize,
}

impl ArticleAggregator {
    pub fn new(client: Arc<EventRegistryClient>, cache: Arc<QueryCache<ArticlePage>>) -> Self {
        Self {
            client,
            cache,
            page_size: PREFERRED_PAGE_SIZE,
            max_concurrent: DEFAULT_MAX_CONCURRENT,
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub(crate) async fn run(&self, key: QueryKey, query: &ArticleQuery) -> PageState {
        let result = self
            .cache
            .get_or_fetch(key.clone(), || self.client.get_articles(query))
            .await;
        if let Err(e) = &result {
            tracing::warn!(key = %key, error = %e, "Article query failed");
        }
        result.into()
    }

    /// Fan out one query per preference item for `page` and wait for all of
    /// them to settle.
    ///
    /// Failed queries do not abort the others: their articles are simply
    /// missing and `has_error` is set.
    pub async fn fetch_preferred(&self, prefs: &Preferences, page: u32) -> PreferredArticles {
        let planned = plan_queries(prefs, page, self.page_size);
        tracing::info!(queries = planned.len(), page = page, "Fetching preferred articles");

        let states: Vec<PageState> = stream::iter(planned)
            .map(|q| async move { self.run(q.key, &q.query).await })
            .buffered(self.max_concurrent)
            .collect()
            .await;

        let view = PreferredArticles::from_states(&states);
        tracing::info!(
            articles = view.articles.len(),
            failed = view.errors.len(),
            "Preferred articles settled"
        );
        view
    }

    /// Start a preference fan-out in the background.
    ///
    /// The returned [`FanOut`] observes per-query progress; dropping it
    /// aborts whatever is still in flight.
    pub fn spawn_preferred(&self, prefs: &Preferences, page: u32) -> FanOut {
        let planned = plan_queries(prefs, page, self.page_size);
        let (tx, rx) = watch::channel(vec![PageState::Loading; planned.len()]);
        let aggregator = self.clone();

        let task = tokio::spawn(async move {
            let max_concurrent = aggregator.max_concurrent;
            let aggregator = &aggregator;
            let mut settled = stream::iter(planned.into_iter().enumerate())
                .map(|(index, q)| async move { (index, aggregator.run(q.key, &q.query).await) })
                .buffer_unordered(max_concurrent);

            while let Some((index, state)) = settled.next().await {
                tx.send_modify(|states| states[index] = state);
            }
        });

        FanOut { rx, task }
    }
}

// ============================================================================
// FanOut Handle
// ============================================================================

/// Live handle on a background preference fan-out.
pub struct FanOut {
    rx: watch::Receiver<Vec<PageState>>,
    task: JoinHandle<()>,
}

impl FanOut {
    pub fn query_count(&self) -> usize {
        self.rx.borrow().len()
    }

    /// Snapshot of the aggregate as of now.
    pub fn view(&self) -> PreferredArticles {
        PreferredArticles::from_states(&self.rx.borrow())
    }

    /// Wait for the next query to settle. Returns `false` once no further
    /// updates can arrive.
    pub async fn changed(&mut self) -> bool {
        self.rx.changed().await.is_ok()
    }

    /// Wait until every query has settled and return the final view.
    pub async fn settled(mut self) -> PreferredArticles {
        loop {
            let view = self.view();
            if !view.is_loading {
                return view;
            }
            if !self.changed().await {
                tracing::warn!("Fan-out ended with queries still pending");
                return self.view();
            }
        }
    }
}

impl Drop for FanOut {
    fn drop(&mut self) {
        self.task.abort();
    }
}

// ============================================================================
// Pagination
// ============================================================================

/// Page counter for the preference feed. Moving to another page keys a
/// fresh fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pager {
    page: u32,
}

impl Default for Pager {
    fn default() -> Self {
        Self { page: 1 }
    }
}

impl Pager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(page: u32) -> Self {
        Self { page: page.max(1) }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn next(&mut self) -> u32 {
        self.page = self.page.saturating_add(1);
        self.page
    }

    pub fn previous(&mut self) -> u32 {
        self.page = self.page.saturating_sub(1).max(1);
        self.page
    }

    pub fn reset(&mut self) {
        self.page = 1;
    }
}
