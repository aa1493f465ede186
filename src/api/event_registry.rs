//! Event Registry client: article listing/search and fast suggestions.

use super::types::{
    ArticlePage, ArticlesEnvelope, AuthorSuggestion, CategorySuggestion, SourceSuggestion,
};
use super::{get_json, with_query, ApiError, Endpoint, RequestSettings};
use chrono::NaiveDate;

pub const SERVICE: &str = "news_api";
pub const DEFAULT_BASE_URL: &str = "https://eventregistry.org/api/v1";

/// Parameters for one call to the article endpoint.
///
/// Unset filters are omitted from the request entirely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArticleQuery {
    pub keyword: Option<String>,
    pub category_uri: Option<String>,
    pub source_uri: Option<String>,
    pub author_uri: Option<String>,
    pub date_start: Option<NaiveDate>,
    pub sort_by: Option<String>,
    /// 1-based page number
    pub page: u32,
    pub count: u32,
}

impl Default for ArticleQuery {
    fn default() -> Self {
        Self {
            keyword: None,
            category_uri: None,
            source_uri: None,
            author_uri: None,
            date_start: None,
            sort_by: None,
            page: 1,
            count: 50,
        }
    }
}

impl ArticleQuery {
    fn params(&self) -> Vec<(&'static str, Option<String>)> {
        vec![
            ("resultType", Some("articles".to_string())),
            ("articlesPage", Some(self.page.max(1).to_string())),
            ("articlesCount", Some(self.count.to_string())),
            ("articlesSortBy", self.sort_by.clone()),
            ("keyword", self.keyword.clone()),
            ("categoryUri", self.category_uri.clone()),
            ("sourceUri", self.source_uri.clone()),
            ("authorUri", self.author_uri.clone()),
            (
                "dateStart",
                self.date_start.map(|d| d.format("%Y-%m-%d").to_string()),
            ),
        ]
    }
}

#[derive(Debug)]
pub struct EventRegistryClient {
    http: reqwest::Client,
    endpoint: Endpoint,
    settings: RequestSettings,
}

impl EventRegistryClient {
    pub fn new(http: reqwest::Client, endpoint: Endpoint, settings: RequestSettings) -> Self {
        Self {
            http,
            endpoint,
            settings,
        }
    }

    /// Fetch one page of articles matching `query`.
    pub async fn get_articles(&self, query: &ArticleQuery) -> Result<ArticlePage, ApiError> {
        let mut params = vec![("apiKey", Some(self.endpoint.api_key()?.to_string()))];
        params.extend(query.params());
        let url = with_query(self.endpoint.url("article/getArticles")?, params);

        let envelope: ArticlesEnvelope = get_json(&self.http, &url, &self.settings).await?;
        tracing::debug!(
            page = query.page,
            results = envelope.articles.results.len(),
            total = envelope.articles.total_results,
            "Fetched article page"
        );
        Ok(envelope.articles)
    }

    pub async fn suggest_categories(&self) -> Result<Vec<CategorySuggestion>, ApiError> {
        self.suggest("suggestCategoriesFast", None).await
    }

    /// Source suggestions for `prefix`, collapsed so that each URI group
    /// (the segment after the first `/`) appears once.
    pub async fn suggest_sources(
        &self,
        prefix: Option<&str>,
    ) -> Result<Vec<SourceSuggestion>, ApiError> {
        let sources: Vec<SourceSuggestion> = self.suggest("suggestSourcesFast", prefix).await?;
        Ok(crate::util::unique_by_uri_group(sources, |s| s.uri.as_str()))
    }

    pub async fn suggest_authors(
        &self,
        prefix: Option<&str>,
    ) -> Result<Vec<AuthorSuggestion>, ApiError> {
        self.suggest("suggestAuthorsFast", prefix).await
    }

    async fn suggest<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        prefix: Option<&str>,
    ) -> Result<Vec<T>, ApiError> {
        let url = with_query(
            self.endpoint.url(path)?,
            [
                ("apiKey", Some(self.endpoint.api_key()?.to_string())),
                ("prefix", prefix.map(str::to_string)),
            ],
        );
        get_json(&self.http, &url, &self.settings).await
    }
}
