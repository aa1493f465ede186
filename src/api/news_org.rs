//! NewsAPI.org client: top headlines.

use super::types::HeadlinesResponse;
use super::{get_json, with_query, ApiError, Endpoint, RequestSettings};

pub const SERVICE: &str = "news_org";
pub const DEFAULT_BASE_URL: &str = "https://newsapi.org/v2";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeadlinesQuery {
    pub country: Option<String>,
    pub category: Option<String>,
    /// Comma-separated source ids. The API rejects this combined with
    /// `country` or `category`; we pass it through and let the API decide.
    pub sources: Option<String>,
    pub q: Option<String>,
    pub page_size: Option<u32>,
    pub page: Option<u32>,
}

#[derive(Debug)]
pub struct NewsOrgClient {
    http: reqwest::Client,
    endpoint: Endpoint,
    settings: RequestSettings,
}

impl NewsOrgClient {
    pub fn new(http: reqwest::Client, endpoint: Endpoint, settings: RequestSettings) -> Self {
        Self {
            http,
            endpoint,
            settings,
        }
    }

    pub async fn top_headlines(
        &self,
        query: &HeadlinesQuery,
    ) -> Result<HeadlinesResponse, ApiError> {
        let url = with_query(
            self.endpoint.url("top-headlines")?,
            [
                ("apiKey", Some(self.endpoint.api_key()?.to_string())),
                ("country", query.country.clone()),
                ("category", query.category.clone()),
                ("sources", query.sources.clone()),
                ("q", query.q.clone()),
                ("pageSize", query.page_size.map(|n| n.to_string())),
                ("page", query.page.map(|n| n.to_string())),
            ],
        );

        let response: HeadlinesResponse = get_json(&self.http, &url, &self.settings).await?;
        tracing::debug!(
            status = %response.status,
            total = response.total_results,
            "Fetched top headlines"
        );
        Ok(response)
    }
}
