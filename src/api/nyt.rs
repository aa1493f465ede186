//! New York Times client: most popular articles.

use super::types::{MostPopularResponse, PopularArticle};
use super::{get_json, with_query, ApiError, Endpoint, RequestSettings};
use std::fmt;
use std::str::FromStr;

pub const SERVICE: &str = "nyt";
pub const DEFAULT_BASE_URL: &str = "https://api.nytimes.com/svc";

/// Number of most-popular articles shown on the front page.
pub const HIGHLIGHT_COUNT: usize = 6;

/// Window the most-viewed ranking is computed over.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PopularPeriod {
    #[default]
    Day,
    Week,
    Month,
}

impl PopularPeriod {
    pub fn days(self) -> u32 {
        match self {
            PopularPeriod::Day => 1,
            PopularPeriod::Week => 7,
            PopularPeriod::Month => 30,
        }
    }
}

impl fmt::Display for PopularPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.days())
    }
}

impl FromStr for PopularPeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1" | "day" => Ok(PopularPeriod::Day),
            "7" | "week" => Ok(PopularPeriod::Week),
            "30" | "month" => Ok(PopularPeriod::Month),
            other => Err(format!("invalid period '{other}' (expected 1, 7 or 30)")),
        }
    }
}

#[derive(Debug)]
pub struct NytClient {
    http: reqwest::Client,
    endpoint: Endpoint,
    settings: RequestSettings,
}

impl NytClient {
    pub fn new(http: reqwest::Client, endpoint: Endpoint, settings: RequestSettings) -> Self {
        Self {
            http,
            endpoint,
            settings,
        }
    }

    /// Most viewed articles over `period`.
    pub async fn most_viewed(&self, period: PopularPeriod) -> Result<MostPopularResponse, ApiError> {
        let path = format!("mostpopular/v2/viewed/{}.json", period.days());
        let url = with_query(
            self.endpoint.url(&path)?,
            [("api-key", Some(self.endpoint.api_key()?.to_string()))],
        );

        let response: MostPopularResponse = get_json(&self.http, &url, &self.settings).await?;
        tracing::debug!(
            period = period.days(),
            results = response.num_results,
            "Fetched most popular"
        );
        Ok(response)
    }
}

/// Leading articles for the front page.
pub fn highlights(response: &MostPopularResponse) -> &[PopularArticle] {
    let end = response.results.len().min(HIGHLIGHT_COUNT);
    &response.results[..end]
}
