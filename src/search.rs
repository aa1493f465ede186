//! Filtered article search: one Event Registry query built from keyword,
//! category, source and date filters.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Days, Months, NaiveDate, Utc};

use crate::api::{ApiError, Article, ArticleQuery, EventRegistryClient};

/// Articles requested per search page.
pub const SEARCH_PAGE_SIZE: u32 = 50;

// ============================================================================
// Date Range
// ============================================================================

/// How far back a search reaches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DateRange {
    #[default]
    Any,
    Last24Hours,
    LastWeek,
    LastMonth,
}

impl DateRange {
    pub const ALL: [DateRange; 4] = [
        DateRange::Any,
        DateRange::Last24Hours,
        DateRange::LastWeek,
        DateRange::LastMonth,
    ];

    /// First day included in the results, or `None` for no lower bound.
    pub fn start_date(self, now: DateTime<Utc>) -> Option<NaiveDate> {
        let today = now.date_naive();
        match self {
            DateRange::Any => None,
            DateRange::Last24Hours => today.checked_sub_days(Days::new(1)),
            DateRange::LastWeek => today.checked_sub_days(Days::new(7)),
            DateRange::LastMonth => today.checked_sub_months(Months::new(1)),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DateRange::Any => "Any date",
            DateRange::Last24Hours => "In the last 24h",
            DateRange::LastWeek => "In the last week",
            DateRange::LastMonth => "In the last month",
        }
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DateRange::Any => "any",
            DateRange::Last24Hours => "24h",
            DateRange::LastWeek => "week",
            DateRange::LastMonth => "month",
        })
    }
}

impl FromStr for DateRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "any" => Ok(DateRange::Any),
            "24h" | "day" => Ok(DateRange::Last24Hours),
            "week" | "7d" => Ok(DateRange::LastWeek),
            "month" | "30d" => Ok(DateRange::LastMonth),
            other => Err(format!(
                "invalid date range '{other}' (expected any, 24h, week or month)"
            )),
        }
    }
}

// ============================================================================
// Filter
// ============================================================================

/// Current search filters plus the page being viewed.
///
/// Every setter that changes a filter sends the page back to 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchFilter {
    keyword: Option<String>,
    category_uri: Option<String>,
    source_uri: Option<String>,
    date_range: DateRange,
    page: u32,
}

impl Default for SearchFilter {
    fn default() -> Self {
        Self {
            keyword: None,
            category_uri: None,
            source_uri: None,
            date_range: DateRange::Any,
            page: 1,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl SearchFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keyword(&self) -> Option<&str> {
        self.keyword.as_deref()
    }

    pub fn category_uri(&self) -> Option<&str> {
        self.category_uri.as_deref()
    }

    pub fn source_uri(&self) -> Option<&str> {
        self.source_uri.as_deref()
    }

    pub fn date_range(&self) -> DateRange {
        self.date_range
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn set_keyword(&mut self, keyword: Option<String>) {
        self.keyword = non_blank(keyword);
        self.page = 1;
    }

    pub fn set_category(&mut self, uri: Option<String>) {
        self.category_uri = non_blank(uri);
        self.page = 1;
    }

    pub fn set_source(&mut self, uri: Option<String>) {
        self.source_uri = non_blank(uri);
        self.page = 1;
    }

    pub fn set_date_range(&mut self, range: DateRange) {
        self.date_range = range;
        self.page = 1;
    }

    pub fn set_page(&mut self, page: u32) {
        self.page = page.max(1);
    }

    pub fn next_page(&mut self) -> u32 {
        self.page = self.page.saturating_add(1);
        self.page
    }

    pub fn to_query(&self, now: DateTime<Utc>) -> ArticleQuery {
        ArticleQuery {
            keyword: self.keyword.clone(),
            category_uri: self.category_uri.clone(),
            source_uri: self.source_uri.clone(),
            date_start: self.date_range.start_date(now),
            page: self.page,
            count: SEARCH_PAGE_SIZE,
            ..ArticleQuery::default()
        }
    }
}

// ============================================================================
// Search
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct SearchResults {
    pub articles: Vec<Article>,
    pub page: u32,
    /// False once the API returned a short page.
    pub has_more: bool,
    pub total_results: u64,
}

/// Search results skip duplicates and untitled articles. Unlike the
/// preference feed, articles without an image are kept.
pub fn keep_search_result(article: &Article) -> bool {
    !article.is_duplicate && !article.title.trim().is_empty()
}

/// Run one search page for `filter`.
pub async fn search(
    client: &EventRegistryClient,
    filter: &SearchFilter,
) -> Result<SearchResults, ApiError> {
    let query = filter.to_query(Utc::now());
    tracing::info!(
        keyword = ?query.keyword,
        category = ?query.category_uri,
        source = ?query.source_uri,
        since = ?query.date_start,
        page = query.page,
        "Searching articles"
    );

    let page = client.get_articles(&query).await?;
    let has_more = page.results.len() >= SEARCH_PAGE_SIZE as usize;
    Ok(SearchResults {
        articles: page.results.into_iter().filter(keep_search_result).collect(),
        page: filter.page(),
        has_more,
        total_results: page.total_results,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::{endpoint, fast_settings};
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> EventRegistryClient {
        EventRegistryClient::new(
            reqwest::Client::new(),
            endpoint(crate::api::event_registry::SERVICE, &server.uri()),
            fast_settings(),
        )
    }

    fn article_json(uri: &str, title: &str, duplicate: bool) -> serde_json::Value {
        json!({ "uri": uri, "title": title, "isDuplicate": duplicate, "image": null })
    }

    #[test]
    fn test_date_range_start() {
        let now = Utc.with_ymd_and_hms(2024, 3, 31, 15, 0, 0).unwrap();
        let day = |y, m, d| NaiveDate::from_ymd_opt(y, m, d);

        assert_eq!(DateRange::Any.start_date(now), None);
        assert_eq!(DateRange::Last24Hours.start_date(now), day(2024, 3, 30));
        assert_eq!(DateRange::LastWeek.start_date(now), day(2024, 3, 24));
        // Clamped to the last day of a shorter month
        assert_eq!(DateRange::LastMonth.start_date(now), day(2024, 2, 29));
    }

    #[test]
    fn test_date_range_parse() {
        assert_eq!("24h".parse::<DateRange>().unwrap(), DateRange::Last24Hours);
        assert_eq!("Week".parse::<DateRange>().unwrap(), DateRange::LastWeek);
        assert_eq!("".parse::<DateRange>().unwrap(), DateRange::Any);
        assert!("fortnight".parse::<DateRange>().is_err());
        for range in DateRange::ALL {
            assert_eq!(range.to_string().parse::<DateRange>().unwrap(), range);
        }
    }

    #[test]
    fn test_filter_changes_reset_page() {
        let mut filter = SearchFilter::new();
        filter.set_page(4);
        filter.set_keyword(Some("climate".to_string()));
        assert_eq!(filter.page(), 1);

        filter.next_page();
        filter.next_page();
        assert_eq!(filter.page(), 3);
        filter.set_date_range(DateRange::LastWeek);
        assert_eq!(filter.page(), 1);

        filter.next_page();
        filter.set_source(Some("  ".to_string()));
        assert_eq!(filter.page(), 1);
        assert_eq!(filter.source_uri(), None);
    }

    #[test]
    fn test_to_query() {
        let now = Utc.with_ymd_and_hms(2024, 6, 10, 8, 0, 0).unwrap();
        let mut filter = SearchFilter::new();
        filter.set_keyword(Some(" elections ".to_string()));
        filter.set_category(Some("dmoz/Society/Politics".to_string()));
        filter.set_date_range(DateRange::Last24Hours);
        filter.next_page();

        let query = filter.to_query(now);
        assert_eq!(query.keyword.as_deref(), Some("elections"));
        assert_eq!(query.category_uri.as_deref(), Some("dmoz/Society/Politics"));
        assert_eq!(query.source_uri, None);
        assert_eq!(query.date_start, NaiveDate::from_ymd_opt(2024, 6, 9));
        assert_eq!(query.page, 2);
        assert_eq!(query.count, SEARCH_PAGE_SIZE);
    }

    #[test]
    fn test_keep_search_result() {
        let titled = Article {
            title: "Headline".to_string(),
            ..Article::default()
        };
        assert!(keep_search_result(&titled));
        assert!(!keep_search_result(&Article::default()));
        assert!(!keep_search_result(&Article {
            is_duplicate: true,
            ..titled
        }));
    }

    #[tokio::test]
    async fn test_search_filters_results() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/article/getArticles"))
            .and(query_param("keyword", "rust"))
            .and(query_param("articlesCount", "50"))
            .and(query_param("articlesPage", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "articles": {
                    "results": [
                        article_json("1", "Rust 2.0 announced", false),
                        article_json("2", "Rust 2.0 announced", true),
                        article_json("3", "", false),
                    ],
                    "totalResults": 3,
                    "page": 1,
                    "count": 50,
                    "pages": 1
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut filter = SearchFilter::new();
        filter.set_keyword(Some("rust".to_string()));
        let results = search(&client(&server), &filter).await.unwrap();

        let uris: Vec<_> = results.articles.iter().map(|a| a.uri.as_str()).collect();
        assert_eq!(uris, vec!["1"]);
        assert!(!results.has_more);
        assert_eq!(results.total_results, 3);
    }

    #[tokio::test]
    async fn test_search_full_page_has_more() {
        let server = MockServer::start().await;
        let results: Vec<_> = (0..SEARCH_PAGE_SIZE)
            .map(|i| article_json(&i.to_string(), "Title", false))
            .collect();
        Mock::given(method("GET"))
            .and(path("/article/getArticles"))
            .and(query_param("articlesPage", "2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "articles": { "results": results, "totalResults": 120 }
            })))
            .mount(&server)
            .await;

        let mut filter = SearchFilter::new();
        filter.set_page(2);
        let results = search(&client(&server), &filter).await.unwrap();
        assert_eq!(results.articles.len(), SEARCH_PAGE_SIZE as usize);
        assert_eq!(results.page, 2);
        assert!(results.has_more);
    }

    #[tokio::test]
    async fn test_search_error_surfaces() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/article/getArticles"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&server)
            .await;

        let err = search(&client(&server), &SearchFilter::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::HttpStatus(401)));
    }
}
