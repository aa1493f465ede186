use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

/// Reads an explicit `null` as the field's default, so one sparse record
/// does not fail a whole page.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ============================================================================
// Event Registry
// ============================================================================

/// Publisher of an Event Registry article.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ArticleSource {
    #[serde(deserialize_with = "null_as_default")]
    pub uri: String,
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    pub data_type: Option<String>,
}

/// Article author. The API sends either bare names or `{uri, name}` records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub uri: Option<String>,
    pub name: String,
}

impl<'de> Deserialize<'de> for Author {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Name(String),
            Record {
                #[serde(default)]
                uri: Option<String>,
                name: String,
            },
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Name(name) => Author { uri: None, name },
            Raw::Record { uri, name } => Author { uri, name },
        })
    }
}

/// A single article from the Event Registry article endpoint.
///
/// Records are treated as immutable once fetched; the aggregation layer only
/// filters them.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Article {
    #[serde(deserialize_with = "null_as_default")]
    pub uri: String,
    pub lang: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub is_duplicate: bool,
    pub date_time: Option<DateTime<Utc>>,
    #[serde(deserialize_with = "null_as_default")]
    pub url: String,
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(deserialize_with = "null_as_default")]
    pub body: String,
    #[serde(deserialize_with = "null_as_default")]
    pub source: ArticleSource,
    #[serde(deserialize_with = "null_as_default")]
    pub authors: Vec<Author>,
    pub image: Option<String>,
    pub event_uri: Option<String>,
    pub sentiment: Option<f64>,
}

impl Article {
    /// An empty string counts as no image.
    pub fn has_image(&self) -> bool {
        self.image.as_deref().is_some_and(|i| !i.trim().is_empty())
    }

    pub fn author_names(&self) -> Vec<&str> {
        self.authors.iter().map(|a| a.name.as_str()).collect()
    }
}

/// One page of article results.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ArticlePage {
    pub results: Vec<Article>,
    pub total_results: u64,
    pub page: u32,
    pub count: u32,
    pub pages: u32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ArticlesEnvelope {
    #[serde(default)]
    pub articles: ArticlePage,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySuggestion {
    pub uri: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub parent_uri: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceSuggestion {
    pub uri: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub parent_uri: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthorSuggestion {
    pub uri: String,
    #[serde(default)]
    pub name: String,
}

// ============================================================================
// NewsAPI.org
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HeadlineSource {
    pub id: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Headline {
    #[serde(deserialize_with = "null_as_default")]
    pub source: HeadlineSource,
    pub author: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    pub description: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub url: String,
    pub url_to_image: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HeadlinesResponse {
    pub status: String,
    pub total_results: u64,
    pub articles: Vec<Headline>,
}

// ============================================================================
// New York Times
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MediaMetadata {
    pub url: String,
    pub format: String,
    pub height: u32,
    pub width: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Media {
    #[serde(rename = "type")]
    pub kind: String,
    pub caption: String,
    pub copyright: String,
    #[serde(rename = "media-metadata")]
    pub metadata: Vec<MediaMetadata>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PopularArticle {
    pub id: u64,
    pub uri: String,
    pub url: String,
    pub title: String,
    #[serde(rename = "abstract")]
    pub summary: String,
    pub byline: String,
    pub source: String,
    pub published_date: String,
    pub section: String,
    pub subsection: String,
    pub media: Vec<Media>,
}

impl PopularArticle {
    /// Every image URL across all media entries, in order.
    pub fn photos(&self) -> Vec<&str> {
        self.media
            .iter()
            .flat_map(|m| m.metadata.iter().map(|meta| meta.url.as_str()))
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MostPopularResponse {
    pub status: String,
    pub copyright: String,
    pub num_results: u64,
    pub results: Vec<PopularArticle>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_article_page_deserializes() {
        let json = r#"{
            "articles": {
                "results": [{
                    "uri": "8001",
                    "lang": "eng",
                    "isDuplicate": false,
                    "dateTime": "2024-03-01T10:00:00Z",
                    "url": "https://news.example.com/a",
                    "title": "Markets rally",
                    "body": "Stocks rose.",
                    "source": {"uri": "example.com", "dataType": "news", "title": "Example"},
                    "authors": ["Jane Doe", {"uri": "john@example.com", "name": "John Roe", "type": "author"}],
                    "image": "https://img.example.com/a.jpg",
                    "eventUri": null,
                    "sentiment": 0.2
                }],
                "totalResults": 140,
                "page": 1,
                "count": 70,
                "pages": 2
            }
        }"#;

        let envelope: ArticlesEnvelope = serde_json::from_str(json).unwrap();
        let page = envelope.articles;
        assert_eq!(page.total_results, 140);
        assert_eq!(page.pages, 2);
        let article = &page.results[0];
        assert_eq!(article.source.title, "Example");
        assert_eq!(article.author_names(), vec!["Jane Doe", "John Roe"]);
        assert_eq!(article.authors[1].uri.as_deref(), Some("john@example.com"));
        assert!(article.has_image());
        assert!(!article.is_duplicate);
    }

    #[test]
    fn test_article_without_image() {
        let article: Article =
            serde_json::from_str(r#"{"uri": "1", "title": "t", "image": null}"#).unwrap();
        assert!(!article.has_image());

        let article: Article =
            serde_json::from_str(r#"{"uri": "1", "title": "t", "image": "  "}"#).unwrap();
        assert!(!article.has_image());

        let article: Article = serde_json::from_str(r#"{"uri": "1"}"#).unwrap();
        assert!(!article.has_image());
    }

    #[test]
    fn test_null_fields_do_not_fail_the_page() {
        let json = r#"{
            "articles": {
                "results": [
                    {"uri": "1", "title": null, "body": null, "url": null,
                     "isDuplicate": null, "authors": null, "image": "i",
                     "source": {"uri": null, "title": null}},
                    {"uri": "2", "title": "Kept", "source": null, "image": "i"}
                ]
            }
        }"#;

        let envelope: ArticlesEnvelope = serde_json::from_str(json).unwrap();
        let results = envelope.articles.results;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "");
        assert!(!results[0].is_duplicate);
        assert!(results[0].authors.is_empty());
        assert_eq!(results[1].title, "Kept");
        assert_eq!(results[1].source, ArticleSource::default());
    }

    #[test]
    fn test_popular_photos_flatten_all_media() {
        let json = r#"{
            "id": 1, "title": "t", "abstract": "a",
            "media": [
                {"type": "image", "media-metadata": [{"url": "u1"}, {"url": "u2"}]},
                {"type": "image", "media-metadata": [{"url": "u3"}]}
            ]
        }"#;
        let article: PopularArticle = serde_json::from_str(json).unwrap();
        assert_eq!(article.summary, "a");
        assert_eq!(article.photos(), vec!["u1", "u2", "u3"]);
    }

    #[test]
    fn test_headline_deserializes() {
        let json = r#"{
            "status": "ok",
            "totalResults": 1,
            "articles": [{
                "source": {"id": null, "name": "Wire"},
                "author": null,
                "title": "Breaking",
                "description": "d",
                "url": "https://wire.example.com/1",
                "urlToImage": null,
                "publishedAt": "2024-03-01T10:00:00Z",
                "content": null
            }]
        }"#;
        let response: HeadlinesResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.articles.len(), 1);
        assert_eq!(response.articles[0].source.name, "Wire");
        assert!(response.articles[0].published_at.is_some());
    }
}
