use std::fmt;
use std::sync::Arc;

use crate::api::ApiError;

/// Outcome of one query in a fan-out.
#[derive(Debug)]
pub enum QueryState<T> {
    Loading,
    Failed(Arc<ApiError>),
    Ready(T),
}

// Manual impl: `ApiError` is not `Clone`, but it sits behind an `Arc`.
impl<T: Clone> Clone for QueryState<T> {
    fn clone(&self) -> Self {
        match self {
            QueryState::Loading => QueryState::Loading,
            QueryState::Failed(e) => QueryState::Failed(Arc::clone(e)),
            QueryState::Ready(v) => QueryState::Ready(v.clone()),
        }
    }
}

impl<T> QueryState<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, QueryState::Loading)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, QueryState::Failed(_))
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            QueryState::Ready(v) => Some(v),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&Arc<ApiError>> {
        match self {
            QueryState::Failed(e) => Some(e),
            _ => None,
        }
    }
}

impl<T> From<Result<T, ApiError>> for QueryState<T> {
    fn from(result: Result<T, ApiError>) -> Self {
        match result {
            Ok(v) => QueryState::Ready(v),
            Err(e) => QueryState::Failed(Arc::new(e)),
        }
    }
}

/// Cache identity of a query, e.g. `articles:categories:dmoz/Business:2`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(parts.into_iter().map(Into::into).collect())
    }

    pub fn parts(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join(":"))
    }
}
