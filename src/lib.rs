//! newsdeck: a terminal news aggregator.
//!
//! Articles come from Event Registry, top headlines from NewsAPI.org and
//! most-popular lists from the New York Times. The core of the crate is
//! [`aggregate`], which turns a user's followed sources, categories and
//! authors into concurrent article queries and merges their results.

pub mod aggregate;
pub mod api;
pub mod config;
pub mod preferences;
pub mod search;
pub mod util;
