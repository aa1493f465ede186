//! Utility functions for common operations.
//!
//! - **Text**: relative timestamps, category label extraction, suggestion
//!   grouping, and terminal-safe truncation/sanitizing
//! - **URL validation**: base URL checks that keep API keys off plain http

mod text;
mod url_validator;

pub use text::{
    display_width, extract_category_label, strip_control_chars, time_ago, truncate_to_width,
    unique_by_uri_group, uri_group,
};
pub use url_validator::{validate_base_url, BaseUrlError};
