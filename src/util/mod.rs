//! Utility functions shared by the feed, digest and email layers.
//!
//! - **Text processing**: HTML-to-text normalization and control character stripping
//! - **URL validation**: scheme and shape checks for configured feed URLs

mod text;
mod url_validator;

pub use text::{collapse_whitespace, html_to_text, strip_control_chars};
pub use url_validator::{validate_feed_url, UrlValidationError};
