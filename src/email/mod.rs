//! Digest delivery: rendering entries into email bodies and sending them.
//!
//! - `render` - HTML (askama template) and plain-text bodies
//! - `send` - SMTP delivery via `lettre`

mod render;
mod send;

pub use render::{render_html, render_text, RenderError};
pub use send::{build_message, send_digest, SendError};
