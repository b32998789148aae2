//! Turning replies into HTTP responses.

use serde_json::Value;

use crate::pipeline::flow::Reply;
use crate::server::{HttpResponse, StatusCode};

/// Something that renders to a markup document.
pub trait Render: Send + Sync {
    /// Render the full document body.
    fn render(&self) -> String;

    fn content_type(&self) -> &str {
        "text/html; charset=utf-8"
    }
}

/// Markup that has already been rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Markup(pub String);

impl Markup {
    pub fn new(html: impl Into<String>) -> Self {
        Markup(html.into())
    }
}

impl Render for Markup {
    fn render(&self) -> String {
        self.0.clone()
    }
}

/// Convert a reply into the response sent on the wire.
///
/// Raw responses pass through untouched. Structured values are written as
/// text: strings verbatim, anything else as compact JSON. The content type
/// is JSON when the text is wrapped in braces and plain text otherwise.
pub fn render_reply(reply: Reply) -> HttpResponse {
    match reply {
        Reply::Raw(response) => response,
        Reply::Renderable(node) => HttpResponse::new(StatusCode::Ok)
            .with_content_type(node.content_type())
            .with_body_string(node.render()),
        Reply::Structured(value) => {
            let body = match value {
                Value::String(text) => text,
                other => other.to_string(),
            };
            let content_type = if body.starts_with('{') && body.ends_with('}') {
                "application/json"
            } else {
                "text/plain; charset=utf-8"
            };
            HttpResponse::new(StatusCode::Ok)
                .with_content_type(content_type)
                .with_body_string(body)
        }
    }
}
