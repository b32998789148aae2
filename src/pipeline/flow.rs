//! What a pipeline step hands back to the dispatcher.

use std::fmt;
use serde::Serialize;
use serde_json::Value;

use crate::pipeline::render::{Markup, Render};
use crate::server::HttpResponse;

/// The result of one before interceptor, handler, or after interceptor.
#[derive(Debug)]
pub enum Flow {
    /// No answer; move on to the next step in the queue.
    Next,
    /// An answer. In the before queue this ends the queue.
    Reply(Reply),
    /// End the current queue without supplying an answer.
    Stop,
}

impl Flow {
    /// Answer with anything that converts into a [`Reply`].
    pub fn reply(reply: impl Into<Reply>) -> Self {
        Flow::Reply(reply.into())
    }

    /// Answer with a serialized value.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        Reply::json(value).map(Flow::Reply)
    }
}

/// A handler's answer, decided once when the handler returns.
pub enum Reply {
    /// A finished response, sent exactly as built.
    Raw(HttpResponse),
    /// A value rendered as text or JSON.
    Structured(Value),
    /// Markup produced by a renderer.
    Renderable(Box<dyn Render>),
}

impl Reply {
    /// Serialize any value into a structured reply.
    ///
    /// Fields skipped by the value's `Serialize` impl are left out.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_value(value).map(Reply::Structured)
    }

    /// Wrap anything renderable.
    pub fn render(node: impl Render + 'static) -> Self {
        Reply::Renderable(Box::new(node))
    }
}

impl fmt::Debug for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Raw(response) => f.debug_tuple("Raw").field(response).finish(),
            Reply::Structured(value) => f.debug_tuple("Structured").field(value).finish(),
            Reply::Renderable(node) => f
                .debug_tuple("Renderable")
                .field(&node.content_type())
                .finish(),
        }
    }
}

impl From<HttpResponse> for Reply {
    fn from(response: HttpResponse) -> Self {
        Reply::Raw(response)
    }
}

impl From<Value> for Reply {
    fn from(value: Value) -> Self {
        Reply::Structured(value)
    }
}

impl From<&str> for Reply {
    fn from(text: &str) -> Self {
        Reply::Structured(Value::String(text.to_string()))
    }
}

impl From<String> for Reply {
    fn from(text: String) -> Self {
        Reply::Structured(Value::String(text))
    }
}

impl From<Markup> for Reply {
    fn from(markup: Markup) -> Self {
        Reply::render(markup)
    }
}
