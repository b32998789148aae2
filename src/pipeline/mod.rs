//! Request dispatch.
//!
//! A resolved route runs as two queues. The first is the route's before
//! interceptors followed by its handler; it halts on the first reply, stop or
//! error. The second is the route's after interceptors, which always run and
//! may supply a reply if none exists yet. Whatever is left is reduced to one
//! HTTP response.

mod context;
mod dispatcher;
mod error;
mod flow;
mod handler;
mod render;

pub use context::RequestContext;
pub use dispatcher::{Dispatcher, Outcome};
pub use error::Error;
pub use flow::{Flow, Reply};
pub use handler::{AfterHandler, BoxFuture, ErrorHandler, Handler, HandlerError, HandlerResult, Route};
pub use render::{Markup, Render, render_reply};

pub(crate) use handler::error_handler_fn;
