//! The request pipeline.
//!
//! ```text
//! RESOLVING -> RUNNING_BEFORE_AND_HANDLER -> RUNNING_AFTER -> FINALIZING
//!     |                                                          ^
//!     +------------------------ no route ------------------------+
//! ```

use std::any::Any;
use std::panic::AssertUnwindSafe;
use futures::FutureExt;
use log::{debug, error, warn};

use crate::parser::HttpRequest;
use crate::pipeline::context::RequestContext;
use crate::pipeline::error::Error;
use crate::pipeline::flow::{Flow, Reply};
use crate::pipeline::handler::{BoxFuture, ErrorHandler, HandlerError, Route};
use crate::pipeline::render::render_reply;
use crate::router::RouteTable;
use crate::server::{HttpResponse, StatusCode};

/// How a pipeline ended, before it is turned into a response.
#[derive(Debug)]
pub enum Outcome {
    /// Some step answered. A carried error is dropped in favour of the answer.
    Reply(Reply),
    /// Nothing answered and an error is still carried.
    Failed(HandlerError),
    /// Nothing answered and nothing failed.
    Empty,
}

/// Resolves requests against a frozen route table and runs their pipelines.
///
/// The dispatcher holds no per-request state, so one instance serves every
/// connection concurrently.
pub struct Dispatcher {
    routes: RouteTable<Route>,
    error_handler: Option<Box<dyn ErrorHandler>>,
    strict_matching: bool,
}

impl Dispatcher {
    pub fn new(routes: RouteTable<Route>, strict_matching: bool) -> Self {
        Self {
            routes,
            error_handler: None,
            strict_matching,
        }
    }

    /// Install the server-wide error handler, tried after a route's own.
    pub fn with_error_handler(mut self, handler: Box<dyn ErrorHandler>) -> Self {
        self.error_handler = Some(handler);
        self
    }

    pub fn routes(&self) -> &RouteTable<Route> {
        &self.routes
    }

    pub fn strict_matching(&self) -> bool {
        self.strict_matching
    }

    /// Produce the response for one request. Never fails: every path ends in a response.
    pub async fn dispatch(&self, request: HttpRequest) -> HttpResponse {
        let Some(found) = self.routes.resolve(request.method, &request.path, self.strict_matching) else {
            debug!("No route for {method} {path}", method = request.method, path = request.path);
            return HttpResponse::not_found();
        };

        let params = found.params(&request.path, self.strict_matching);
        let mut context = RequestContext::from_request(request, params);

        let outcome = Self::run(found.route, &mut context).await;
        self.finalize(found.route, &mut context, outcome).await
    }

    /// Run a route's before queue and after queue against `context`.
    pub async fn run(route: &Route, context: &mut RequestContext) -> Outcome {
        let mut reply: Option<Reply> = None;
        let mut carried: Option<HandlerError> = None;

        let queue = route
            .before
            .iter()
            .chain(std::iter::once(&route.handler));

        for step in queue {
            let result = guard(step.call(context)).await;
            match result {
                Ok(Flow::Next) => continue,
                Ok(Flow::Reply(answer)) => {
                    reply = Some(answer);
                    break;
                }
                Ok(Flow::Stop) => break,
                Err(e) => {
                    carried = Some(e);
                    break;
                }
            }
        }

        for interceptor in &route.after {
            let result = guard(interceptor.call(context, carried.as_ref())).await;
            match result {
                Ok(Flow::Next) => {}
                Ok(Flow::Reply(answer)) => {
                    if reply.is_none() {
                        reply = Some(answer);
                    }
                }
                Ok(Flow::Stop) => break,
                Err(e) => {
                    warn!("After interceptor failed on {path}: {e}", path = context.path);
                    carried = Some(e);
                }
            }
        }

        match (reply, carried) {
            (Some(answer), _) => Outcome::Reply(answer),
            (None, Some(e)) => Outcome::Failed(e),
            (None, None) => Outcome::Empty,
        }
    }

    /// Reduce an outcome to exactly one response.
    pub async fn finalize(&self, route: &Route, context: &mut RequestContext, outcome: Outcome) -> HttpResponse {
        match outcome {
            Outcome::Reply(reply) => render_reply(reply),
            Outcome::Empty => HttpResponse::new(StatusCode::NoContent),
            Outcome::Failed(e) => self.recover(route, context, e).await,
        }
    }

    async fn recover(&self, route: &Route, context: &mut RequestContext, e: HandlerError) -> HttpResponse {
        error!("{method} {path} failed: {e}", method = context.method, path = context.path);

        let handlers = route.error_handler.iter().chain(self.error_handler.iter());
        for handler in handlers {
            let result = guard(handler.handle(context, &e)).await;
            match result {
                Ok(reply) => return render_reply(reply),
                Err(handler_error) => warn!("Error handler failed, falling through: {handler_error}"),
            }
        }

        HttpResponse::internal_error(&e.to_string())
    }
}

/// Await a step, turning a panic into an ordinary error.
async fn guard<T>(step: BoxFuture<'_, Result<T, HandlerError>>) -> Result<T, HandlerError> {
    match AssertUnwindSafe(step).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => Err(Error::Panicked(panic_message(payload.as_ref())).into()),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
