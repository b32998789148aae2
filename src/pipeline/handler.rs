//! Handler, interceptor and error handler traits, and the route descriptor
//! that bundles them.

use std::future::Future;
use std::pin::Pin;

use crate::pipeline::context::RequestContext;
use crate::pipeline::flow::{Flow, Reply};

/// A boxed future borrowing from the request it serves.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Any error raised by application code.
pub type HandlerError = anyhow::Error;

/// What a handler or interceptor produces.
pub type HandlerResult = Result<Flow, HandlerError>;

/// A before interceptor or a route's primary handler.
///
/// Both run in the same queue and are interchangeable: the first step to
/// return [`Flow::Reply`], [`Flow::Stop`] or an error ends the queue.
pub trait Handler: Send + Sync {
    fn call<'a>(&'a self, request: &'a mut RequestContext) -> BoxFuture<'a, HandlerResult>;
}

/// An after interceptor.
///
/// Receives the error carried out of the before queue, or raised by an
/// earlier after interceptor, if there is one.
pub trait AfterHandler: Send + Sync {
    fn call<'a>(
        &'a self,
        request: &'a mut RequestContext,
        error: Option<&'a HandlerError>,
    ) -> BoxFuture<'a, HandlerResult>;
}

/// Turns an unanswered error into a reply.
pub trait ErrorHandler: Send + Sync {
    fn handle<'a>(
        &'a self,
        request: &'a mut RequestContext,
        error: &'a HandlerError,
    ) -> BoxFuture<'a, Result<Reply, HandlerError>>;
}

struct FnHandler<F>(F);

impl<F, Fut> Handler for FnHandler<F>
where
    F: Fn(&mut RequestContext) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call<'a>(&'a self, request: &'a mut RequestContext) -> BoxFuture<'a, HandlerResult> {
        // Invoke inside the future so a panicking closure is caught with it.
        Box::pin(async move { (self.0)(request).await })
    }
}

struct FnAfterHandler<F>(F);

impl<F, Fut> AfterHandler for FnAfterHandler<F>
where
    F: Fn(&mut RequestContext, Option<&HandlerError>) -> Fut + Send + Sync,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call<'a>(
        &'a self,
        request: &'a mut RequestContext,
        error: Option<&'a HandlerError>,
    ) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move { (self.0)(request, error).await })
    }
}

struct BorrowingHandler<F>(F);

impl<F> Handler for BorrowingHandler<F>
where
    F: for<'a> Fn(&'a mut RequestContext) -> BoxFuture<'a, HandlerResult> + Send + Sync,
{
    fn call<'a>(&'a self, request: &'a mut RequestContext) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move { (self.0)(request).await })
    }
}

struct BorrowingAfterHandler<F>(F);

impl<F> AfterHandler for BorrowingAfterHandler<F>
where
    F: for<'a> Fn(&'a mut RequestContext, Option<&'a HandlerError>) -> BoxFuture<'a, HandlerResult> + Send + Sync,
{
    fn call<'a>(
        &'a self,
        request: &'a mut RequestContext,
        error: Option<&'a HandlerError>,
    ) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move { (self.0)(request, error).await })
    }
}

struct FnErrorHandler<F>(F);

impl<F, Fut> ErrorHandler for FnErrorHandler<F>
where
    F: Fn(&mut RequestContext, &HandlerError) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Reply, HandlerError>> + Send + 'static,
{
    fn handle<'a>(
        &'a self,
        request: &'a mut RequestContext,
        error: &'a HandlerError,
    ) -> BoxFuture<'a, Result<Reply, HandlerError>> {
        Box::pin(async move { (self.0)(request, error).await })
    }
}

/// Wrap a closure as a boxed [`ErrorHandler`].
pub(crate) fn error_handler_fn<F, Fut>(handler: F) -> Box<dyn ErrorHandler>
where
    F: Fn(&mut RequestContext, &HandlerError) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Reply, HandlerError>> + Send + 'static,
{
    Box::new(FnErrorHandler(handler))
}

/// A route's handler together with its interceptors.
///
/// Interceptors are attached while the route is built; once registered the
/// route is never modified.
pub struct Route {
    pub(crate) handler: Box<dyn Handler>,
    pub(crate) before: Vec<Box<dyn Handler>>,
    pub(crate) after: Vec<Box<dyn AfterHandler>>,
    pub(crate) error_handler: Option<Box<dyn ErrorHandler>>,
}

impl Route {
    /// A route around a handler closure.
    pub fn new<F, Fut>(handler: F) -> Self
    where
        F: Fn(&mut RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        Self::from_handler(FnHandler(handler))
    }

    /// A route around a [`Handler`] implementation.
    pub fn from_handler(handler: impl Handler + 'static) -> Self {
        Self {
            handler: Box::new(handler),
            before: Vec::new(),
            after: Vec::new(),
            error_handler: None,
        }
    }

    /// Append a before interceptor.
    ///
    /// The returned future cannot borrow the request, so reads and writes
    /// happen before it is built. Use [`Route::before_boxed`] to touch the
    /// request after an `.await`.
    pub fn before<F, Fut>(self, interceptor: F) -> Self
    where
        F: Fn(&mut RequestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.before_handler(FnHandler(interceptor))
    }

    /// Append a before interceptor whose future borrows the request.
    ///
    /// ```
    /// use microroute::{Flow, RequestContext, Route};
    ///
    /// let route = Route::new(|_req: &mut RequestContext| async { Ok(Flow::reply("ok")) })
    ///     .before_boxed(|req| {
    ///         Box::pin(async move {
    ///             tokio::task::yield_now().await;
    ///             req.set("checked", true);
    ///             Ok(Flow::Next)
    ///         })
    ///     });
    /// assert_eq!(route.before_count(), 1);
    /// ```
    pub fn before_boxed<F>(self, interceptor: F) -> Self
    where
        F: for<'a> Fn(&'a mut RequestContext) -> BoxFuture<'a, HandlerResult> + Send + Sync + 'static,
    {
        self.before_handler(BorrowingHandler(interceptor))
    }

    pub fn before_handler(mut self, interceptor: impl Handler + 'static) -> Self {
        self.before.push(Box::new(interceptor));
        self
    }

    /// Append an after interceptor.
    ///
    /// Like [`Route::before`], the future cannot borrow the request; see
    /// [`Route::after_boxed`].
    pub fn after<F, Fut>(self, interceptor: F) -> Self
    where
        F: Fn(&mut RequestContext, Option<&HandlerError>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.after_handler(FnAfterHandler(interceptor))
    }

    /// Append an after interceptor whose future borrows the request and error.
    pub fn after_boxed<F>(self, interceptor: F) -> Self
    where
        F: for<'a> Fn(&'a mut RequestContext, Option<&'a HandlerError>) -> BoxFuture<'a, HandlerResult>
            + Send
            + Sync
            + 'static,
    {
        self.after_handler(BorrowingAfterHandler(interceptor))
    }

    pub fn after_handler(mut self, interceptor: impl AfterHandler + 'static) -> Self {
        self.after.push(Box::new(interceptor));
        self
    }

    /// Set the route's own error handler, tried before the server-wide one.
    pub fn on_error<F, Fut>(self, handler: F) -> Self
    where
        F: Fn(&mut RequestContext, &HandlerError) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Reply, HandlerError>> + Send + 'static,
    {
        self.error_handler(FnErrorHandler(handler))
    }

    pub fn error_handler(mut self, handler: impl ErrorHandler + 'static) -> Self {
        self.error_handler = Some(Box::new(handler));
        self
    }

    pub fn before_count(&self) -> usize {
        self.before.len()
    }

    pub fn after_count(&self) -> usize {
        self.after.len()
    }
}
