//! [`Router`](crate::Router) matches requests against routes in the order the
//! routes were registered.
//!
//! ```rust
//! use scoperoute::{HandlerResult, Request, Response, Router};
//! use hyper::StatusCode;
//!
//! fn index(_: Request, res: &mut Response) -> HandlerResult {
//!     res.send("Hello, World!", StatusCode::OK);
//!     Ok(())
//! }
//!
//! fn user(req: Request, res: &mut Response) -> HandlerResult {
//!     res.send(format!("User {}", req.attribute("id").unwrap_or_default()), StatusCode::OK);
//!     Ok(())
//! }
//!
//! # fn main() -> Result<(), scoperoute::Error> {
//! let mut router = Router::new();
//! router.get("/", index, [])?;
//! router.group("api", [], |api| {
//!     api.get("users/{id:\\d+}", user, [])?;
//!     Ok(())
//! })?;
//!
//! let dispatched = router.dispatch("GET", "/api/users/42")?;
//! assert_eq!(dispatched.response.text(), "User 42");
//! # Ok(())
//! # }
//! ```
//!
//! A request is processed in a fixed order:
//! ```ignore
//!  maintenance?  -> maintenance handler, or 503
//!  unparsable    -> 400
//!  first route whose method and pattern match
//!      -> route parameters become request attributes
//!      -> middleware, in order; a halt ends the request
//!      -> handler
//!  no route      -> not-found handler, or 404
//!  any failure   -> error handler, or 500
//! ```
//!
//! There is no ranking by specificity: when two routes match the same
//! request, the one registered first wins and the other is never reached.
use crate::config::RouterConfig;
use crate::error::Error;
use crate::handler::{ErrorHandler, Flow, Handler, HandlerResult, SharedMiddleware, Target};
use crate::path;
use crate::pattern::{Params, Pattern};
use crate::request::Request;
use crate::response::Response;
use crate::route::{Route, ANY};
use crate::scope::{Scope, ScopeGuard};

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_util::future;
use hyper::service::Service;
use hyper::{Body, Method, StatusCode, Uri};
use serde_json::json;
use tracing::{debug, debug_span, error, trace, warn};

/// Router dispatches requests to handlers through registered routes.
pub struct Router {
    routes: Vec<Route>,
    pub(crate) scope: Scope,
    config: RouterConfig,
    error_handler: Option<Box<dyn ErrorHandler>>,
    not_found: Option<Box<dyn Handler>>,
    maintenance: Option<Box<dyn Handler>>,
}

impl Router {
    pub fn new() -> Self {
        Self::with_config(RouterConfig::default())
    }

    pub fn with_config(config: RouterConfig) -> Self {
        Self {
            routes: Vec::new(),
            scope: Scope::default(),
            config,
            error_handler: None,
            not_found: None,
            maintenance: None,
        }
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Registers a route for a set of methods.
    ///
    /// The path is resolved against the prefix of the enclosing groups and
    /// compiled right away, so a malformed template fails here rather than at
    /// request time. The route's middleware runs after the middleware of the
    /// enclosing scopes.
    /// ```rust
    /// use scoperoute::{HandlerResult, Request, Response, Router, Target};
    /// use hyper::{Method, StatusCode};
    ///
    /// fn noop(_: Request, _: &mut Response) -> HandlerResult {
    ///     Ok(())
    /// }
    ///
    /// let mut router = Router::new();
    /// let teapot = Target::handler(|_, res| {
    ///     res.send("I am a teapot!", StatusCode::IM_A_TEAPOT);
    ///     Ok(())
    /// });
    /// router.add([Method::GET, Method::HEAD], "/teapot", teapot, []).unwrap();
    ///
    /// assert!(router.add([Method::GET], "/{id}/{id}", noop, []).is_err());
    /// ```
    pub fn add(
        &mut self,
        methods: impl IntoIterator<Item = Method>,
        path: &str,
        target: impl Into<Target>,
        middleware: impl IntoIterator<Item = SharedMiddleware>,
    ) -> Result<&mut Self, Error> {
        let pattern = Pattern::compile(&self.scope.resolve(path))?;
        let methods: Vec<Method> = methods.into_iter().collect();
        let middleware = self.scope.chain(middleware);

        debug!(
            methods = ?methods,
            path = pattern.template(),
            middleware = middleware.len(),
            "registered route"
        );

        self.routes
            .push(Route::new(methods, pattern, middleware, target.into()));
        Ok(self)
    }

    /// Register a handler for `GET` requests
    pub fn get(
        &mut self,
        path: &str,
        target: impl Into<Target>,
        middleware: impl IntoIterator<Item = SharedMiddleware>,
    ) -> Result<&mut Self, Error> {
        self.add([Method::GET], path, target, middleware)
    }

    /// Register a handler for `POST` requests
    pub fn post(
        &mut self,
        path: &str,
        target: impl Into<Target>,
        middleware: impl IntoIterator<Item = SharedMiddleware>,
    ) -> Result<&mut Self, Error> {
        self.add([Method::POST], path, target, middleware)
    }

    /// Register a handler for `PUT` requests
    pub fn put(
        &mut self,
        path: &str,
        target: impl Into<Target>,
        middleware: impl IntoIterator<Item = SharedMiddleware>,
    ) -> Result<&mut Self, Error> {
        self.add([Method::PUT], path, target, middleware)
    }

    /// Register a handler for `PATCH` requests
    pub fn patch(
        &mut self,
        path: &str,
        target: impl Into<Target>,
        middleware: impl IntoIterator<Item = SharedMiddleware>,
    ) -> Result<&mut Self, Error> {
        self.add([Method::PATCH], path, target, middleware)
    }

    /// Register a handler for `DELETE` requests
    pub fn delete(
        &mut self,
        path: &str,
        target: impl Into<Target>,
        middleware: impl IntoIterator<Item = SharedMiddleware>,
    ) -> Result<&mut Self, Error> {
        self.add([Method::DELETE], path, target, middleware)
    }

    /// Register a handler for `OPTIONS` requests
    pub fn options(
        &mut self,
        path: &str,
        target: impl Into<Target>,
        middleware: impl IntoIterator<Item = SharedMiddleware>,
    ) -> Result<&mut Self, Error> {
        self.add([Method::OPTIONS], path, target, middleware)
    }

    /// Register one route for `GET`, `POST`, `PUT`, `PATCH`, `DELETE` and
    /// `OPTIONS` requests.
    pub fn any(
        &mut self,
        path: &str,
        target: impl Into<Target>,
        middleware: impl IntoIterator<Item = SharedMiddleware>,
    ) -> Result<&mut Self, Error> {
        self.add(ANY, path, target, middleware)
    }

    /// Registers the routes added by `body` under `prefix`.
    ///
    /// `middleware` runs for every route of the group, after the middleware
    /// of enclosing groups. Once `body` is done, whether it succeeded, failed
    /// or panicked, the router is back to the prefix and middleware it had
    /// before.
    /// ```rust
    /// use scoperoute::{HandlerResult, Request, Response, Router};
    ///
    /// fn list(_: Request, _: &mut Response) -> HandlerResult {
    ///     Ok(())
    /// }
    ///
    /// # fn main() -> Result<(), scoperoute::Error> {
    /// let mut router = Router::new();
    /// router.group("v1", [], |v1| {
    ///     v1.group("api", [], |api| {
    ///         api.get("users", list, [])?;
    ///         Ok(())
    ///     })?;
    ///     Ok(())
    /// })?;
    /// router.get("users", list, [])?;
    ///
    /// let paths: Vec<_> = router.routes().iter().map(|r| r.path()).collect();
    /// assert_eq!(paths, ["/v1/api/users", "/users"]);
    /// # Ok(())
    /// # }
    /// ```
    pub fn group<F>(
        &mut self,
        prefix: &str,
        middleware: impl IntoIterator<Item = SharedMiddleware>,
        body: F,
    ) -> Result<&mut Self, Error>
    where
        F: FnOnce(&mut Router) -> Result<(), Error>,
    {
        let scope = self.scope.group(prefix, middleware);
        self.enter(scope, body)
    }

    /// Registers the routes added by `body` with extra middleware, keeping
    /// the current prefix.
    ///
    /// This middleware runs before any group middleware, like middleware
    /// registered at the top level.
    pub fn middleware<F>(
        &mut self,
        middleware: impl IntoIterator<Item = SharedMiddleware>,
        body: F,
    ) -> Result<&mut Self, Error>
    where
        F: FnOnce(&mut Router) -> Result<(), Error>,
    {
        let scope = self.scope.middleware(middleware);
        self.enter(scope, body)
    }

    fn enter<F>(&mut self, scope: Scope, body: F) -> Result<&mut Self, Error>
    where
        F: FnOnce(&mut Router) -> Result<(), Error>,
    {
        let mut guard = ScopeGuard::enter(self, scope);
        let result = body(&mut guard);
        drop(guard);

        result?;
        Ok(self)
    }

    /// Configurable handler which is called when a failure is caught while
    /// routing, running middleware or running a handler.
    ///
    /// A failure of the error handler itself is returned from `dispatch`.
    pub fn set_error_handler<F>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(&Error, Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.error_handler = Some(Box::new(handler));
        self
    }

    /// Configurable handler which is called when no matching route is
    /// found.
    pub fn set_not_found_handler<F>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.not_found = Some(Box::new(handler));
        self
    }

    /// Configurable handler which answers every request while maintenance
    /// mode is enabled.
    ///
    /// A failure of the maintenance handler is returned from `dispatch`.
    pub fn set_maintenance_handler<F>(&mut self, handler: F) -> &mut Self
    where
        F: Fn(Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        self.maintenance = Some(Box::new(handler));
        self
    }

    pub fn enable_maintenance(&mut self, enabled: bool) -> &mut Self {
        self.config.maintenance = enabled;
        self
    }

    pub fn is_maintenance(&self) -> bool {
        self.config.maintenance
    }

    /// The registered routes, in registration order.
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Finds the route a request would be dispatched to.
    ///
    /// The path is cleaned before matching. Returns the first route that
    /// accepts `method` and whose pattern matches, with the captured
    /// parameters.
    /// ```rust
    /// use scoperoute::{HandlerResult, Request, Response, Router};
    /// use hyper::Method;
    ///
    /// fn show(_: Request, _: &mut Response) -> HandlerResult {
    ///     Ok(())
    /// }
    ///
    /// let mut router = Router::new();
    /// router.get("/order/{id:\\d+}", show, []).unwrap();
    ///
    /// let (route, params) = router.lookup(&Method::GET, "//order/42/").unwrap();
    /// assert_eq!(route.path(), "/order/{id:\\d+}");
    /// assert_eq!(params.get("id"), Some("42"));
    ///
    /// assert!(router.lookup(&Method::GET, "/order/abc").is_none());
    /// assert!(router.lookup(&Method::POST, "/order/42").is_none());
    /// ```
    pub fn lookup(&self, method: &Method, path: &str) -> Option<(&Route, Params)> {
        let path = path::clean(path);
        self.routes
            .iter()
            .filter(|route| route.allows(method))
            .find_map(|route| route.pattern().matches(&path).map(|params| (route, params)))
    }

    /// Dispatches a request given as a raw method token and request target.
    ///
    /// The method is case-insensitive and the target's path is cleaned. A
    /// method or target that cannot be parsed is answered with
    /// `400 Bad Request` without routing, unless maintenance mode is on: the
    /// maintenance branch answers every request, and gets a bare `GET /` in
    /// place of one it could not parse.
    pub fn dispatch(&self, method: &str, target: &str) -> Result<Dispatched, Error> {
        match Request::parse(method, target) {
            Ok(req) => self.dispatch_request(req),
            Err(err) if self.config.maintenance => {
                debug!(%err, "unparsable request during maintenance");
                self.dispatch_request(Request::new(Method::GET, Uri::from_static("/")))
            }
            Err(err) => {
                debug!(%err, "rejected request");
                let mut res = Response::new();
                res.json(
                    &json!({ "error": "Bad Request", "message": err.to_string() }),
                    StatusCode::BAD_REQUEST,
                )?;
                Ok(Dispatched::new(Outcome::Rejected, res))
            }
        }
    }

    /// Dispatches a request.
    ///
    /// Exactly one of the maintenance branch, a route, the not-found branch
    /// or the error branch produces the returned response. An `Err` means the
    /// maintenance or error handler itself failed.
    pub fn dispatch_request(&self, req: Request) -> Result<Dispatched, Error> {
        let span = debug_span!("dispatch", method = %req.method(), path = req.path());
        let _enter = span.enter();

        let mut res = Response::new();

        if self.config.maintenance {
            warn!("maintenance mode, request not routed");
            match &self.maintenance {
                Some(handler) => handler.handle(req, &mut res)?,
                None => {
                    res.json(
                        &json!({
                            "error": "Service Unavailable",
                            "message": "maintenance mode",
                        }),
                        StatusCode::SERVICE_UNAVAILABLE,
                    )?;
                }
            }
            return Ok(Dispatched::new(Outcome::Maintenance, res));
        }

        let outcome = match self.route(req, &mut res) {
            Ok(outcome) => outcome,
            Err(Failure { error, request }) => {
                error!(%error, "request failed");
                res.reset();
                match &self.error_handler {
                    Some(handler) => handler.handle(&error, request, &mut res)?,
                    None => {
                        res.json(
                            &json!({
                                "error": "Internal Server Error",
                                "message": error.to_string(),
                            }),
                            StatusCode::INTERNAL_SERVER_ERROR,
                        )?;
                    }
                }
                Outcome::Failed
            }
        };

        Ok(Dispatched::new(outcome, res))
    }

    fn route(&self, req: Request, res: &mut Response) -> Result<Outcome, Failure> {
        let (route, params) = match self.lookup(req.method(), req.path()) {
            Some(found) => found,
            None => return self.not_found(req, res),
        };

        trace!(route = route.path(), params = params.len(), "matched");
        let mut req = req.with_params(params);

        for middleware in route.middleware() {
            let snapshot = req.clone();
            match self.guard(|| Ok(middleware.handle(req, res)?)) {
                Ok(Flow::Next(next)) => req = next,
                Ok(Flow::Halt) => {
                    debug!(route = route.path(), "halted by middleware");
                    return Ok(Outcome::Halted);
                }
                Err(error) => return Err(Failure::new(error, snapshot)),
            }
        }

        let snapshot = req.clone();
        self.guard(|| route.target().invoke(req, res))
            .map_err(|error| Failure::new(error, snapshot))?;

        Ok(Outcome::Handled)
    }

    fn not_found(&self, req: Request, res: &mut Response) -> Result<Outcome, Failure> {
        debug!("no route matched");

        match &self.not_found {
            Some(handler) => {
                let snapshot = req.clone();
                self.guard(|| Ok(handler.handle(req, res)?))
                    .map_err(|error| Failure::new(error, snapshot))?;
            }
            None => {
                let body = json!({ "error": "Not Found", "uri": req.uri().to_string() });
                if let Err(error) = res.json(&body, StatusCode::NOT_FOUND) {
                    return Err(Failure::new(error, req));
                }
            }
        }

        Ok(Outcome::NotFound)
    }

    /// Runs `f`, turning a panic into [`Error::Panic`] unless panics are
    /// configured to propagate.
    fn guard<T>(&self, f: impl FnOnce() -> Result<T, Error>) -> Result<T, Error> {
        if !self.config.catch_panics {
            return f();
        }

        panic::catch_unwind(AssertUnwindSafe(f))
            .unwrap_or_else(|payload| Err(Error::Panic(panic_message(payload.as_ref()))))
    }
}

/// The default router configuration
impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.routes)
            .field("config", &self.config)
            .field("error_handler", &self.error_handler.is_some())
            .field("not_found", &self.not_found.is_some())
            .field("maintenance", &self.maintenance.is_some())
            .finish()
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "Box<dyn Any>".to_owned()
    }
}

/// A failure caught at the dispatch boundary, with the request as it was
/// handed to the step that failed.
struct Failure {
    error: Error,
    request: Request,
}

impl Failure {
    fn new(error: Error, request: Request) -> Self {
        Self { error, request }
    }
}

/// Which branch of the router produced a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Maintenance mode answered the request.
    Maintenance,
    /// A route's handler ran to completion.
    Handled,
    /// A middleware stopped the request before the handler.
    Halted,
    /// No route matched.
    NotFound,
    /// A failure was caught and answered by the error branch.
    Failed,
    /// The method or request target could not be parsed.
    Rejected,
}

/// A finished request. Nothing else runs for the request once this is
/// returned.
#[derive(Debug)]
#[must_use]
pub struct Dispatched {
    pub outcome: Outcome,
    pub response: Response,
}

impl Dispatched {
    fn new(outcome: Outcome, response: Response) -> Self {
        Self { outcome, response }
    }

    pub fn into_hyper(self) -> hyper::Response<Body> {
        self.response.into_hyper()
    }
}

#[doc(hidden)]
pub struct MakeRouterService(RouterService);

impl<T> Service<T> for MakeRouterService {
    type Response = RouterService;
    type Error = hyper::Error;
    type Future = future::Ready<Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, _: T) -> Self::Future {
        let service = self.0.clone();
        future::ok(service)
    }
}

#[doc(hidden)]
#[derive(Clone)]
pub struct RouterService(Arc<Router>);

impl RouterService {
    fn new(router: Router) -> Self {
        RouterService(Arc::new(router))
    }
}

impl Service<hyper::Request<Body>> for RouterService {
    type Response = hyper::Response<Body>;
    type Error = hyper::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: hyper::Request<Body>) -> Self::Future {
        let router = Arc::clone(&self.0);
        Box::pin(async move { router.serve(req).await })
    }
}

impl Router {
    /// Converts the `Router` into a `Service` which you can serve directly with `Hyper`.
    ///
    /// Routes can no longer be registered once the router is shared between
    /// connections.
    /// ```rust,no_run
    /// # use scoperoute::Router;
    /// # async fn run() -> Result<(), Box<dyn std::error::Error>> {
    /// // Our router...
    /// let router = Router::default();
    ///
    /// // Convert it into a service...
    /// let service = router.into_service();
    ///
    /// // Serve with hyper
    /// hyper::Server::bind(&([127, 0, 0, 1], 3030).into())
    ///     .serve(service)
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn into_service(self) -> MakeRouterService {
        MakeRouterService(RouterService::new(self))
    }

    /// Buffers a hyper request, dispatches it and converts the response.
    ///
    /// If the maintenance or error handler fails, the failure is logged and
    /// answered with a bare `500 Internal Server Error`.
    pub async fn serve(&self, req: hyper::Request<Body>) -> hyper::Result<hyper::Response<Body>> {
        let req = Request::from_hyper(req).await?;

        match self.dispatch_request(req) {
            Ok(dispatched) => Ok(dispatched.into_hyper()),
            Err(err) => {
                error!(%err, "unhandled dispatch failure");
                let mut res = hyper::Response::new(Body::from("Internal Server Error"));
                *res.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                Ok(res)
            }
        }
    }
}
