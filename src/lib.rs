//! # ScopeRoute
//!
//! ScopeRoute is a small HTTP request router built around an ordered route
//! table.
//!
//! Routes are tried in the order they were registered and the first one whose
//! method and pattern match handles the request. There are no priority rules
//! to learn: if `/users/new` must win over `/users/{id}`, register it first.
//!
//! ## Features
//!
//! **Parameters with constraints:** give a path segment a name and the router
//! hands the value to you as a request attribute. A parameter can be optional,
//! and can be restricted with a regular expression: `/order/{id:\d+}` only
//! matches numeric ids.
//!
//! **Groups:** routes registered inside a group share a path prefix and a set
//! of middleware. Groups nest, and the prefix and middleware of a group end
//! with it, even when its body fails or panics.
//!
//! **Middleware pipelines:** every route carries a chain of middleware that
//! runs before its handler. A middleware can replace the request seen by the
//! rest of the chain, or halt the request after writing its own response.
//!
//! **Controllers:** besides functions and closures, a route can target a named
//! action on a controller type that is built fresh for every request.
//!
//! **One response per request:** maintenance mode, not-found and failures all
//! have default responses that can be replaced with your own handlers. A
//! failure anywhere between routing and the handler, including a panic, ends
//! up in the error handler.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use scoperoute::{from_fn, Flow, HandlerResult, Request, Response, Router};
//! use hyper::StatusCode;
//!
//! fn index(_: Request, res: &mut Response) -> HandlerResult {
//!     res.send("Hello, World!", StatusCode::OK);
//!     Ok(())
//! }
//!
//! fn post(req: Request, res: &mut Response) -> HandlerResult {
//!     res.json(
//!         &serde_json::json!({
//!             "slug": req.attribute("slug"),
//!             "page": req.attribute("page").unwrap_or("1"),
//!         }),
//!         StatusCode::OK,
//!     )?;
//!     Ok(())
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let auth = from_fn(|req, res| {
//!         if req.has_header("authorization") {
//!             return Ok(Flow::Next(req));
//!         }
//!         res.json(&serde_json::json!({ "error": "Unauthorized" }), StatusCode::UNAUTHORIZED)?;
//!         Ok(Flow::Halt)
//!     });
//!
//!     let mut router = Router::new();
//!     router.get("/", index, [])?;
//!     router.get("/post/{slug}/{?page:\\d+}", post, [])?;
//!     router.group("admin", [auth], |admin| {
//!         admin.get("/", index, [])?;
//!         Ok(())
//!     })?;
//!
//!     hyper::Server::bind(&([127, 0, 0, 1], 3000).into())
//!         .serve(router.into_service())
//!         .await?;
//!     Ok(())
//! }
//! ```
//!
//! ### Parameters
//!
//! ```ignore
//!  Syntax          Type
//!  {name}          required, matches one or more characters other than '/'
//!  {?name}         optional, absent from the attributes when not given
//!  {name:regex}    required, restricted to `regex`
//! ```
//!
//! ```ignore
//!  Template: /post/{slug}/{?page}
//!
//!   /post/hello             match: slug="hello"
//!   /post/hello/2           match: slug="hello", page="2"
//!   /post                   no match
//! ```
//!
//! Template and request paths are both cleaned before matching: doubled and
//! trailing slashes are dropped, so `/post//hello/` matches like `/post/hello`.
//!
//! ### Not Found Handler
//!
//! Requests that match no route get a JSON `404` by default. Set your own
//! handler to change that:
//!
//! ```rust
//! use scoperoute::Router;
//! use hyper::StatusCode;
//!
//! let mut router = Router::new();
//! router.set_not_found_handler(|req, res| {
//!     res.send(format!("nothing at {}", req.path()), StatusCode::NOT_FOUND);
//!     Ok(())
//! });
//!
//! let dispatched = router.dispatch("GET", "/missing").unwrap();
//! assert_eq!(dispatched.response.text(), "nothing at /missing");
//! ```
//!
//! ### Maintenance
//!
//! ```rust
//! use scoperoute::{Outcome, Router, RouterConfig};
//! use hyper::StatusCode;
//!
//! let config = RouterConfig::from_toml_str("maintenance = true").unwrap();
//! let router = Router::with_config(config);
//!
//! let dispatched = router.dispatch("GET", "/").unwrap();
//! assert_eq!(dispatched.outcome, Outcome::Maintenance);
//! assert_eq!(dispatched.response.status(), StatusCode::SERVICE_UNAVAILABLE);
//! ```

#![forbid(unsafe_code)]

pub mod path;

mod config;
mod error;
mod handler;
mod pattern;
mod request;
mod response;
mod route;
mod scope;

#[doc(hidden)]
pub mod router;

#[doc(inline)]
pub use router::{Dispatched, Outcome, Router};

pub use config::RouterConfig;
pub use error::{BoxError, Error};
pub use handler::{
    from_fn, Action, Controller, ControllerTarget, ErrorHandler, Flow, Handler, HandlerResult,
    Middleware, SharedMiddleware, Target,
};
pub use pattern::{Param, Params, Pattern};
pub use request::Request;
pub use response::Response;
pub use route::{Route, ANY};
