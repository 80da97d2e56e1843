//! Handlers, middleware and controllers.

use std::any;
use std::fmt;
use std::sync::Arc;

use crate::error::{BoxError, Error};
use crate::request::Request;
use crate::response::Response;

/// The result of a handler or controller action.
pub type HandlerResult = Result<(), BoxError>;

/// Represents a request handler.
///
/// This trait is implemented for functions and closures that take the
/// request and a mutable response:
/// ```rust
/// # use scoperoute::{HandlerResult, Request, Response};
/// use hyper::StatusCode;
///
/// fn hello(req: Request, res: &mut Response) -> HandlerResult {
///     res.send(format!("Hello, {}", req.attribute("user").unwrap_or("stranger")), StatusCode::OK);
///     Ok(())
/// }
/// ```
pub trait Handler: Send + Sync {
    fn handle(&self, req: Request, res: &mut Response) -> HandlerResult;
}

impl<F> Handler for F
where
    F: Fn(Request, &mut Response) -> HandlerResult + Send + Sync,
{
    fn handle(&self, req: Request, res: &mut Response) -> HandlerResult {
        self(req, res)
    }
}

/// What a middleware wants the router to do next.
#[derive(Debug)]
pub enum Flow {
    /// Continue the pipeline with this request.
    Next(Request),
    /// Stop here. The response written so far is the final response.
    Halt,
}

/// A step of the pipeline that runs before the handler.
///
/// ```rust
/// use scoperoute::{from_fn, Flow};
/// use hyper::StatusCode;
///
/// let auth = from_fn(|req, res| {
///     if req.has_header("authorization") {
///         return Ok(Flow::Next(req.with_attribute("authenticated", "yes")));
///     }
///     res.send("Unauthorized", StatusCode::UNAUTHORIZED);
///     Ok(Flow::Halt)
/// });
/// ```
pub trait Middleware: Send + Sync {
    fn handle(&self, req: Request, res: &mut Response) -> Result<Flow, BoxError>;
}

impl<F> Middleware for F
where
    F: Fn(Request, &mut Response) -> Result<Flow, BoxError> + Send + Sync,
{
    fn handle(&self, req: Request, res: &mut Response) -> Result<Flow, BoxError> {
        self(req, res)
    }
}

/// Middleware as stored by the router and shared between routes.
pub type SharedMiddleware = Arc<dyn Middleware>;

/// Wraps a closure into [`SharedMiddleware`].
pub fn from_fn<F>(f: F) -> SharedMiddleware
where
    F: Fn(Request, &mut Response) -> Result<Flow, BoxError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Handles failures caught while dispatching.
pub trait ErrorHandler: Send + Sync {
    fn handle(&self, err: &Error, req: Request, res: &mut Response) -> HandlerResult;
}

impl<F> ErrorHandler for F
where
    F: Fn(&Error, Request, &mut Response) -> HandlerResult + Send + Sync,
{
    fn handle(&self, err: &Error, req: Request, res: &mut Response) -> HandlerResult {
        self(err, req, res)
    }
}

/// A controller action, looked up by name.
pub type Action<C> = fn(&C, Request, &mut Response) -> HandlerResult;

/// A type whose methods serve as handlers.
///
/// A fresh instance is built with [`Default`] for every request it handles.
/// The router finds the method to call through [`Controller::action`]; a name
/// with no action is reported as [`Error::MissingAction`].
///
/// ```rust
/// use scoperoute::{Action, Controller, HandlerResult, Request, Response};
/// use hyper::StatusCode;
///
/// #[derive(Default)]
/// struct Users;
///
/// impl Users {
///     fn index(&self, _: Request, res: &mut Response) -> HandlerResult {
///         res.send("all users", StatusCode::OK);
///         Ok(())
///     }
/// }
///
/// impl Controller for Users {
///     fn action(name: &str) -> Option<Action<Self>> {
///         match name {
///             "index" => Some(Self::index),
///             _ => None,
///         }
///     }
/// }
/// ```
pub trait Controller: Default + 'static {
    fn action(name: &str) -> Option<Action<Self>>;

    /// The name used in error messages.
    fn name() -> &'static str {
        any::type_name::<Self>()
    }
}

/// What a route invokes once its middleware has passed.
pub enum Target {
    /// A handler called directly.
    Direct(Box<dyn Handler>),
    /// A controller type and the name of the action to call on it.
    Controller(ControllerTarget),
}

impl Target {
    /// Targets a handler function or closure.
    ///
    /// Route registration accepts anything convertible into a `Target`; this
    /// constructor exists so closures get their argument types inferred.
    pub fn handler<F>(f: F) -> Self
    where
        F: Fn(Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
    {
        Target::Direct(Box::new(f))
    }

    /// Targets the `action` method of controller `C`.
    ///
    /// The action is resolved when a request is dispatched, not when the
    /// route is registered.
    pub fn controller<C: Controller>(action: &str) -> Self {
        Target::Controller(ControllerTarget {
            controller: C::name(),
            action: action.to_owned(),
            invoke: invoke_controller::<C>,
        })
    }

    pub(crate) fn invoke(&self, req: Request, res: &mut Response) -> Result<(), Error> {
        match self {
            Target::Direct(handler) => handler.handle(req, res).map_err(Error::from),
            Target::Controller(target) => (target.invoke)(&target.action, req, res)
                .unwrap_or_else(|| {
                    Err(Error::MissingAction {
                        action: target.action.clone(),
                        controller: target.controller,
                    })
                }),
        }
    }
}

impl<F> From<F> for Target
where
    F: Fn(Request, &mut Response) -> HandlerResult + Send + Sync + 'static,
{
    fn from(f: F) -> Self {
        Target::handler(f)
    }
}

impl fmt::Debug for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Direct(_) => f.write_str("Direct"),
            Target::Controller(target) => write!(f, "{}@{}", target.controller, target.action),
        }
    }
}

/// A controller type erased behind its invoker.
pub struct ControllerTarget {
    controller: &'static str,
    action: String,
    invoke: fn(&str, Request, &mut Response) -> Option<Result<(), Error>>,
}

impl ControllerTarget {
    pub fn controller(&self) -> &'static str {
        self.controller
    }

    pub fn action(&self) -> &str {
        &self.action
    }
}

fn invoke_controller<C: Controller>(
    action: &str,
    req: Request,
    res: &mut Response,
) -> Option<Result<(), Error>> {
    let instance = C::default();
    let action = C::action(action)?;
    Some(action(&instance, req, res).map_err(Error::from))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::StatusCode;

    #[derive(Default)]
    struct Greeter {
        greeting: &'static str,
    }

    impl Greeter {
        fn hello(&self, req: Request, res: &mut Response) -> HandlerResult {
            let name = req.attribute("name").unwrap_or("world");
            res.send(format!("{}, {}", self.greeting, name), StatusCode::OK);
            Ok(())
        }

        fn fail(&self, _: Request, _: &mut Response) -> HandlerResult {
            Err("greeter is broken".into())
        }
    }

    impl Controller for Greeter {
        fn action(name: &str) -> Option<Action<Self>> {
            match name {
                "hello" => Some(Self::hello),
                "fail" => Some(Self::fail),
                _ => None,
            }
        }

        fn name() -> &'static str {
            "Greeter"
        }
    }

    fn request() -> Request {
        Request::parse("GET", "/").unwrap().with_attribute("name", "Ada")
    }

    #[test]
    fn test_direct_target() {
        let target = Target::handler(|req, res| {
            res.send(req.attribute("name").unwrap_or_default(), StatusCode::OK);
            Ok(())
        });

        let mut res = Response::new();
        target.invoke(request(), &mut res).unwrap();
        assert_eq!(res.text(), "Ada");
    }

    #[test]
    fn test_controller_target() {
        let target = Target::controller::<Greeter>("hello");
        assert_eq!(format!("{:?}", target), "Greeter@hello");

        let mut res = Response::new();
        target.invoke(request(), &mut res).unwrap();
        // `Default` leaves the greeting empty
        assert_eq!(res.text(), ", Ada");
    }

    #[test]
    fn test_controller_missing_action() {
        let target = Target::controller::<Greeter>("destroy");
        let err = target.invoke(request(), &mut Response::new()).unwrap_err();

        assert!(err.is_configuration());
        assert_eq!(err.to_string(), "Method destroy not found in controller Greeter");
    }

    #[test]
    fn test_controller_action_error() {
        let target = Target::controller::<Greeter>("fail");
        let err = target.invoke(request(), &mut Response::new()).unwrap_err();

        assert!(matches!(err, Error::Handler(_)));
        assert_eq!(err.to_string(), "greeter is broken");
    }

    #[test]
    fn test_default_controller_name() {
        #[derive(Default)]
        struct Nameless;

        impl Controller for Nameless {
            fn action(_: &str) -> Option<Action<Self>> {
                None
            }
        }

        assert!(Nameless::name().ends_with("Nameless"));
    }
}
