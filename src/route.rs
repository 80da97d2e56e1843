use std::fmt;

use hyper::Method;

use crate::handler::{SharedMiddleware, Target};
use crate::pattern::Pattern;

/// The methods registered by [`Router::any`](crate::Router::any).
pub const ANY: [Method; 6] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::DELETE,
    Method::OPTIONS,
];

/// A registered route.
///
/// Routes are built once by the router and never change afterwards. The
/// middleware chain is already flattened: global middleware first, then group
/// middleware, then the route's own.
pub struct Route {
    methods: Vec<Method>,
    pattern: Pattern,
    middleware: Vec<SharedMiddleware>,
    target: Target,
}

impl Route {
    pub(crate) fn new(
        methods: Vec<Method>,
        pattern: Pattern,
        middleware: Vec<SharedMiddleware>,
        target: Target,
    ) -> Self {
        Self {
            methods,
            pattern,
            middleware,
            target,
        }
    }

    pub fn methods(&self) -> &[Method] {
        &self.methods
    }

    pub fn allows(&self, method: &Method) -> bool {
        self.methods.contains(method)
    }

    /// The full, cleaned path template, including group prefixes.
    pub fn path(&self) -> &str {
        self.pattern.template()
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    pub fn middleware(&self) -> &[SharedMiddleware] {
        &self.middleware
    }

    pub fn target(&self) -> &Target {
        &self.target
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("methods", &self.methods)
            .field("path", &self.path())
            .field("middleware", &self.middleware.len())
            .field("target", &self.target)
            .finish()
    }
}
