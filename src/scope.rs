//! Registration scopes.
//!
//! A scope is the prefix and middleware that apply to every route registered
//! while it is active. Entering a group swaps a derived scope into the router
//! and keeps the previous one in a guard; the guard puts it back when the
//! group body returns, fails or unwinds. Nested groups nest guards, so the
//! scope stack is the call stack.

use std::mem;
use std::ops::{Deref, DerefMut};

use crate::handler::SharedMiddleware;
use crate::path;
use crate::router::Router;

#[derive(Clone, Default)]
pub(crate) struct Scope {
    /// Clean prefix, empty at the top level.
    pub(crate) prefix: String,
    pub(crate) global: Vec<SharedMiddleware>,
    pub(crate) group: Vec<SharedMiddleware>,
}

impl Scope {
    /// A scope for a group nested in this one.
    pub(crate) fn group(
        &self,
        prefix: &str,
        middleware: impl IntoIterator<Item = SharedMiddleware>,
    ) -> Self {
        let mut scope = self.clone();
        scope.prefix = path::join(&self.prefix, prefix);
        scope.group.extend(middleware);
        scope
    }

    /// A scope that only adds middleware.
    pub(crate) fn middleware(&self, middleware: impl IntoIterator<Item = SharedMiddleware>) -> Self {
        let mut scope = self.clone();
        scope.global.extend(middleware);
        scope
    }

    /// The full path of a route registered in this scope.
    pub(crate) fn resolve(&self, path: &str) -> String {
        path::join(&self.prefix, path)
    }

    /// The chain for a route registered in this scope: global middleware,
    /// then group middleware, then the route's own.
    pub(crate) fn chain(
        &self,
        route: impl IntoIterator<Item = SharedMiddleware>,
    ) -> Vec<SharedMiddleware> {
        self.global
            .iter()
            .chain(self.group.iter())
            .cloned()
            .chain(route)
            .collect()
    }
}

/// Holds the scope that was active before a group and restores it on drop.
pub(crate) struct ScopeGuard<'r> {
    router: &'r mut Router,
    previous: Scope,
}

impl<'r> ScopeGuard<'r> {
    pub(crate) fn enter(router: &'r mut Router, scope: Scope) -> Self {
        let previous = mem::replace(&mut router.scope, scope);
        Self { router, previous }
    }
}

impl Deref for ScopeGuard<'_> {
    type Target = Router;

    fn deref(&self) -> &Router {
        &*self.router
    }
}

impl DerefMut for ScopeGuard<'_> {
    fn deref_mut(&mut self) -> &mut Router {
        &mut *self.router
    }
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        self.router.scope = mem::take(&mut self.previous);
    }
}
