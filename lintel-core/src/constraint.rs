// Entry constraints and link guards

use crate::auth::AuthInfo;
use std::fmt;
use std::sync::Arc;

type Predicate<T> = dyn Fn(&T, Option<&AuthInfo>) -> bool + Send + Sync;

/// A named predicate over a model (or payload) and the caller's identity.
pub struct Constraint<T: ?Sized> {
    name: String,
    predicate: Arc<Predicate<T>>,
}

impl<T: ?Sized> Clone for Constraint<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            predicate: Arc::clone(&self.predicate),
        }
    }
}

impl<T: ?Sized> fmt::Debug for Constraint<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Constraint").field("name", &self.name).finish()
    }
}

impl<T: ?Sized> Constraint<T> {
    pub fn new<F>(name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&T, Option<&AuthInfo>) -> bool + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            predicate: Arc::new(predicate),
        }
    }

    /// Passes only for an authenticated caller holding `role`.
    pub fn role(role: impl Into<String>) -> Self {
        let role = role.into();
        let name = format!("role:{}", role);
        Self::new(name, move |_, auth| auth.is_some_and(|a| a.has_role(&role)))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn check(&self, value: &T, auth: Option<&AuthInfo>) -> bool {
        (self.predicate)(value, auth)
    }
}

/// The first constraint that rejects `value`, if any.
pub fn first_violation<'a, T: ?Sized>(
    constraints: &'a [Constraint<T>],
    value: &T,
    auth: Option<&AuthInfo>,
) -> Option<&'a Constraint<T>> {
    constraints.iter().find(|c| !c.check(value, auth))
}
