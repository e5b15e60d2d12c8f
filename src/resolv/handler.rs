//! Receiving the results of queries.

use super::arena::Handle;
use super::context::Context;
use super::error::Failure;
use crate::base::Response;
use std::boxed::Box;

//------------ Handler -------------------------------------------------------

/// A receiver for the outcome of a query.
///
/// Every query started on a [`Context`] is given a handler. Exactly one of
/// the two methods is called exactly once, unless the query is cancelled
/// first in which case neither is. Since both methods consume the handler,
/// the latter is guaranteed by the type system.
///
/// Handlers are called from within [`Context::process`] and are given
/// access to the context. They can start new queries or cancel other ones
/// from there.
pub trait Handler {
    /// Called with the response if the query was answered.
    fn on_resolved(
        self: Box<Self>,
        ctx: &mut Context,
        op: Handle,
        response: Response,
    );

    /// Called if the query failed.
    fn on_failure(self: Box<Self>, ctx: &mut Context, op: Handle, failure: Failure);
}

//------------ Callbacks -----------------------------------------------------

/// A handler made from a pair of closures.
pub struct Callbacks<S, F> {
    success: S,
    failure: F,
}

impl<S, F> Callbacks<S, F>
where
    S: FnOnce(&mut Context, Handle, Response),
    F: FnOnce(&mut Context, Handle, Failure),
{
    /// Creates a handler from a closure for each outcome.
    pub fn new(success: S, failure: F) -> Self {
        Callbacks { success, failure }
    }
}

impl<S, F> Handler for Callbacks<S, F>
where
    S: FnOnce(&mut Context, Handle, Response),
    F: FnOnce(&mut Context, Handle, Failure),
{
    fn on_resolved(
        self: Box<Self>,
        ctx: &mut Context,
        op: Handle,
        response: Response,
    ) {
        (self.success)(ctx, op, response)
    }

    fn on_failure(self: Box<Self>, ctx: &mut Context, op: Handle, failure: Failure) {
        (self.failure)(ctx, op, failure)
    }
}
