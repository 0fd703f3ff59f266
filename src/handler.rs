//! Handler adapters.
//!
//! Each adapter wraps a user continuation into a boxed handler that a
//! promise core can queue. Running the handler runs the continuation and then
//! settles the downstream promise with the outcome: a continuation that
//! returns `Err` rejects the downstream instead of escaping. The only
//! unprotected handler is [`finally_handler`].

use crate::Reason;

pub(crate) type SuccessHandler<T> = Box<dyn FnOnce(T)>;
pub(crate) type FailureHandler = Box<dyn FnOnce(Reason)>;
pub(crate) type FinallyHandler = Box<dyn FnOnce()>;

/// Stand-in type for an absent success continuation.
pub(crate) type NoSuccess<V> = fn(V) -> Result<(), Reason>;
/// Stand-in type for an absent failure continuation.
pub(crate) type NoFail = fn(Reason) -> Result<(), Reason>;

/// A downstream promise that can be resolved with a plain value.
pub(crate) trait Resolvable<V> {
    fn resolve_from(&self, value: V);
}

/// A downstream promise that can settle in lockstep with another promise.
pub(crate) trait Forward<P> {
    fn forward(&self, source: &P);
}

pub(crate) trait Rejectable {
    fn reject_with(&self, reason: Reason);
}

/// Runs `on_success` (if any) with the settled value, then resolves the
/// downstream with that same value. Serves both the untyped promise
/// (`V = ()`) and the typed one.
pub(crate) fn resolve_handler<V, F, D>(on_success: Option<F>, downstream: D) -> SuccessHandler<V>
where
    V: Clone + 'static,
    F: FnOnce(V) -> Result<(), Reason> + 'static,
    D: Resolvable<V> + Rejectable + 'static,
{
    Box::new(move |value: V| {
        let outcome = match on_success {
            Some(on_success) => on_success(value.clone()),
            None => Ok(()),
        };
        match outcome {
            Ok(()) => downstream.resolve_from(value),
            Err(reason) => downstream.reject_with(reason),
        }
    })
}

/// Runs a continuation that produces another promise and makes the
/// downstream follow it.
pub(crate) fn forward_handler<V, P, F, D>(on_success: F, downstream: D) -> SuccessHandler<V>
where
    V: 'static,
    F: FnOnce(V) -> Result<P, Reason> + 'static,
    D: Forward<P> + Rejectable + 'static,
{
    Box::new(move |value: V| match on_success(value) {
        Ok(next) => downstream.forward(&next),
        Err(reason) => downstream.reject_with(reason),
    })
}

/// Runs `on_fail` (if any), then rejects the downstream. The downstream sees
/// the original reason unless `on_fail` itself failed.
pub(crate) fn reject_handler<F, D>(on_fail: Option<F>, downstream: D) -> FailureHandler
where
    F: FnOnce(Reason) -> Result<(), Reason> + 'static,
    D: Rejectable + 'static,
{
    Box::new(move |reason: Reason| {
        let reason = match on_fail {
            Some(on_fail) => match on_fail(reason.clone()) {
                Ok(()) => reason,
                Err(thrown) => thrown,
            },
            None => reason,
        };
        downstream.reject_with(reason);
    })
}

// No protection for finally: a panic in the callback reaches whoever settled
// the promise or attached the handler.
pub(crate) fn finally_handler<F>(on_finally: F) -> FinallyHandler
where
    F: FnOnce() + 'static,
{
    Box::new(on_finally)
}
