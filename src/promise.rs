use std::fmt;
use std::rc::Rc;

use crate::machine::Core;
use crate::handler::{
    finally_handler, forward_handler, reject_handler, resolve_handler, Forward, NoFail, Rejectable,
    Resolvable,
};
use crate::{PromiseState, Reason, TypedPromise, Waiter};

/// Handed to an executor to resolve its promise, possibly much later.
pub type ResolveFn = Rc<dyn Fn()>;
/// Handed to an executor to reject its promise.
pub type RejectFn = Rc<dyn Fn(Reason)>;

/// A promise that completes without a payload, or fails with a [`Reason`].
///
/// `Promise` is a handle: clones share the same state. Everything runs
/// synchronously. Settling a promise runs its queued continuations before
/// `resolve`/`reject` returns, and a continuation attached to an already
/// settled promise runs before `then` returns.
///
/// ```
/// use promise_chain::Promise;
/// use std::{cell::RefCell, rc::Rc};
///
/// let log = Rc::new(RefCell::new(Vec::new()));
/// let (a, b) = (log.clone(), log.clone());
/// let promise = Promise::create(|resolve, _reject| {
///     resolve();
///     Ok(())
/// });
/// promise
///     .then(move || {
///         a.borrow_mut().push(1);
///         Ok(())
///     })
///     .then(move || {
///         b.borrow_mut().push(2);
///         Ok(())
///     });
/// assert_eq!(*log.borrow(), [1, 2]);
/// ```
#[derive(Clone)]
pub struct Promise {
    core: Rc<Core<()>>,
}

impl Promise {
    fn from_core(core: Core<()>) -> Self {
        Promise {
            core: Rc::new(core),
        }
    }

    /// Creates a pending promise and runs `executor` on it right away.
    ///
    /// An `Err` returned by the executor rejects the promise, unless the
    /// executor already settled it, in which case the error is only logged.
    pub fn create<F>(executor: F) -> Promise
    where
        F: FnOnce(ResolveFn, RejectFn) -> Result<(), Reason>,
    {
        let promise = Promise::from_core(Core::pending());
        plog!("New N {}", promise.id());

        let resolve: ResolveFn = {
            let promise = promise.clone();
            Rc::new(move || promise.resolve())
        };
        let reject: RejectFn = {
            let promise = promise.clone();
            Rc::new(move |reason: Reason| promise.reject(reason))
        };
        if let Err(reason) = executor(resolve, reject) {
            if promise.is_pending() {
                promise.reject(reason);
            } else {
                log::warn!(
                    "[promise {}] executor failed after settling: {}",
                    promise.id(),
                    reason
                );
            }
        }
        promise
    }

    /// A pending promise with nobody holding its resolve/reject functions.
    /// Settle it through [`resolve`](Self::resolve) or
    /// [`reject`](Self::reject).
    pub fn pending() -> Promise {
        let promise = Promise::create(|_, _| Ok(()));
        plog!("New SD {}", promise.id());
        promise
    }

    pub fn succeeded() -> Promise {
        let promise = Promise::from_core(Core::succeeded(()));
        plog!("New SS {}", promise.id());
        promise
    }

    pub fn failed(reason: impl Into<Reason>) -> Promise {
        let promise = Promise::from_core(Core::failed(reason.into()));
        plog!("New SF {}", promise.id());
        promise
    }

    pub fn id(&self) -> u64 {
        self.core.id()
    }

    pub fn state(&self) -> PromiseState {
        self.core.state()
    }

    pub fn is_pending(&self) -> bool {
        self.state() == PromiseState::Pending
    }

    pub fn reason(&self) -> Option<Reason> {
        self.core.reason()
    }

    /// # Panics
    ///
    /// Panics if the promise is already settled.
    pub fn resolve(&self) {
        plog!("Resolve {}", self.id());
        if let Err(err) = self.core.try_succeed(()) {
            panic!("{err}");
        }
    }

    /// # Panics
    ///
    /// Panics if the promise is already settled.
    pub fn reject(&self, reason: impl Into<Reason>) {
        plog!("Reject {}", self.id());
        if let Err(err) = self.core.try_fail(reason.into()) {
            panic!("{err}");
        }
    }

    /// Settles this promise the same way `source` settles.
    pub fn resolve_with(&self, source: &Promise) {
        plog!("Resolve Promise {} {}", self.id(), source.id());
        let (resolved, rejected) = (self.clone(), self.clone());
        source.core.add_handlers(
            Box::new(move |()| resolved.resolve()),
            Box::new(move |reason: Reason| rejected.reject(reason)),
        );
    }

    /// Runs `on_success` once this promise succeeds.
    ///
    /// The returned promise succeeds after `on_success` returns `Ok`, and
    /// fails with its error otherwise. A failure of this promise is passed
    /// along untouched.
    pub fn then<S>(&self, on_success: S) -> Promise
    where
        S: FnOnce() -> Result<(), Reason> + 'static,
    {
        self.chain(Some(on_success), None::<NoFail>)
    }

    /// Like [`then`](Self::then), also running `on_fail` if this promise
    /// fails. The returned promise still fails with the original reason, or
    /// with the error `on_fail` returns.
    pub fn then_or<S, R>(&self, on_success: S, on_fail: R) -> Promise
    where
        S: FnOnce() -> Result<(), Reason> + 'static,
        R: FnOnce(Reason) -> Result<(), Reason> + 'static,
    {
        self.chain(Some(on_success), Some(on_fail))
    }

    /// Runs `on_fail` if this promise fails.
    pub fn catch<R>(&self, on_fail: R) -> Promise
    where
        R: FnOnce(Reason) -> Result<(), Reason> + 'static,
    {
        self.chain(None::<fn() -> Result<(), Reason>>, Some(on_fail))
    }

    /// Runs `on_finally` once this promise settles either way, after its
    /// success or failure continuations. The returned promise carries this
    /// promise's outcome.
    ///
    /// `on_finally` is not protected: if it panics, the panic unwinds through
    /// whoever settled this promise, or through this call when the promise
    /// is already settled.
    pub fn finally<F>(&self, on_finally: F) -> Promise
    where
        F: FnOnce() + 'static,
    {
        plog!("Finally {}", self.id());
        self.core.add_always(finally_handler(on_finally));
        self.chain(None::<fn() -> Result<(), Reason>>, None::<NoFail>)
    }

    /// Runs `on_success` and follows the promise it returns.
    ///
    /// ```
    /// use promise_chain::Promise;
    ///
    /// let later = Promise::pending();
    /// let next = later.clone();
    /// let chained = Promise::succeeded().then_promise(move || Ok(next));
    /// assert!(chained.is_pending());
    /// later.resolve();
    /// assert!(!chained.is_pending());
    /// ```
    pub fn then_promise<S>(&self, on_success: S) -> Promise
    where
        S: FnOnce() -> Result<Promise, Reason> + 'static,
    {
        self.chain_promise(on_success, None::<NoFail>)
    }

    pub fn then_promise_or<S, R>(&self, on_success: S, on_fail: R) -> Promise
    where
        S: FnOnce() -> Result<Promise, Reason> + 'static,
        R: FnOnce(Reason) -> Result<(), Reason> + 'static,
    {
        self.chain_promise(on_success, Some(on_fail))
    }

    /// Runs `on_success` and follows the typed promise it returns.
    pub fn then_typed<T, S>(&self, on_success: S) -> TypedPromise<T>
    where
        T: Clone + 'static,
        S: FnOnce() -> Result<TypedPromise<T>, Reason> + 'static,
    {
        self.chain_typed(on_success, None::<NoFail>)
    }

    pub fn then_typed_or<T, S, R>(&self, on_success: S, on_fail: R) -> TypedPromise<T>
    where
        T: Clone + 'static,
        S: FnOnce() -> Result<TypedPromise<T>, Reason> + 'static,
        R: FnOnce(Reason) -> Result<(), Reason> + 'static,
    {
        self.chain_typed(on_success, Some(on_fail))
    }

    /// A future that completes once this promise settles.
    pub fn wait(&self) -> Waiter<()> {
        Waiter::new(self.core.clone())
    }

    fn chain<S, R>(&self, on_success: Option<S>, on_fail: Option<R>) -> Promise
    where
        S: FnOnce() -> Result<(), Reason> + 'static,
        R: FnOnce(Reason) -> Result<(), Reason> + 'static,
    {
        let downstream = Promise::pending();
        plog!("Then {} <- {}", self.id(), downstream.id());
        let on_success = on_success.map(|on_success| move |()| on_success());
        self.core.add_handlers(
            resolve_handler(on_success, downstream.clone()),
            reject_handler(on_fail, downstream.clone()),
        );
        downstream
    }

    fn chain_promise<S, R>(&self, on_success: S, on_fail: Option<R>) -> Promise
    where
        S: FnOnce() -> Result<Promise, Reason> + 'static,
        R: FnOnce(Reason) -> Result<(), Reason> + 'static,
    {
        let downstream = Promise::pending();
        plog!("Then promise {} <- {}", self.id(), downstream.id());
        self.core.add_handlers(
            forward_handler(move |()| on_success(), downstream.clone()),
            reject_handler(on_fail, downstream.clone()),
        );
        downstream
    }

    fn chain_typed<T, S, R>(&self, on_success: S, on_fail: Option<R>) -> TypedPromise<T>
    where
        T: Clone + 'static,
        S: FnOnce() -> Result<TypedPromise<T>, Reason> + 'static,
        R: FnOnce(Reason) -> Result<(), Reason> + 'static,
    {
        let downstream = TypedPromise::pending();
        plog!("Then typed {} <- {}", self.id(), downstream.id());
        self.core.add_handlers(
            forward_handler(move |()| on_success(), downstream.clone()),
            reject_handler(on_fail, downstream.clone()),
        );
        downstream
    }
}

impl Default for Promise {
    fn default() -> Self {
        Promise::pending()
    }
}

impl fmt::Debug for Promise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise")
            .field("id", &self.id())
            .field("state", &self.state())
            .finish()
    }
}

impl Resolvable<()> for Promise {
    fn resolve_from(&self, (): ()) {
        self.resolve()
    }
}

impl Forward<Promise> for Promise {
    fn forward(&self, source: &Promise) {
        self.resolve_with(source)
    }
}

impl Rejectable for Promise {
    fn reject_with(&self, reason: Reason) {
        self.reject(reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    fn counter() -> Rc<Cell<u32>> {
        Rc::new(Cell::new(0))
    }

    #[test]
    fn test_create_runs_executor_synchronously() {
        let ran = counter();
        let seen = ran.clone();
        let promise = Promise::create(move |resolve, _| {
            seen.set(seen.get() + 1);
            resolve();
            Ok(())
        });
        assert_eq!(ran.get(), 1);
        assert_eq!(promise.state(), PromiseState::Succeeded);
    }

    #[test]
    fn test_executor_error_becomes_rejection() {
        let promise = Promise::create(|_, _| Err(Reason::msg("executor blew up")));
        assert_eq!(promise.state(), PromiseState::Failed);
        assert_eq!(
            promise.reason().map(|r| r.to_string()),
            Some("executor blew up".into())
        );
    }

    #[test]
    fn test_executor_error_after_resolve_is_dropped() {
        let promise = Promise::create(|resolve, _| {
            resolve();
            Err(Reason::msg("too late"))
        });
        assert_eq!(promise.state(), PromiseState::Succeeded);
        assert!(promise.reason().is_none());
    }

    #[test]
    fn test_factories() {
        assert!(Promise::pending().is_pending());
        assert!(Promise::default().is_pending());
        assert_eq!(Promise::succeeded().state(), PromiseState::Succeeded);
        let failed = Promise::failed(Reason::msg("nope"));
        assert_eq!(failed.state(), PromiseState::Failed);
        assert_eq!(failed.reason().map(|r| r.to_string()), Some("nope".into()));
    }

    #[test]
    fn test_ids_are_distinct() {
        let a = Promise::pending();
        let b = Promise::pending();
        assert_ne!(a.id(), b.id());
        assert_eq!(a.id(), a.clone().id());
    }

    #[test]
    #[should_panic(expected = "already succeeded")]
    fn test_double_resolve_panics() {
        let promise = Promise::pending();
        promise.resolve();
        promise.resolve();
    }

    #[test]
    #[should_panic(expected = "already failed")]
    fn test_resolve_after_reject_panics() {
        let promise = Promise::pending();
        promise.reject(Reason::msg("first"));
        promise.resolve();
    }

    #[test]
    fn test_second_settlement_panics_and_keeps_state() {
        let promise = Promise::pending();
        promise.reject(Reason::msg("first"));
        let again = promise.clone();
        let panicked = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| again.resolve()));
        assert!(panicked.is_err());
        assert_eq!(promise.state(), PromiseState::Failed);
        assert_eq!(promise.reason().map(|r| r.to_string()), Some("first".into()));
    }

    #[test]
    fn test_then_on_settled_runs_inline() {
        let hits = counter();
        let seen = hits.clone();
        let next = Promise::succeeded().then(move || {
            seen.set(seen.get() + 1);
            Ok(())
        });
        assert_eq!(hits.get(), 1);
        assert_eq!(next.state(), PromiseState::Succeeded);
    }

    #[test]
    fn test_then_runs_in_attachment_order() {
        let promise = Promise::pending();
        let log = Rc::new(RefCell::new(Vec::new()));
        for i in 0..4 {
            let log = log.clone();
            promise.then(move || {
                log.borrow_mut().push(i);
                Ok(())
            });
        }
        assert!(log.borrow().is_empty());
        promise.resolve();
        assert_eq!(*log.borrow(), [0, 1, 2, 3]);
    }

    #[test]
    fn test_rejection_skips_success_continuation() {
        let caught = Rc::new(RefCell::new(None));
        let slot = caught.clone();
        let promise = Promise::create(|_, reject| {
            reject(Reason::msg("err"));
            Ok(())
        });
        let next = promise.then_or(
            || panic!("success continuation must not run"),
            move |reason| {
                *slot.borrow_mut() = Some(reason.to_string());
                Ok(())
            },
        );
        assert_eq!(caught.borrow().as_deref(), Some("err"));
        assert_eq!(next.reason().map(|r| r.to_string()), Some("err".into()));
    }

    #[test]
    fn test_catch_error_replaces_reason() {
        let next = Promise::failed(Reason::msg("first")).catch(|_| Err(Reason::msg("second")));
        assert_eq!(next.reason().map(|r| r.to_string()), Some("second".into()));
    }

    #[test]
    fn test_resolve_with_follows_source() {
        let source = Promise::pending();
        let follower = Promise::pending();
        follower.resolve_with(&source);
        assert!(follower.is_pending());
        source.reject(Reason::msg("source failed"));
        assert_eq!(
            follower.reason().map(|r| r.to_string()),
            Some("source failed".into())
        );
    }

    #[test]
    fn test_finally_on_settled_runs_immediately() {
        let hits = counter();
        let seen = hits.clone();
        let pass = Promise::succeeded().finally(move || seen.set(seen.get() + 1));
        assert_eq!(hits.get(), 1);
        assert_eq!(pass.state(), PromiseState::Succeeded);
    }

    #[test]
    fn test_then_typed_follows_returned_promise() {
        let seen = Rc::new(Cell::new(0));
        let slot = seen.clone();
        Promise::succeeded()
            .then_typed(|| Ok(TypedPromise::succeeded(4)))
            .then(move |v| {
                slot.set(v);
                Ok(())
            });
        assert_eq!(seen.get(), 4);
    }

    #[test]
    fn test_debug_shows_id_and_state() {
        let promise = Promise::succeeded();
        let text = format!("{promise:?}");
        assert!(text.contains(&format!("id: {}", promise.id())));
        assert!(text.contains("Succeeded"));
    }
}
