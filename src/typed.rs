use std::fmt;
use std::rc::Rc;

use crate::machine::Core;
use crate::handler::{
    finally_handler, forward_handler, reject_handler, resolve_handler, Forward, NoFail, NoSuccess,
    Rejectable, Resolvable,
};
use crate::{PromiseState, Reason, RejectFn, Waiter};

/// Handed to an executor to resolve its typed promise with a value.
pub type ResolveValueFn<T> = Rc<dyn Fn(T)>;

/// A promise that completes with a value of type `T`, or fails with a
/// [`Reason`].
///
/// Works like [`Promise`](crate::Promise), except that success continuations
/// receive a clone of the value. A chain keeps its payload type: `then`
/// passes the same `T` down, and `then_promise` must return a
/// `TypedPromise<T>` as well.
///
/// ```
/// use promise_chain::TypedPromise;
/// use std::{cell::Cell, rc::Rc};
///
/// let total = Rc::new(Cell::new(0));
/// let sum = total.clone();
/// TypedPromise::succeeded(4)
///     .then_promise(|v| Ok(TypedPromise::succeeded(v * 10)))
///     .then(move |v| {
///         sum.set(v);
///         Ok(())
///     });
/// assert_eq!(total.get(), 40);
/// ```
pub struct TypedPromise<T> {
    core: Rc<Core<T>>,
}

impl<T> Clone for TypedPromise<T> {
    fn clone(&self) -> Self {
        TypedPromise {
            core: self.core.clone(),
        }
    }
}

impl<T: Clone + 'static> TypedPromise<T> {
    fn from_core(core: Core<T>) -> Self {
        TypedPromise {
            core: Rc::new(core),
        }
    }

    /// Creates a pending promise and runs `executor` on it right away.
    ///
    /// An `Err` returned by the executor rejects the promise, unless the
    /// executor already settled it, in which case the error is only logged.
    pub fn create<F>(executor: F) -> TypedPromise<T>
    where
        F: FnOnce(ResolveValueFn<T>, RejectFn) -> Result<(), Reason>,
    {
        let promise = TypedPromise::from_core(Core::pending());
        plog!("New T N {}", promise.id());

        let resolve: ResolveValueFn<T> = {
            let promise = promise.clone();
            Rc::new(move |value: T| promise.resolve(value))
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

    pub fn pending() -> TypedPromise<T> {
        let promise = TypedPromise::create(|_, _| Ok(()));
        plog!("New T SD {}", promise.id());
        promise
    }

    pub fn succeeded(value: T) -> TypedPromise<T> {
        let promise = TypedPromise::from_core(Core::succeeded(value));
        plog!("New T SS {}", promise.id());
        promise
    }

    pub fn failed(reason: impl Into<Reason>) -> TypedPromise<T> {
        let promise = TypedPromise::from_core(Core::failed(reason.into()));
        plog!("New T SF {}", promise.id());
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

    /// The value, once succeeded.
    pub fn value(&self) -> Option<T> {
        self.core.value()
    }

    pub fn reason(&self) -> Option<Reason> {
        self.core.reason()
    }

    /// # Panics
    ///
    /// Panics if the promise is already settled.
    pub fn resolve(&self, value: T) {
        plog!("Resolve T {}", self.id());
        if let Err(err) = self.core.try_succeed(value) {
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

    /// Settles this promise with whatever `source` settles with.
    pub fn resolve_with(&self, source: &TypedPromise<T>) {
        plog!("Resolve T Promise {} {}", self.id(), source.id());
        let (resolved, rejected) = (self.clone(), self.clone());
        source.core.add_handlers(
            Box::new(move |value: T| resolved.resolve(value)),
            Box::new(move |reason: Reason| rejected.reject(reason)),
        );
    }

    /// Runs `on_success` with the value once this promise succeeds. The
    /// returned promise succeeds with the same value, or fails with the
    /// error `on_success` returns.
    pub fn then<S>(&self, on_success: S) -> TypedPromise<T>
    where
        S: FnOnce(T) -> Result<(), Reason> + 'static,
    {
        self.chain(Some(on_success), None::<NoFail>)
    }

    pub fn then_or<S, R>(&self, on_success: S, on_fail: R) -> TypedPromise<T>
    where
        S: FnOnce(T) -> Result<(), Reason> + 'static,
        R: FnOnce(Reason) -> Result<(), Reason> + 'static,
    {
        self.chain(Some(on_success), Some(on_fail))
    }

    pub fn catch<R>(&self, on_fail: R) -> TypedPromise<T>
    where
        R: FnOnce(Reason) -> Result<(), Reason> + 'static,
    {
        self.chain(None::<NoSuccess<T>>, Some(on_fail))
    }

    /// Runs `on_finally` once this promise settles either way. Unprotected,
    /// see [`Promise::finally`](crate::Promise::finally).
    pub fn finally<F>(&self, on_finally: F) -> TypedPromise<T>
    where
        F: FnOnce() + 'static,
    {
        plog!("Finally T {}", self.id());
        self.core.add_always(finally_handler(on_finally));
        self.chain(None::<NoSuccess<T>>, None::<NoFail>)
    }

    /// Runs `on_success` with the value and follows the promise it returns.
    pub fn then_promise<S>(&self, on_success: S) -> TypedPromise<T>
    where
        S: FnOnce(T) -> Result<TypedPromise<T>, Reason> + 'static,
    {
        self.chain_promise(on_success, None::<NoFail>)
    }

    pub fn then_promise_or<S, R>(&self, on_success: S, on_fail: R) -> TypedPromise<T>
    where
        S: FnOnce(T) -> Result<TypedPromise<T>, Reason> + 'static,
        R: FnOnce(Reason) -> Result<(), Reason> + 'static,
    {
        self.chain_promise(on_success, Some(on_fail))
    }

    /// A future that completes with the value once this promise settles.
    pub fn wait(&self) -> Waiter<T> {
        Waiter::new(self.core.clone())
    }

    fn chain<S, R>(&self, on_success: Option<S>, on_fail: Option<R>) -> TypedPromise<T>
    where
        S: FnOnce(T) -> Result<(), Reason> + 'static,
        R: FnOnce(Reason) -> Result<(), Reason> + 'static,
    {
        let downstream = TypedPromise::pending();
        plog!("Then T {} <- {}", self.id(), downstream.id());
        self.core.add_handlers(
            resolve_handler(on_success, downstream.clone()),
            reject_handler(on_fail, downstream.clone()),
        );
        downstream
    }

    fn chain_promise<S, R>(&self, on_success: S, on_fail: Option<R>) -> TypedPromise<T>
    where
        S: FnOnce(T) -> Result<TypedPromise<T>, Reason> + 'static,
        R: FnOnce(Reason) -> Result<(), Reason> + 'static,
    {
        let downstream = TypedPromise::pending();
        plog!("Then T promise {} <- {}", self.id(), downstream.id());
        self.core.add_handlers(
            forward_handler(on_success, downstream.clone()),
            reject_handler(on_fail, downstream.clone()),
        );
        downstream
    }
}

impl<T: Clone + 'static> Default for TypedPromise<T> {
    fn default() -> Self {
        TypedPromise::pending()
    }
}

impl<T: Clone + fmt::Debug + 'static> fmt::Debug for TypedPromise<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedPromise")
            .field("id", &self.id())
            .field("state", &self.state())
            .field("value", &self.value())
            .finish()
    }
}

impl<T: Clone + 'static> Resolvable<T> for TypedPromise<T> {
    fn resolve_from(&self, value: T) {
        self.resolve(value)
    }
}

impl<T: Clone + 'static> Forward<TypedPromise<T>> for TypedPromise<T> {
    fn forward(&self, source: &TypedPromise<T>) {
        self.resolve_with(source)
    }
}

impl<T: Clone + 'static> Rejectable for TypedPromise<T> {
    fn reject_with(&self, reason: Reason) {
        self.reject(reason)
    }
}
