//! Promises that settle synchronously and chain through callbacks.
//!
//! A producer creates a promise with an executor that receives resolve and
//! reject functions, and calls one of them whenever the work is done, now or
//! from some later callback. Consumers attach continuations with `then`,
//! `catch` and `finally`; each returns a new downstream promise driven by the
//! continuation's outcome.
//!
//! There is no scheduler. Settling a promise runs its continuations right
//! there, in attachment order, and attaching to a settled promise runs the
//! continuation before `then` returns. Continuations report failure by
//! returning `Err`, which rejects the downstream promise.
//!
//! ```
//! use promise_chain::{Promise, Reason, TypedPromise};
//! use std::{cell::RefCell, rc::Rc};
//!
//! let log = Rc::new(RefCell::new(Vec::new()));
//! let (a, b) = (log.clone(), log.clone());
//!
//! let start = Promise::pending();
//! start
//!     .then_typed(|| Ok(TypedPromise::succeeded(4)))
//!     .then(move |v| {
//!         a.borrow_mut().push(format!("got {v}"));
//!         Err(Reason::msg("stop"))
//!     })
//!     .catch(move |reason| {
//!         b.borrow_mut().push(format!("caught {reason}"));
//!         Ok(())
//!     });
//!
//! assert!(log.borrow().is_empty());
//! start.resolve();
//! assert_eq!(*log.borrow(), ["got 4", "caught stop"]);
//! ```
//!
//! Promises are `Rc` handles and stay on the thread that created them.

#[macro_use]
mod diag;

mod error;
mod handler;
mod machine;
mod promise;
mod state;
mod typed;
mod waiter;

pub use error::{Error, Reason};
pub use promise::{Promise, RejectFn, ResolveFn};
pub use state::PromiseState;
pub use typed::{ResolveValueFn, TypedPromise};
pub use waiter::Waiter;
