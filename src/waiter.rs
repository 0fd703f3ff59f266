//! Awaiting a promise from `async` code.
//!
//! A [`Waiter`] does not drive anything: the promise still settles whenever
//! its producer calls resolve or reject. Polling only reports the outcome, or
//! remembers the task's waker until then.
//!
//! ```
//! use futures::executor::block_on;
//! use promise_chain::{Promise, TypedPromise};
//!
//! let ready = TypedPromise::succeeded("🍓");
//! assert_eq!(block_on(ready.wait()).unwrap(), "🍓");
//!
//! let failed = Promise::failed(promise_chain::Reason::msg("💥"));
//! assert_eq!(block_on(failed.wait()).unwrap_err().to_string(), "💥");
//! ```

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use crate::machine::Core;
use crate::Reason;

pub struct Waiter<T> {
    core: Rc<Core<T>>,
}

impl<T> Waiter<T> {
    pub(crate) fn new(core: Rc<Core<T>>) -> Self {
        Waiter { core }
    }
}

impl<T: Clone + 'static> Future for Waiter<T> {
    type Output = Result<T, Reason>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.core.poll_outcome(cx.waker()) {
            Some(outcome) => Poll::Ready(outcome),
            None => Poll::Pending,
        }
    }
}

impl<T: Clone + 'static> fmt::Debug for Waiter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Waiter")
            .field("id", &self.core.id())
            .field("state", &self.core.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::{Promise, Reason, TypedPromise};
    use futures::executor::LocalPool;
    use futures::task::LocalSpawnExt;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_waiter_completes_after_later_resolve() {
        let mut pool = LocalPool::new();
        let promise = TypedPromise::<String>::pending();
        let received = Rc::new(RefCell::new(None));

        let (waiter, slot) = (promise.wait(), received.clone());
        pool.spawner()
            .spawn_local(async move {
                *slot.borrow_mut() = Some(waiter.await.unwrap());
            })
            .unwrap();

        pool.run_until_stalled();
        assert!(received.borrow().is_none());

        promise.resolve("🍓".to_string());
        pool.run_until_stalled();
        assert_eq!(received.borrow().as_deref(), Some("🍓"));
    }

    #[test]
    fn test_two_waiters_see_rejection() {
        let mut pool = LocalPool::new();
        let promise = Promise::pending();
        let results = Rc::new(RefCell::new(Vec::new()));

        for _ in 0..2 {
            let (waiter, results) = (promise.wait(), results.clone());
            pool.spawner()
                .spawn_local(async move {
                    let reason = waiter.await.unwrap_err();
                    results.borrow_mut().push(reason.to_string());
                })
                .unwrap();
        }
        pool.run_until_stalled();
        promise.reject(Reason::msg("reject!!"));
        pool.run_until_stalled();
        assert_eq!(*results.borrow(), ["reject!!", "reject!!"]);
    }
}
