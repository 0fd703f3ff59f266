//! The settle / queue / drain state machine shared by [`Promise`] and
//! [`TypedPromise`].
//!
//! A `Core<T>` never holds its `RefCell` borrow while user code runs, so
//! handlers are free to attach to, or settle, any promise, including the one
//! currently draining.
//!
//! [`Promise`]: crate::Promise
//! [`TypedPromise`]: crate::TypedPromise

use std::cell::RefCell;
use std::collections::VecDeque;
use std::mem;
use std::task::Waker;

use crate::handler::{FailureHandler, FinallyHandler, SuccessHandler};
use crate::state::next_id;
use crate::{Error, PromiseState, Reason};

enum Outcome<T> {
    Pending,
    Succeeded(T),
    Failed(Reason),
}

impl<T> Outcome<T> {
    fn state(&self) -> PromiseState {
        match self {
            Outcome::Pending => PromiseState::Pending,
            Outcome::Succeeded(_) => PromiseState::Succeeded,
            Outcome::Failed(_) => PromiseState::Failed,
        }
    }
}

struct Inner<T> {
    outcome: Outcome<T>,
    successes: VecDeque<SuccessHandler<T>>,
    failures: VecDeque<FailureHandler>,
    always: VecDeque<FinallyHandler>,
    wakers: Vec<Waker>,
}

pub(crate) struct Core<T> {
    id: u64,
    inner: RefCell<Inner<T>>,
}

impl<T: Clone + 'static> Core<T> {
    fn with_outcome(outcome: Outcome<T>) -> Self {
        Core {
            id: next_id(),
            inner: RefCell::new(Inner {
                outcome,
                successes: VecDeque::new(),
                failures: VecDeque::new(),
                always: VecDeque::new(),
                wakers: Vec::new(),
            }),
        }
    }

    pub(crate) fn pending() -> Self {
        Self::with_outcome(Outcome::Pending)
    }

    pub(crate) fn succeeded(value: T) -> Self {
        Self::with_outcome(Outcome::Succeeded(value))
    }

    pub(crate) fn failed(reason: Reason) -> Self {
        Self::with_outcome(Outcome::Failed(reason))
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn state(&self) -> PromiseState {
        self.inner.borrow().outcome.state()
    }

    pub(crate) fn value(&self) -> Option<T> {
        match &self.inner.borrow().outcome {
            Outcome::Succeeded(value) => Some(value.clone()),
            _ => None,
        }
    }

    pub(crate) fn reason(&self) -> Option<Reason> {
        match &self.inner.borrow().outcome {
            Outcome::Failed(reason) => Some(reason.clone()),
            _ => None,
        }
    }

    fn ensure_pending(&self, outcome: &Outcome<T>) -> Result<(), Error> {
        let state = outcome.state();
        if state.is_settled() {
            return Err(Error::AlreadySettled { id: self.id, state });
        }
        Ok(())
    }

    /// Settles as succeeded, then runs every queued success handler followed
    /// by every `always` handler.
    pub(crate) fn try_succeed(&self, value: T) -> Result<(), Error> {
        let discarded = {
            let mut guard = self.inner.borrow_mut();
            let inner = &mut *guard;
            self.ensure_pending(&inner.outcome)?;
            inner.outcome = Outcome::Succeeded(value.clone());
            mem::take(&mut inner.failures)
        };
        drop(discarded);

        while let Some(handler) = self.next_success() {
            handler(value.clone());
        }
        self.drain_always();
        self.wake_all();
        Ok(())
    }

    /// Settles as failed, then runs every queued failure handler followed by
    /// every `always` handler.
    pub(crate) fn try_fail(&self, reason: Reason) -> Result<(), Error> {
        let discarded = {
            let mut guard = self.inner.borrow_mut();
            let inner = &mut *guard;
            self.ensure_pending(&inner.outcome)?;
            inner.outcome = Outcome::Failed(reason.clone());
            mem::take(&mut inner.successes)
        };
        drop(discarded);
        log::debug!("[promise {}] rejected: {}", self.id, reason);

        while let Some(handler) = self.next_failure() {
            handler(reason.clone());
        }
        self.drain_always();
        self.wake_all();
        Ok(())
    }

    /// Runs the matching handler right away when settled, otherwise queues
    /// both.
    pub(crate) fn add_handlers(&self, on_success: SuccessHandler<T>, on_failure: FailureHandler) {
        let settled = {
            let mut guard = self.inner.borrow_mut();
            let inner = &mut *guard;
            match &inner.outcome {
                Outcome::Pending => {
                    inner.successes.push_back(on_success);
                    inner.failures.push_back(on_failure);
                    return;
                }
                Outcome::Succeeded(value) => Ok(value.clone()),
                Outcome::Failed(reason) => Err(reason.clone()),
            }
        };
        match settled {
            Ok(value) => on_success(value),
            Err(reason) => on_failure(reason),
        }
    }

    pub(crate) fn add_always(&self, handler: FinallyHandler) {
        {
            let mut inner = self.inner.borrow_mut();
            if !inner.outcome.state().is_settled() {
                inner.always.push_back(handler);
                return;
            }
        }
        handler();
    }

    /// The settled outcome, or `None` after remembering `waker` for when the
    /// promise settles.
    pub(crate) fn poll_outcome(&self, waker: &Waker) -> Option<Result<T, Reason>> {
        let mut guard = self.inner.borrow_mut();
        let inner = &mut *guard;
        match &inner.outcome {
            Outcome::Succeeded(value) => Some(Ok(value.clone())),
            Outcome::Failed(reason) => Some(Err(reason.clone())),
            Outcome::Pending => {
                if !inner.wakers.iter().any(|w| w.will_wake(waker)) {
                    inner.wakers.push(waker.clone());
                }
                None
            }
        }
    }

    fn next_success(&self) -> Option<SuccessHandler<T>> {
        self.inner.borrow_mut().successes.pop_front()
    }

    fn next_failure(&self) -> Option<FailureHandler> {
        self.inner.borrow_mut().failures.pop_front()
    }

    fn next_always(&self) -> Option<FinallyHandler> {
        self.inner.borrow_mut().always.pop_front()
    }

    fn drain_always(&self) {
        while let Some(handler) = self.next_always() {
            handler();
        }
    }

    fn wake_all(&self) {
        let wakers = mem::take(&mut self.inner.borrow_mut().wakers);
        for waker in wakers {
            waker.wake()
        }
    }
}
