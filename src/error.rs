use std::{error::Error as StdError, fmt, rc::Rc};

use crate::PromiseState;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("promise {id} is already {state}")]
    AlreadySettled { id: u64, state: PromiseState },
}

/// Why a promise failed.
///
/// A `Reason` shares one [`anyhow::Error`] behind an `Rc`, so it is cheap to
/// hand to every failure handler of a promise and to every promise further
/// down the chain. Anything that converts into an `anyhow::Error` converts
/// into a `Reason`, which lets continuations use `?`:
///
/// ```
/// use promise_chain::{Promise, Reason};
///
/// let parsed = Promise::succeeded().then(|| {
///     let _port: u16 = "http".parse()?;
///     Ok(())
/// });
/// assert!(parsed.reason().is_some());
/// ```
#[derive(Clone)]
pub struct Reason(Rc<anyhow::Error>);

impl Reason {
    pub fn new<E>(error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Reason(Rc::new(anyhow::Error::new(error)))
    }

    /// A reason carrying only a message.
    pub fn msg<M>(message: M) -> Self
    where
        M: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        Reason(Rc::new(anyhow::Error::msg(message)))
    }

    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        self.0.downcast_ref::<E>()
    }

    /// Whether both reasons share the same underlying error value.
    pub fn ptr_eq(&self, other: &Reason) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl<E> From<E> for Reason
where
    E: Into<anyhow::Error>,
{
    fn from(error: E) -> Self {
        Reason(Rc::new(error.into()))
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.0, f)
    }
}

impl fmt::Debug for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Reason").field(&*self.0).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{Error, Reason};
    use crate::PromiseState;
    use anyhow::Context;

    #[test]
    fn test_reason_from_message() {
        let reason = Reason::msg("boom");
        assert_eq!(reason.to_string(), "boom");
        assert_eq!(reason.downcast_ref::<&str>(), Some(&"boom"));
        assert!(reason.downcast_ref::<Error>().is_none());
    }

    #[test]
    fn test_reason_from_std_error() {
        let err = "x".parse::<i32>().unwrap_err();
        let reason: Reason = err.clone().into();
        assert_eq!(reason.to_string(), err.to_string());
        assert!(reason.downcast_ref::<std::num::ParseIntError>().is_some());
        assert!(reason.downcast_ref::<Error>().is_none());
    }

    #[test]
    fn test_reason_from_anyhow_keeps_context() {
        let err = "x"
            .parse::<i32>()
            .context("reading sensor id")
            .unwrap_err();
        let reason = Reason::from(err);
        assert_eq!(reason.to_string(), "reading sensor id");
        assert_eq!(
            format!("{reason:#}"),
            "reading sensor id: invalid digit found in string"
        );
        assert!(reason.downcast_ref::<std::num::ParseIntError>().is_some());
    }

    #[test]
    fn test_reason_clone_shares_error() {
        let a = Reason::msg("shared");
        let b = a.clone();
        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&Reason::msg("shared")));
    }

    #[test]
    fn test_already_settled_message() {
        let err = Error::AlreadySettled {
            id: 7,
            state: PromiseState::Failed,
        };
        assert_eq!(err.to_string(), "promise 7 is already failed");
    }
}
