//! Lifecycle tracing.
//!
//! `plog!` records promise ids next to event names (`New`, `Resolve`,
//! `Reject`, `Then ...`). It expands to nothing unless the crate is built with
//! the `debug-log` feature, and then logs at `trace` under the
//! `promise_chain` target:
//!
//! ```text
//! RUST_LOG=promise_chain=trace cargo test --features debug-log
//! ```

macro_rules! plog {
    ($($arg:tt)+) => {
        #[cfg(feature = "debug-log")]
        {
            log::trace!(target: "promise_chain", $($arg)+);
        }
    };
}
