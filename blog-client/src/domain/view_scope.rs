//! Lifetime scopes for views that start asynchronous fetches.
//!
//! Leaving a view must stop its in-flight results from being applied, but
//! the external call itself runs to completion. A [`ViewScope`] is owned by
//! the view; each fetch carries a [`ScopeToken`] and checks it before
//! touching view state.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::debug;

/// Owned by a view; closing or dropping it retires every token.
#[derive(Debug)]
pub struct ViewScope {
    live: Arc<AtomicBool>,
}

impl Default for ViewScope {
    fn default() -> Self {
        Self::open()
    }
}

impl ViewScope {
    /// Open a new live scope.
    #[must_use]
    pub fn open() -> Self {
        Self {
            live: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Token for one fetch started by this view.
    #[must_use]
    pub fn token(&self) -> ScopeToken {
        ScopeToken {
            live: Arc::clone(&self.live),
        }
    }

    /// Leave the view.
    pub fn close(&self) {
        self.live.store(false, Ordering::Release);
    }
}

impl Drop for ViewScope {
    fn drop(&mut self) {
        self.close();
    }
}

/// Handle carried by an in-flight fetch.
#[derive(Debug, Clone)]
pub struct ScopeToken {
    live: Arc<AtomicBool>,
}

impl ScopeToken {
    /// Whether results may still be applied.
    #[must_use]
    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    /// Drive `call` to completion and keep its output only if the view is
    /// still open afterwards.
    pub async fn run<F>(&self, call: F) -> Option<F::Output>
    where
        F: Future,
    {
        let output = call.await;
        if self.is_live() {
            Some(output)
        } else {
            debug!("view closed; discarding fetch result");
            None
        }
    }

    /// Apply `value` with `apply` if the view is still open.
    ///
    /// Returns whether the value was applied.
    pub fn deliver<T>(&self, value: T, apply: impl FnOnce(T)) -> bool {
        if self.is_live() {
            apply(value);
            true
        } else {
            false
        }
    }
}
