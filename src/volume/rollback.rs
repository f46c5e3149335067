//! Ordered cleanup actions for partially acquired resources
//!
//! Every resource acquired during volume initialization pushes an action that
//! releases it. On failure the list is unwound newest-first; each action runs
//! even if an earlier one failed, and failures are collected instead of
//! raised. Once the resources have a new owner the list is committed and the
//! actions are dropped without running.

use crate::{HyperError, Result};
use std::future::Future;
use std::pin::Pin;

type CleanupFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// Cleanup actions in acquisition order
#[must_use = "a rollback must be unwound or committed"]
#[derive(Default)]
pub struct Rollback<'a> {
    actions: Vec<(String, CleanupFuture<'a>)>,
}

impl<'a> Rollback<'a> {
    pub fn new() -> Self {
        Self {
            actions: Vec::new(),
        }
    }

    /// Register the cleanup for a resource that was just acquired
    pub fn push<F>(&mut self, what: impl Into<String>, action: F)
    where
        F: Future<Output = Result<()>> + Send + 'a,
    {
        self.actions.push((what.into(), Box::pin(action)));
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Ownership moved elsewhere; drop the actions without running them
    pub fn commit(self) {
        if !self.actions.is_empty() {
            tracing::debug!(actions = self.actions.len(), "rollback committed");
        }
    }

    /// Run every action newest-first and return the failures
    pub async fn unwind(self) -> Vec<HyperError> {
        let mut failures = Vec::new();
        for (what, action) in self.actions.into_iter().rev() {
            match action.await {
                Ok(()) => tracing::debug!(%what, "rolled back"),
                Err(e) => {
                    tracing::warn!(%what, error = %e, "cleanup failed");
                    failures.push(e);
                }
            }
        }
        failures
    }

    /// Unwind, then return `cause` with any cleanup failures attached
    pub async fn abort(self, cause: HyperError) -> HyperError {
        let failures = self.unwind().await;
        cause.with_cleanup(failures)
    }
}
