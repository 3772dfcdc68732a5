//! Per-pass chain context and the stage runner.

use std::sync::Arc;

use crate::error::{FilterError, Result};
use crate::item::{ItemList, ListItem};
use crate::params::FilterParams;

use super::{Interceptor, Stage};

/// Context handed to each interceptor during one filtering pass.
///
/// A chain is built for a single pass and dropped when the pass ends.
pub struct Chain<'a, I> {
    original: &'a [Arc<I>],
    requested: ItemList<I>,
    params: &'a FilterParams<I>,
    stage: Stage,
    interrupted: bool,
}

impl<'a, I: ListItem> Chain<'a, I> {
    /// A pre-diff chain: `source` is both the original and the requested list.
    pub fn new(source: &'a [Arc<I>], params: &'a FilterParams<I>) -> Self {
        Self {
            original: source,
            requested: source.to_vec(),
            params,
            stage: Stage::Before,
            interrupted: false,
        }
    }

    /// A post-diff chain over the displayed list and a candidate list.
    pub fn after_diff(
        displayed: &'a [Arc<I>],
        candidate: ItemList<I>,
        params: &'a FilterParams<I>,
    ) -> Self {
        Self {
            original: displayed,
            requested: candidate,
            params,
            stage: Stage::PostDiff,
            interrupted: false,
        }
    }

    /// The list this pass started from.
    ///
    /// For pre-diff stages this is the raw source list; for the post-diff
    /// stage it is the currently displayed list.
    pub fn original(&self) -> &[Arc<I>] {
        self.original
    }

    /// The list produced by the previous interceptor.
    pub fn requested(&self) -> &[Arc<I>] {
        &self.requested
    }

    /// Parameters of the request driving this pass.
    pub fn params(&self) -> &FilterParams<I> {
        self.params
    }

    /// The stage currently running.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Stop every remaining interceptor in this and all later stages.
    ///
    /// The list returned by the interceptor that calls this is kept.
    pub fn interrupt(&mut self) {
        self.interrupted = true;
    }

    /// Whether the chain has been interrupted.
    pub fn is_interrupted(&self) -> bool {
        self.interrupted
    }

    /// Build an interceptor failure tagged with the current stage.
    pub fn fail(&self, message: impl Into<String>) -> FilterError {
        FilterError::interceptor(self.stage, message)
    }

    /// Consume the chain, returning the final list.
    pub fn into_requested(self) -> ItemList<I> {
        self.requested
    }
}

/// Run one stage of interceptors over `chain`.
///
/// Enabled interceptors run in order, each replacing the requested list with
/// its result. Nothing runs once the chain has been interrupted, including
/// stages run after this one.
#[tracing::instrument(
    skip(chain, interceptors),
    fields(count = interceptors.len()),
    target = "horizon_listdiff::filter",
    level = "trace"
)]
pub fn run_stage<I: ListItem>(
    chain: &mut Chain<'_, I>,
    stage: Stage,
    interceptors: &[Arc<dyn Interceptor<I>>],
) -> Result<()> {
    if chain.interrupted {
        return Ok(());
    }
    chain.stage = stage;

    for interceptor in interceptors {
        if !interceptor.is_enabled() {
            continue;
        }

        let result = interceptor.intercept(chain).map_err(|err| match err {
            FilterError::Interceptor { .. } => err,
            other => FilterError::interceptor(stage, other.to_string()),
        })?;
        chain.requested = result;

        if chain.interrupted {
            tracing::trace!(target: "horizon_listdiff::filter", %stage, "chain interrupted");
            break;
        }
    }

    Ok(())
}
