//! The filter engine: staged interceptor chains plus the after-filter hook.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::Result;
use crate::interceptor::{
    Chain, GroupInterceptor, HiddenInterceptor, InterceptorRegistry, Stage, SubItemInterceptor,
    run_stage,
};
use crate::item::{ItemList, ListItem};
use crate::logging::targets;
use crate::params::FilterParams;

/// Final say over the candidate list, given the displayed list.
pub type AfterFilterHook<I> = Arc<dyn Fn(&[Arc<I>], &[Arc<I>]) -> ItemList<I> + Send + Sync>;

/// Turns a source list into the list to display.
///
/// [`filter`](Self::filter) runs the before, main and after stages over a
/// fresh chain. [`filter_after_diff`](Self::filter_after_diff) runs the
/// post-diff stage against the displayed list and then the after-filter
/// hook. The main stage starts out with the group, sub-item and hidden
/// interceptors.
pub struct FilterEngine<I> {
    before: InterceptorRegistry<I>,
    main: InterceptorRegistry<I>,
    after: InterceptorRegistry<I>,
    post_diff: InterceptorRegistry<I>,
    after_filter_hook: RwLock<Option<AfterFilterHook<I>>>,
}

impl<I: ListItem> Default for FilterEngine<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: ListItem> FilterEngine<I> {
    /// An engine with the built-in main-stage interceptors.
    pub fn new() -> Self {
        let main = InterceptorRegistry::new();
        main.add(Arc::new(GroupInterceptor));
        main.add(Arc::new(SubItemInterceptor));
        main.add(Arc::new(HiddenInterceptor));

        Self {
            before: InterceptorRegistry::new(),
            main,
            after: InterceptorRegistry::new(),
            post_diff: InterceptorRegistry::new(),
            after_filter_hook: RwLock::new(None),
        }
    }

    /// The interceptors registered for `stage`.
    pub fn registry(&self, stage: Stage) -> &InterceptorRegistry<I> {
        match stage {
            Stage::Before => &self.before,
            Stage::Main => &self.main,
            Stage::After => &self.after,
            Stage::PostDiff => &self.post_diff,
        }
    }

    /// Install the after-filter hook, replacing any previous one.
    pub fn set_after_filter_hook(&self, hook: AfterFilterHook<I>) {
        *self.after_filter_hook.write() = Some(hook);
    }

    /// Remove the after-filter hook.
    pub fn clear_after_filter_hook(&self) {
        *self.after_filter_hook.write() = None;
    }

    /// Run the before, main and after stages over `source`.
    ///
    /// `source` is never modified. An interrupt in any stage ends the pass
    /// with the interrupting interceptor's output.
    pub fn filter(&self, source: &[Arc<I>], params: &FilterParams<I>) -> Result<ItemList<I>> {
        let mut chain = Chain::new(source, params);
        for stage in [Stage::Before, Stage::Main, Stage::After] {
            run_stage(&mut chain, stage, &self.registry(stage).snapshot())?;
        }

        let result = chain.into_requested();
        tracing::trace!(
            target: targets::FILTER,
            source = source.len(),
            result = result.len(),
            "filtered"
        );
        Ok(result)
    }

    /// Run the post-diff stage and the after-filter hook over `candidate`.
    pub fn filter_after_diff(
        &self,
        displayed: &[Arc<I>],
        candidate: ItemList<I>,
        params: &FilterParams<I>,
    ) -> Result<ItemList<I>> {
        let mut chain = Chain::after_diff(displayed, candidate, params);
        run_stage(&mut chain, Stage::PostDiff, &self.post_diff.snapshot())?;
        let candidate = chain.into_requested();

        let hook = self.after_filter_hook.read().clone();
        Ok(match hook {
            Some(hook) => hook(displayed, &candidate),
            None => candidate,
        })
    }
}

impl<I> std::fmt::Debug for FilterEngine<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterEngine")
            .field("before", &self.before)
            .field("main", &self.main)
            .field("after", &self.after)
            .field("post_diff", &self.post_diff)
            .field("has_after_filter_hook", &self.after_filter_hook.read().is_some())
            .finish()
    }
}
