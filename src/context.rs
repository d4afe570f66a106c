//! Logging capability handed to every pipeline component.
//!
//! Components never reach for a module-level logger. They receive a
//! `BuildContext` and emit their events under its span, so everything a
//! build logs is grouped under one `dataset_build` span and, when a
//! dispatcher is supplied, routed to that dispatcher only.
//!
//! Every public component that takes a context runs its own body through
//! `in_scope` or `run`, so callers get the routing without wrapping the
//! call themselves. Nesting is harmless.

use std::future::Future;
use tracing::instrument::WithSubscriber;
use tracing::{Dispatch, Instrument, Span};

#[derive(Debug, Clone)]
pub struct BuildContext {
    span: Span,
    dispatch: Option<Dispatch>,
}

impl BuildContext {
    /// Context logging through the globally installed subscriber.
    pub fn new(build_label: &str) -> Self {
        Self {
            span: tracing::info_span!("dataset_build", build = %build_label),
            dispatch: None,
        }
    }

    /// Context logging to `dispatch`, whatever the global subscriber is.
    pub fn with_dispatch(build_label: &str, dispatch: Dispatch) -> Self {
        let span = tracing::dispatcher::with_default(&dispatch, || {
            tracing::info_span!("dataset_build", build = %build_label)
        });
        Self {
            span,
            dispatch: Some(dispatch),
        }
    }

    /// Context that records nothing. Handy in tests.
    pub fn disabled() -> Self {
        Self {
            span: Span::none(),
            dispatch: Some(Dispatch::none()),
        }
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Run synchronous work inside the build span and dispatcher.
    pub fn in_scope<T>(&self, work: impl FnOnce() -> T) -> T {
        match &self.dispatch {
            Some(dispatch) => {
                tracing::dispatcher::with_default(dispatch, || self.span.in_scope(work))
            }
            None => self.span.in_scope(work),
        }
    }

    /// Drive `future` inside the build span and dispatcher.
    pub async fn run<F: Future>(&self, future: F) -> F::Output {
        let future = future.instrument(self.span.clone());
        match &self.dispatch {
            Some(dispatch) => future.with_subscriber(dispatch.clone()).await,
            None => future.await,
        }
    }
}

impl Default for BuildContext {
    fn default() -> Self {
        Self::new("default")
    }
}
