//! Per-verb request lifecycles.
//!
//! Each HTTP verb is an ordered [`Pipeline`] of named steps over one
//! request-scoped [`Context`]. A step either lets the request continue,
//! finishes it early ([`Flow::Done`], e.g. `304 Not Modified`) or fails with
//! an [`Error`] that the endpoint renders as an error body.

use crate::Error;
use futures_util::future::BoxFuture;

pub mod collection;
pub mod context;
pub mod delete;
pub mod get;
pub mod post;
pub mod put;
pub mod steps;

pub use context::{Collaborators, Context};

/// What happens after a step succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// The response is complete; skip the remaining steps.
    Done,
}

pub type StepResult = Result<Flow, Error>;

pub type StepFuture<'a> = BoxFuture<'a, StepResult>;

/// A named step of a lifecycle.
pub struct Step<C> {
    pub name: &'static str,
    run: for<'a> fn(&'a mut C) -> StepFuture<'a>,
}

impl<C> Clone for Step<C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C> Copy for Step<C> {}

impl<C> std::fmt::Debug for Step<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name)
    }
}

impl<C> Step<C> {
    pub fn new(name: &'static str, run: for<'a> fn(&'a mut C) -> StepFuture<'a>) -> Self {
        Self { name, run }
    }
}

/// An ordered list of steps, run strictly in sequence.
pub struct Pipeline<C> {
    name: &'static str,
    steps: Vec<Step<C>>,
}

impl<C> Clone for Pipeline<C> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            steps: self.steps.clone(),
        }
    }
}

impl<C> std::fmt::Debug for Pipeline<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field("steps", &self.steps)
            .finish()
    }
}

impl<C: Send> Pipeline<C> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            steps: Vec::new(),
        }
    }

    pub fn step(mut self, name: &'static str, run: for<'a> fn(&'a mut C) -> StepFuture<'a>) -> Self {
        self.steps.push(Step::new(name, run));
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|s| s.name).collect()
    }

    /// Run every step until one finishes the request or fails.
    pub async fn run(&self, cx: &mut C) -> Result<(), Error> {
        for step in &self.steps {
            lintel_log::trace!(target: "lintel::lifecycle", "{}: {}", self.name, step.name);
            match (step.run)(cx).await {
                Ok(Flow::Continue) => {}
                Ok(Flow::Done) => {
                    lintel_log::debug!(
                        target: "lintel::lifecycle",
                        "{}: finished early at {}",
                        self.name,
                        step.name
                    );
                    return Ok(());
                }
                Err(err) => {
                    lintel_log::debug!(
                        target: "lintel::lifecycle",
                        "{}: {} failed with {}",
                        self.name,
                        step.name,
                        err.status_code()
                    );
                    return Err(err);
                }
            }
        }
        Ok(())
    }
}

/// Box a synchronous step outcome.
pub(crate) fn ready<'a>(result: StepResult) -> StepFuture<'a> {
    Box::pin(std::future::ready(result))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Trail {
        visited: Vec<&'static str>,
    }

    fn first(cx: &mut Trail) -> StepFuture<'_> {
        cx.visited.push("first");
        ready(Ok(Flow::Continue))
    }

    async fn stop_after_yield(cx: &mut Trail) -> StepResult {
        tokio::task::yield_now().await;
        cx.visited.push("stop");
        Ok(Flow::Done)
    }

    fn stop(cx: &mut Trail) -> StepFuture<'_> {
        Box::pin(stop_after_yield(cx))
    }

    fn fail(cx: &mut Trail) -> StepFuture<'_> {
        cx.visited.push("fail");
        ready(Err(Error::Forbidden("no".into())))
    }

    fn never(cx: &mut Trail) -> StepFuture<'_> {
        cx.visited.push("never");
        ready(Ok(Flow::Continue))
    }

    #[tokio::test]
    async fn test_done_skips_remaining_steps() {
        let pipeline = Pipeline::new("test")
            .step("first", first)
            .step("stop", stop)
            .step("never", never);
        let mut trail = Trail::default();
        pipeline.run(&mut trail).await.unwrap();
        assert_eq!(trail.visited, vec!["first", "stop"]);
    }

    #[tokio::test]
    async fn test_error_short_circuits() {
        let pipeline = Pipeline::new("test")
            .step("fail", fail)
            .step("never", never);
        let mut trail = Trail::default();
        let err = pipeline.run(&mut trail).await.unwrap_err();
        assert_eq!(err.status_code(), 403);
        assert_eq!(trail.visited, vec!["fail"]);
    }

    #[test]
    fn test_step_names_in_order() {
        let pipeline = Pipeline::<Trail>::new("test")
            .step("first", first)
            .step("never", never);
        assert_eq!(pipeline.step_names(), vec!["first", "never"]);
        assert_eq!(pipeline.name(), "test");
    }
}
