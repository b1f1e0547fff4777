//! Linking commands into all-or-nothing sequences.

use crate::pattern::Captures;
use crate::queue::{Command, OnFailure, OnSuccess, Queue, Timing};
use std::rc::Rc;
use tracing::{debug, warn};

/// Wrap `steps` so each success enqueues the following step and any failure
/// reports to `on_failure` and stops.
///
/// Returns the first step, ready to enqueue, or `None` for an empty chain.
/// Each step's own callbacks still run, before the chain's. `on_success` runs
/// after the last step's success callback with that step's captures.
pub(crate) fn link(
    steps: &[Command],
    on_success: Option<OnSuccess>,
    on_failure: Option<OnFailure>,
) -> Option<Command> {
    let total = steps.len();
    let mut next: Option<Command> = None;

    for (index, step) in steps.iter().enumerate().rev() {
        let mut command = step.clone();
        let (step_success, step_failure) = command.take_callbacks();
        let follow = next.take();
        let chain_success = on_success.clone();
        let chain_failure = on_failure.clone();

        let success: OnSuccess = Rc::new(move |queue: &mut Queue, captures: &Captures| {
            if let Some(f) = &step_success {
                f(queue, captures);
            }
            match &follow {
                Some(following) => {
                    debug!(step = index + 2, total, "chain advancing");
                    if let Err(err) = queue.push(following.clone(), Timing::Next) {
                        warn!(step = index + 2, total, %err, "chain step could not be enqueued");
                        if let Some(f) = &chain_failure {
                            f(queue, following);
                        }
                    }
                }
                None => {
                    debug!(total, "chain complete");
                    if let Some(f) = &chain_success {
                        f(queue, captures);
                    }
                }
            }
        });

        let chain_failure = on_failure.clone();
        let failure: OnFailure = Rc::new(move |queue: &mut Queue, failed: &Command| {
            debug!(step = index + 1, total, "chain stopped");
            if let Some(f) = &step_failure {
                f(queue, failed);
            }
            if let Some(f) = &chain_failure {
                f(queue, failed);
            }
        });

        next = Some(command.with_success(Some(success)).with_failure(Some(failure)));
    }

    next
}
