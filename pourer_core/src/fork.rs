//! Fork/join for the few steps that move two arms at once.
use crate::error::PourError;
use pourer_traits::BoxError;

/// Unit of work for `fork_join`: a label for error reports and the work itself.
pub type Task<'a> = (&'static str, Box<dyn FnOnce() -> Result<(), BoxError> + Send + 'a>);

/// Run every task on its own scoped thread and wait for all of them.
///
/// Results come back over a channel; the first error received wins and is
/// reported as an `Execution` failure indexed by the task's position. A task
/// that panics propagates the panic once the scope joins.
pub fn fork_join(tasks: Vec<Task<'_>>) -> Result<(), PourError> {
    let (tx, rx) = crossbeam_channel::bounded(tasks.len());
    std::thread::scope(|s| {
        for (index, (kind, work)) in tasks.into_iter().enumerate() {
            let tx = tx.clone();
            s.spawn(move || {
                let outcome = work().map_err(|e| PourError::Execution {
                    index,
                    kind,
                    cause: e.to_string(),
                });
                // Receiver outlives the scope; send cannot fail.
                let _ = tx.send(outcome);
            });
        }
    });
    drop(tx);

    let mut first_err = None;
    for outcome in rx.iter() {
        if let Err(e) = outcome {
            tracing::warn!(error = %e, "parallel task failed");
            first_err.get_or_insert(e);
        }
    }
    first_err.map_or(Ok(()), Err)
}
