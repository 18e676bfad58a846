//! Named, timed pipeline steps.

use mutval_core::Result;
use std::time::Instant;
use tracing::{error, info, info_span};

/// Runs one closure inline and reports how long it took
pub struct SingleTaskExecutor<F> {
    name: &'static str,
    task: F,
}

impl<F, T> SingleTaskExecutor<F>
where
    F: FnOnce() -> Result<T>,
{
    pub fn new(name: &'static str, task: F) -> Self {
        Self { name, task }
    }

    pub fn execute(self) -> Result<T> {
        let span = info_span!("task", name = self.name);
        let _guard = span.enter();

        info!("{}", self.name);
        let start = Instant::now();
        let result = (self.task)();
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match &result {
            Ok(_) => info!(elapsed_ms, "{} done", self.name),
            Err(e) => error!(elapsed_ms, error = %e, "{} failed", self.name),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mutval_core::Error;

    #[test]
    fn test_returns_task_result() {
        let value = SingleTaskExecutor::new("Counting", || Ok(41 + 1)).execute();
        assert_eq!(value.unwrap(), 42);
    }

    #[test]
    fn test_propagates_failure() {
        let result: Result<()> =
            SingleTaskExecutor::new("Failing", || Err(Error::Usage("nope".into()))).execute();
        assert!(matches!(result, Err(Error::Usage(_))));
    }

    #[test]
    fn test_runs_inline() {
        let mut touched = false;
        SingleTaskExecutor::new("Touching", || {
            touched = true;
            Ok(())
        })
        .execute()
        .unwrap();
        assert!(touched);
    }
}
