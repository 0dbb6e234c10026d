//! Execution protocol: the prediction capability and its typed failures.

use std::{io, time::Duration};

use futures::future::BoxFuture;
use serde_json::Value;
use thiserror::Error;

/// Something that turns a symptom list into a prediction.
///
/// The HTTP layer only sees this trait, so handlers can be exercised with a
/// stand-in executor and no child processes.
pub trait PredictionExecutor: Send + Sync {
    fn predict<'a>(&'a self, symptoms: &'a [Value]) -> BoxFuture<'a, Result<Value, PredictionError>>;
}

#[derive(Debug, Error)]
pub enum PredictionError {
    #[error("Invalid symptoms input")]
    InvalidInput,
    #[error("Python script execution failed")]
    Execution(#[source] ExecutionFailure),
    #[error("Error parsing model response")]
    Output(#[source] serde_json::Error),
}

/// Why the prediction process did not complete successfully.
#[derive(Debug, Error)]
pub enum ExecutionFailure {
    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("exited with status code {0}")]
    ExitCode(i32),
    #[error("terminated by signal")]
    Signaled,
    #[error("no exit within {0:?}, killed")]
    TimedOut(Duration),
    #[error("i/o error while collecting output: {0}")]
    Io(#[source] io::Error),
}

impl From<ExecutionFailure> for PredictionError {
    fn from(e: ExecutionFailure) -> Self {
        PredictionError::Execution(e)
    }
}
