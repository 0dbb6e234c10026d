//! Prediction script runner: `<program> [script] '<symptoms json>'`.

use std::time::Duration;

use futures::{future::BoxFuture, FutureExt};
use log::{info, warn};
use serde_json::Value;
use tokio::{sync::Semaphore, time::timeout};

use super::ProcessInvocation;
use crate::{
    config::GatewayConfig,
    execution::{ExecutionFailure, PredictionError, PredictionExecutor},
};

#[derive(Debug)]
pub struct ScriptExecutor {
    program: String,
    script: Option<String>,
    timeout: Option<Duration>,
    limiter: Option<Semaphore>,
}

impl ScriptExecutor {
    pub fn new(program: impl Into<String>, script: Option<String>) -> Self {
        Self {
            program: program.into(),
            script,
            timeout: None,
            limiter: None,
        }
    }

    pub fn from_config(cfg: &GatewayConfig) -> Self {
        let mut exec = Self::new(cfg.program.clone(), cfg.script.clone());
        exec.timeout = cfg.timeout;
        exec.limiter = cfg.max_concurrency.map(Semaphore::new);
        exec
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_max_concurrency(mut self, n: usize) -> Self {
        self.limiter = Some(Semaphore::new(n));
        self
    }

    /// Arguments after the program name; the symptoms go last as compact JSON.
    pub fn args(&self, symptoms: &[Value]) -> Vec<String> {
        let payload = Value::Array(symptoms.to_vec()).to_string();
        self.script.iter().cloned().chain(std::iter::once(payload)).collect()
    }

    async fn run(&self, symptoms: &[Value]) -> Result<Value, PredictionError> {
        let _permit = match &self.limiter {
            // The semaphore is never closed.
            Some(sem) => sem.acquire().await.ok(),
            None => None,
        };

        let invocation = ProcessInvocation::spawn(&self.program, self.args(symptoms))?;
        let output = match self.timeout {
            // Dropping the invocation on expiry kills the child.
            Some(limit) => timeout(limit, invocation.wait())
                .await
                .map_err(|_| ExecutionFailure::TimedOut(limit))??,
            None => invocation.wait().await?,
        };

        if !output.status.success() {
            return Err(match output.status.code() {
                Some(code) => ExecutionFailure::ExitCode(code),
                None => ExecutionFailure::Signaled,
            }
            .into());
        }

        serde_json::from_slice(&output.stdout).map_err(|e| {
            warn!(
                "{} produced unparseable output: {}",
                self.program,
                String::from_utf8_lossy(&output.stdout).trim()
            );
            PredictionError::Output(e)
        })
    }
}

impl PredictionExecutor for ScriptExecutor {
    fn predict<'a>(&'a self, symptoms: &'a [Value]) -> BoxFuture<'a, Result<Value, PredictionError>> {
        info!("running prediction for {} symptom(s)", symptoms.len());
        self.run(symptoms).boxed()
    }
}
