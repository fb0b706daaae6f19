//! Execution-tracking sink used by components and user scripts for logging.

use crate::config::FlowStep;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warn => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

/// Receives log lines tagged with the thread the component instance runs on
/// and the flow step it belongs to.
pub trait ExecutionTracker: Send + Sync {
    fn log(&self, thread_number: usize, level: LogLevel, step: &FlowStep, message: &str);
}

/// Tracker that emits `tracing` events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingExecutionTracker;

impl ExecutionTracker for TracingExecutionTracker {
    fn log(&self, thread_number: usize, level: LogLevel, step: &FlowStep, message: &str) {
        match level {
            LogLevel::Debug => tracing::debug!(thread = thread_number, step = %step.id, "{}", message),
            LogLevel::Info => tracing::info!(thread = thread_number, step = %step.id, "{}", message),
            LogLevel::Warn => tracing::warn!(thread = thread_number, step = %step.id, "{}", message),
            LogLevel::Error => tracing::error!(thread = thread_number, step = %step.id, "{}", message),
        }
    }
}

/// A log line captured by [`MemoryExecutionTracker`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedLog {
    pub thread_number: usize,
    pub level: LogLevel,
    pub step_id: String,
    pub message: String,
}

/// Tracker that keeps log lines in memory.
#[derive(Debug, Default)]
pub struct MemoryExecutionTracker {
    logs: Mutex<Vec<TrackedLog>>,
}

impl MemoryExecutionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn logs(&self) -> Vec<TrackedLog> {
        self.logs.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

impl ExecutionTracker for MemoryExecutionTracker {
    fn log(&self, thread_number: usize, level: LogLevel, step: &FlowStep, message: &str) {
        if let Ok(mut logs) = self.logs.lock() {
            logs.push(TrackedLog {
                thread_number,
                level,
                step_id: step.id.clone(),
                message: message.to_string(),
            });
        }
    }
}
