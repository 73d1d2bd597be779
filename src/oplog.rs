//! In-memory record of the steps taken by one relocation.
//!
//! Not durable: after a crash, recovery relies on what is observable on disk
//! (source missing, target populated, no link, ...), never on this log.

use tracing::debug;

use crate::model::OperationStep;

#[derive(Debug, Default)]
pub struct OperationLog {
    steps: Vec<OperationStep>,
}

impl OperationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a step. Steps are never modified once appended.
    pub fn append(&mut self, step: OperationStep) {
        debug!(index = self.steps.len(), step = %step, "operation step recorded");
        self.steps.push(step);
    }

    /// Steps in the order they were recorded.
    pub fn steps_so_far(&self) -> &[OperationStep] {
        &self.steps
    }

    /// Owned copy for attaching to an outcome.
    pub fn snapshot(&self) -> Vec<OperationStep> {
        self.steps.clone()
    }

    pub fn clear(&mut self) {
        self.steps.clear();
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
