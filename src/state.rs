//! Process lifecycle state.
//!
//! The funnel refuses new work once the process starts draining, so the
//! state has to be readable from every request task without coordination.

use std::sync::{
    Arc,
    atomic::{AtomicU8, Ordering},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BackendState {
    Starting = 0,
    Running = 1,
    ShuttingDown = 2,
}

/// Cheaply cloneable handle on the process state.
#[derive(Debug, Clone, Default)]
pub struct StateHandle {
    state: Arc<AtomicU8>,
}

impl StateHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> BackendState {
        match self.state.load(Ordering::Acquire) {
            0 => BackendState::Starting,
            1 => BackendState::Running,
            _ => BackendState::ShuttingDown,
        }
    }

    pub fn set(&self, state: BackendState) {
        self.state.store(state as u8, Ordering::Release);
    }

    pub fn is_shutting_down(&self) -> bool {
        self.get() == BackendState::ShuttingDown
    }
}
