//! Per-viewport FIFO of applied camera responses
//!
//! The logic thread pushes one response per applied camera record and the
//! render-submission thread pops the oldest when it publishes a frame. Every
//! access takes the lock.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::link::CameraResponseData;

/// Mutex-guarded FIFO shared between the logic and render threads
#[derive(Debug, Default)]
pub struct CameraResponseQueue {
    responses: Mutex<VecDeque<CameraResponseData>>,
}

impl CameraResponseQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    fn responses(&self) -> MutexGuard<'_, VecDeque<CameraResponseData>> {
        self.responses.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a response (logic thread)
    pub fn push(&self, response: CameraResponseData) {
        self.responses().push_back(response);
    }

    /// Remove the oldest response (render thread)
    pub fn pop(&self) -> Option<CameraResponseData> {
        self.responses().pop_front()
    }

    /// Newest response, used for the lens-center shift of the frame being built
    pub fn latest(&self) -> Option<CameraResponseData> {
        self.responses().back().copied()
    }

    /// Newest response, or neutral values while nothing has been applied yet
    pub fn latest_or_neutral(&self) -> CameraResponseData {
        self.latest().unwrap_or_else(CameraResponseData::neutral)
    }

    /// Queued responses
    pub fn len(&self) -> usize {
        self.responses().len()
    }

    /// Whether the queue is empty
    pub fn is_empty(&self) -> bool {
        self.responses().is_empty()
    }
}
