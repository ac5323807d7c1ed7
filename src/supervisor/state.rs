//! Supervisor state, owned by the coordinator task.

use tokio::process::Child;

/// Depth-1, latest-wins work queue.
///
/// At most one run is in flight and at most one more is queued; any number
/// of requests during a run collapse into that single queued run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WorkSlot {
    in_flight: bool,
    queued: bool,
}

impl WorkSlot {
    /// Request a run. Returns `true` when the caller should start it now.
    pub fn request(&mut self) -> bool {
        if self.in_flight {
            self.queued = true;
            false
        } else {
            self.in_flight = true;
            true
        }
    }

    /// Finish the current run. Returns `true` when the queued run should
    /// start immediately (the slot stays in flight).
    pub fn finish(&mut self) -> bool {
        if self.queued {
            self.queued = false;
            true
        } else {
            self.in_flight = false;
            false
        }
    }

    /// Drop any queued run and mark the slot idle.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    #[cfg(test)]
    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    #[cfg(test)]
    pub fn queued(&self) -> bool {
        self.queued
    }
}

/// Step of the restart cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    Stopping,
    WaitingForPort,
    Syncing,
    Starting,
}

#[derive(Debug)]
pub struct SupervisorState {
    pub requested_port: u16,
    pub active_port: u16,
    pub child: Option<Child>,
    pub revision: String,
    pub sync: WorkSlot,
    pub restart: WorkSlot,
    pub shutting_down: bool,
    pub phase: Phase,
}

impl SupervisorState {
    pub fn new(requested_port: u16) -> Self {
        Self {
            requested_port,
            active_port: requested_port,
            child: None,
            revision: String::new(),
            sync: WorkSlot::default(),
            restart: WorkSlot::default(),
            shutting_down: false,
            phase: Phase::Idle,
        }
    }
}
