use std::time::{Duration, Instant};

/// Quiet period after the last change before the debouncer fires.
pub const DEBOUNCE_MS: u64 = 250;

/// Cancel-and-reschedule timer.
///
/// Every `touch` pushes the deadline out again; `take_if_ready` fires once
/// when the deadline has passed and disarms the timer. No business logic.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    /// Record a change: (re)start the timer.
    pub fn touch(&mut self) {
        self.deadline = Some(Instant::now() + self.delay);
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    /// Fire if the quiet period has elapsed. Returns `true` at most once per burst.
    pub fn take_if_ready(&mut self) -> bool {
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Precise sleep duration until the timer can fire.
    pub fn sleep_duration(&self) -> Duration {
        let Some(deadline) = self.deadline else {
            return Duration::from_secs(86400);
        };
        deadline
            .saturating_duration_since(Instant::now())
            .max(Duration::from_millis(1))
    }
}
