use std::time::{Duration, Instant};

/// Paces the detection loop, one tick per display refresh.
pub trait RefreshTicker: Send {
    /// Blocks until the next tick is due.
    fn wait_next(&mut self);
}

/// Fixed-rate ticker. Ticks that are already overdue return immediately
/// and the schedule restarts from now rather than bursting to catch up.
pub struct IntervalTicker {
    interval: Duration,
    next: Instant,
}

impl IntervalTicker {
    pub fn new(hz: u32) -> Self {
        Self::from_interval(Duration::from_secs(1) / hz.max(1))
    }

    pub fn from_interval(interval: Duration) -> Self {
        Self {
            interval,
            next: Instant::now() + interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl RefreshTicker for IntervalTicker {
    fn wait_next(&mut self) {
        let now = Instant::now();
        if self.next > now {
            std::thread::sleep(self.next - now);
            self.next += self.interval;
        } else {
            self.next = now + self.interval;
        }
    }
}
