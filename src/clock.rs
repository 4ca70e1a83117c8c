use std::time::Duration;

/// Blocks the calling thread between device operations.
///
/// Replay timing goes through this trait so tests can substitute a virtual clock.
pub trait Clock {
    fn sleep(&self, duration: Duration);
}

/// Wall clock backed by [`std::thread::sleep`]
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn system_clock_blocks_for_the_duration() {
        let start = Instant::now();
        SystemClock.sleep(Duration::from_millis(20));
        assert!(start.elapsed() >= Duration::from_millis(20));
    }
}
