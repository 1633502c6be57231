use std::thread;
use std::time::Duration;

/// Pause between heartbeat lines.
pub const HEARTBEAT_PERIOD_MS: u64 = 1_000;

/// Cooperative delay. The single thread of execution blocks entirely for the
/// duration; nothing else is pending.
pub trait Delay {
    fn delay_ms(&mut self, ms: u64);
}

/// Wall-clock delay backed by the OS scheduler.
#[derive(Debug, Default)]
pub struct WallClock;

impl Delay for WallClock {
    fn delay_ms(&mut self, ms: u64) {
        thread::sleep(Duration::from_millis(ms));
    }
}
