//! Countdown watchdog capability and refresh-aware waiting.
//!
//! An external countdown circuit resets the device unless it is refreshed
//! within its period. The core only needs the refresh operation; arming and
//! the reset mechanism itself belong to the embedding.

/// Watchdog countdown period, in seconds.
pub const WATCHDOG_PERIOD_SECONDS: u32 = 8;

/// Refresh intervals of headroom the control loop budgets for before the
/// countdown can expire.
pub const WATCHDOG_GRACE_INTERVALS: u8 = 2;

/// Chunk size used when a wait must be split around refreshes.
pub const REFRESH_CHUNK_MS: u32 = 1_000;

/// Something that can push the watchdog countdown back to full.
pub trait CountdownRefresh {
    fn refresh(&mut self);
}

/// Blocking delay provider.
pub trait Pause {
    fn pause_ms(&mut self, ms: u32);
}

/// Watchdog that does nothing; hosts without a countdown circuit.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopWatchdog;

impl CountdownRefresh for NoopWatchdog {
    fn refresh(&mut self) {}
}

/// Waits for `total_ms`, refreshing the watchdog after every elapsed chunk
/// so a long wait cannot trip the countdown.
pub fn wait_with_refresh<W, P>(watchdog: &mut W, pause: &mut P, total_ms: u32)
where
    W: CountdownRefresh,
    P: Pause,
{
    let mut remaining = total_ms;
    while remaining > REFRESH_CHUNK_MS {
        pause.pause_ms(REFRESH_CHUNK_MS);
        watchdog.refresh();
        remaining -= REFRESH_CHUNK_MS;
    }
    if remaining > 0 {
        pause.pause_ms(remaining);
        watchdog.refresh();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct CountingWatchdog {
        refreshes: usize,
    }

    impl CountdownRefresh for CountingWatchdog {
        fn refresh(&mut self) {
            self.refreshes += 1;
        }
    }

    #[derive(Default)]
    struct RecordingPause {
        slept_ms: u32,
        chunks: usize,
    }

    impl Pause for RecordingPause {
        fn pause_ms(&mut self, ms: u32) {
            self.slept_ms += ms;
            self.chunks += 1;
        }
    }

    #[test]
    fn long_waits_refresh_once_per_chunk() {
        let mut watchdog = CountingWatchdog::default();
        let mut pause = RecordingPause::default();
        wait_with_refresh(&mut watchdog, &mut pause, 3_500);

        assert_eq!(pause.slept_ms, 3_500);
        assert_eq!(pause.chunks, 4);
        assert_eq!(watchdog.refreshes, 4);
    }

    #[test]
    fn short_waits_still_refresh_once() {
        let mut watchdog = CountingWatchdog::default();
        let mut pause = RecordingPause::default();
        wait_with_refresh(&mut watchdog, &mut pause, 250);

        assert_eq!(pause.slept_ms, 250);
        assert_eq!(watchdog.refreshes, 1);
    }

    #[test]
    fn zero_wait_neither_sleeps_nor_refreshes() {
        let mut watchdog = CountingWatchdog::default();
        let mut pause = RecordingPause::default();
        wait_with_refresh(&mut watchdog, &mut pause, 0);

        assert_eq!(pause.slept_ms, 0);
        assert_eq!(watchdog.refreshes, 0);
    }

    #[test]
    fn exact_chunk_wait_uses_one_chunk() {
        let mut watchdog = CountingWatchdog::default();
        let mut pause = RecordingPause::default();
        wait_with_refresh(&mut watchdog, &mut pause, REFRESH_CHUNK_MS);

        assert_eq!(pause.chunks, 1);
        assert_eq!(watchdog.refreshes, 1);
    }
}
