use std::time::{Duration, Instant};

/// Fixed-rate pacer for the main loop.
///
/// Each `sleep` call compensates for the time the loop body took and for
/// any oversleep in the previous call, so loop iterations start on the
/// period grid rather than drifting by the accumulated error. Deviations
/// longer than one whole period are forgotten instead of being paid back
/// over later iterations.
pub struct Interval {
    period: Duration,
    body_start: Instant,
    oversleep: Duration,
}

impl Interval {
    pub fn new(period: Duration) -> Self {
        Interval {
            period,
            body_start: Instant::now(),
            oversleep: Duration::ZERO,
        }
    }

    pub fn sleep(&mut self) {
        let body_duration = self.body_start.elapsed();
        let sleep_duration = self
            .period
            .saturating_sub(body_duration)
            .saturating_sub(self.oversleep);

        if sleep_duration.is_zero() {
            // Behind by more than a period, drop the debt and keep going.
            self.oversleep = Duration::ZERO;
        } else {
            let before = Instant::now();
            spin_sleep::sleep(sleep_duration);
            self.oversleep = before.elapsed().saturating_sub(sleep_duration);
        }

        log::trace!(
            "frame body {} us, slept {} us, overslept {} us",
            body_duration.as_micros(),
            sleep_duration.as_micros(),
            self.oversleep.as_micros()
        );

        self.body_start = Instant::now();
    }
}
