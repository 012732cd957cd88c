use std::time::Duration;

/// Remaining-request budget across the three rolling windows the people
/// API enforces (per-minute, per-hour, per-day).
///
/// Counters are server-authoritative: they only move when
/// [`record_observed`](QuotaState::record_observed) is fed the values
/// echoed back in response headers. Nothing here decrements locally or
/// guesses at window resets, so a counter stays at zero until the
/// server says otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotaState {
    minute: u32,
    hour: u32,
    day: u32,
}

impl Default for QuotaState {
    fn default() -> Self {
        Self::new()
    }
}

impl QuotaState {
    /// Starts every window at 1: enough headroom to send a single probe
    /// request, whose response headers then seed the real counters.
    pub fn new() -> Self {
        Self {
            minute: 1,
            hour: 1,
            day: 1,
        }
    }

    /// Whether a request can be issued right now without tripping any window.
    pub fn can_request(&self) -> bool {
        self.minute > 0 && self.hour > 0 && self.day > 0
    }

    /// How long to pause before the next attempt.
    ///
    /// The widest exhausted window wins: a drained day budget means a
    /// 24 hour wait even if the minute window would clear in seconds.
    pub fn time_until_available(&self) -> Duration {
        if self.day == 0 {
            Duration::from_secs(24 * 60 * 60)
        } else if self.hour == 0 {
            Duration::from_secs(60 * 60)
        } else if self.minute == 0 {
            Duration::from_secs(60)
        } else {
            Duration::ZERO
        }
    }

    /// Overwrites counters with the values the server reported.
    ///
    /// Each header is optional; an absent one leaves that window untouched
    /// rather than resetting it.
    pub fn record_observed(&mut self, day: Option<u32>, hour: Option<u32>, minute: Option<u32>) {
        if let Some(d) = day {
            self.day = d;
        }
        if let Some(h) = hour {
            self.hour = h;
        }
        if let Some(m) = minute {
            self.minute = m;
        }
    }

    pub fn minute(&self) -> u32 {
        self.minute
    }

    pub fn hour(&self) -> u32 {
        self.hour
    }

    pub fn day(&self) -> u32 {
        self.day
    }
}
