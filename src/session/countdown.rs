use super::errors::SessionError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Tick {
    /// Not counting: paused by the student.
    Paused,
    Running { remaining: u64 },
    /// Reported exactly once, on the tick that reaches zero.
    Expired,
    /// Already expired or stopped; the tick changed nothing.
    Stopped,
}

/// Seconds left in the session. Never counts below zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Countdown {
    total: u64,
    remaining: u64,
    paused: bool,
    stopped: bool,
}

impl Countdown {
    pub(crate) fn new(total_seconds: u64) -> Self {
        Self { total: total_seconds, remaining: total_seconds, paused: false, stopped: false }
    }

    pub(crate) fn remaining(&self) -> u64 {
        self.remaining
    }

    pub(crate) fn elapsed(&self) -> u64 {
        self.total - self.remaining
    }

    pub(crate) fn is_paused(&self) -> bool {
        self.paused
    }

    pub(crate) fn is_expired(&self) -> bool {
        self.remaining == 0
    }

    #[cfg(test)]
    pub(crate) fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub(crate) fn tick(&mut self) -> Tick {
        if self.stopped || self.remaining == 0 {
            return Tick::Stopped;
        }
        if self.paused {
            return Tick::Paused;
        }

        self.remaining -= 1;
        if self.remaining == 0 {
            self.stopped = true;
            Tick::Expired
        } else {
            Tick::Running { remaining: self.remaining }
        }
    }

    pub(crate) fn pause(&mut self) -> Result<(), SessionError> {
        if self.stopped || self.remaining == 0 {
            return Err(SessionError::TimeExpired);
        }
        self.paused = true;
        Ok(())
    }

    pub(crate) fn resume(&mut self) -> Result<(), SessionError> {
        if self.stopped || self.remaining == 0 {
            return Err(SessionError::TimeExpired);
        }
        self.paused = false;
        Ok(())
    }

    /// Freezes the clock at its current value; later ticks are no-ops.
    pub(crate) fn stop(&mut self) {
        self.stopped = true;
        self.paused = false;
    }
}
