/// Logical simulation time in abstract units.
pub type SimTime = f64;

/// Source of logical time for the scheduler. Time never moves backwards
/// except through [`Clock::reset`].
pub trait Clock {
    fn now(&self) -> SimTime;
    fn advance_to(&mut self, time: SimTime);
    fn reset(&mut self);
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LogicalClock {
    now: SimTime,
}

impl LogicalClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(now: SimTime) -> Self {
        Self { now }
    }
}

impl Clock for LogicalClock {
    fn now(&self) -> SimTime {
        self.now
    }

    fn advance_to(&mut self, time: SimTime) {
        if time > self.now {
            self.now = time;
        }
    }

    fn reset(&mut self) {
        self.now = 0.0;
    }
}

/// Generation stamp of a pending firing. Only the current generation may fire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TimerToken(u64);

impl TimerToken {
    pub(crate) fn next(self) -> Self {
        TimerToken(self.0.wrapping_add(1))
    }
}
