/// What a single `Timer::decrement` did.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TimerState {
    /// The timer was already at zero.
    Idle,
    /// Decremented and still above zero.
    Running,
    /// Decremented from 1 to 0 on this tick.
    Expired,
}

/// 8-bit countdown register decremented at 60Hz.
#[derive(Debug, Default, Clone, Copy)]
pub struct Timer(u8);

impl Timer {
    pub fn new() -> Self {
        Self(0)
    }

    pub fn store(&mut self, value: u8) {
        self.0 = value;
    }

    pub fn load(&self) -> u8 {
        self.0
    }

    pub fn decrement(&mut self) -> TimerState {
        match self.0 {
            0 => TimerState::Idle,
            1 => {
                self.0 = 0;
                TimerState::Expired
            }
            _ => {
                self.0 -= 1;
                TimerState::Running
            }
        }
    }
}
