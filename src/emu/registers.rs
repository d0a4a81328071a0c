use super::{memory::ROM_START_ADDRESS, timer::Timer};

/// CPU register file. The stack pointer lives in `CallStack`.
#[derive(Debug, Clone)]
pub struct Registers {
    /// General-purpose registers V0-VF (VF is used as a flag register)
    pub v: [u8; 16],
    /// Index register: used for memory operations
    pub i: u16,
    /// Program counter: address of the next instruction to execute
    pub pc: u16,
    pub delay_timer: Timer,
    pub sound_timer: Timer,
}

impl Registers {
    pub fn new() -> Self {
        Self {
            v: [0; 16],
            i: 0,
            pc: ROM_START_ADDRESS as u16,
            delay_timer: Timer::new(),
            sound_timer: Timer::new(),
        }
    }

    /// Moves PC past the current instruction.
    pub fn advance(&mut self) {
        self.pc = self.pc.wrapping_add(2);
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}
