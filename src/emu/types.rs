use std::{io, path::PathBuf};

/// Outcome of a single `Chip8::step` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepResult {
    /// An instruction was executed.
    Executed,
    /// FX0A found no key pressed; PC was left on the same instruction.
    WaitingForKey,
    /// No program is loaded, nothing happened.
    Idle,
}

/// Error types that can occur during CHIP-8 emulation
#[derive(Debug, thiserror::Error)]
pub enum Chip8Error {
    #[error("Failed to read ROM file {}", .path.display())]
    LoadFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("ROM is too large ({size} bytes), max size is {max_size} bytes")]
    RomTooLarge { size: usize, max_size: usize },

    #[error("Stack overflow: call at {pc:#05X} with a full call stack")]
    StackOverflow { pc: u16 },

    #[error("Stack underflow: return at {pc:#05X} with an empty call stack")]
    StackUnderflow { pc: u16 },

    #[error("Unknown opcode {opcode:#06X} at {pc:#05X}")]
    UnknownOpcode { opcode: u16, pc: u16 },
}

impl Chip8Error {
    /// Fatal errors halt the execution engine; the rest leave the VM usable.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Chip8Error::StackOverflow { .. }
                | Chip8Error::StackUnderflow { .. }
                | Chip8Error::UnknownOpcode { .. }
        )
    }
}

pub const DISPLAY_X: usize = 64;
pub const DISPLAY_Y: usize = 32;
/// A type alias for the CHIP-8 display buffer representation
pub type Display<T> = [[T; DISPLAY_X]; DISPLAY_Y];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_cpu_faults_are_fatal() {
        let load = Chip8Error::RomTooLarge {
            size: 4000,
            max_size: 3584,
        };
        assert!(!load.is_fatal());
        assert!(Chip8Error::StackUnderflow { pc: 0x200 }.is_fatal());
        assert!(
            Chip8Error::UnknownOpcode {
                opcode: 0xFFFF,
                pc: 0x200
            }
            .is_fatal()
        );
    }

    #[test]
    fn messages_carry_hex_addresses() {
        let err = Chip8Error::UnknownOpcode {
            opcode: 0x800F,
            pc: 0x204,
        };
        assert_eq!(err.to_string(), "Unknown opcode 0x800F at 0x204");
    }
}
