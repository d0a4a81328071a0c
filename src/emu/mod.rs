mod chip8;
mod display;
mod execute;
mod font;
mod keypad;
mod machine;
mod memory;
mod opcode;
mod registers;
mod stack;
mod timer;
mod types;

pub use chip8::*;
pub use display::*;
pub use font::{FONT, FONT_END_ADDRESS, FONT_START_ADDRESS};
pub use keypad::*;
pub use machine::*;
pub use memory::*;
pub use opcode::*;
pub use registers::*;
pub use stack::*;
pub use timer::*;
pub use types::*;
