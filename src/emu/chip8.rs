use std::path::Path;

use super::{
    CallStack, Chip8Error, Display, Framebuffer, Keypad, Memory, Opcode, Registers, StepResult,
    memory::ROM_START_ADDRESS, timer::TimerState,
};

/// CHIP-8 virtual machine state
pub struct Chip8 {
    pub(crate) registers: Registers,
    pub(crate) memory: Memory,
    pub(crate) stack: CallStack,
    /// Display buffer: 64x32 monochrome pixels
    pub(crate) display: Framebuffer,
    /// Keypad state, indexed by keypad position
    pub(crate) keypad: Keypad,

    /// Set once a program is loaded; `step` and `tick_timers` do nothing until then.
    ready: bool,
    /// Latched when the sound timer runs out, cleared by the audio side.
    sound_requested: bool,
}

impl Chip8 {
    pub fn new() -> Self {
        Chip8 {
            registers: Registers::new(),
            memory: Memory::new(),
            stack: CallStack::new(),
            display: Framebuffer::new(),
            keypad: Keypad::new(),
            ready: false,
            sound_requested: false,
        }
    }

    /// Restores power-on state in place. The VM is un-ready until the next `load`.
    pub fn reset(&mut self) {
        *self = Self::new();
        log::info!("CHIP-8 reset");
    }

    /// Loads a ROM into the program region and marks the VM ready.
    pub fn load(&mut self, rom: &[u8]) -> Result<(), Chip8Error> {
        self.memory.load_program(rom)?;

        // Set program counter to start of ROM
        self.registers.pc = ROM_START_ADDRESS as u16;
        self.ready = true;

        log::info!("Loaded {} byte ROM at {ROM_START_ADDRESS:#05X}", rom.len());
        Ok(())
    }

    /// Reads a ROM file and loads it. The VM is unchanged if either step fails.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<(), Chip8Error> {
        let path = path.as_ref();
        let rom = std::fs::read(path).map_err(|source| Chip8Error::LoadFailure {
            path: path.to_path_buf(),
            source,
        })?;
        self.load(&rom)
    }

    /// Executes a single CPU cycle (fetch, decode, execute).
    pub fn step(&mut self) -> Result<StepResult, Chip8Error> {
        if !self.ready {
            return Ok(StepResult::Idle);
        }

        let raw = self.memory.read_word(self.registers.pc);
        let opcode = Opcode::decode(raw);
        log::trace!("{:#05X}: {raw:04X} {opcode:?}", self.registers.pc);
        self.execute(opcode)
    }

    /// Updates the delay and sound timers. Should be called at 60Hz.
    pub fn tick_timers(&mut self) {
        if !self.ready {
            return;
        }

        self.registers.delay_timer.decrement();
        if self.registers.sound_timer.decrement() == TimerState::Expired {
            self.sound_requested = true;
        }
    }

    /// Returns and clears the one-shot sound request.
    pub fn take_sound_request(&mut self) -> bool {
        std::mem::take(&mut self.sound_requested)
    }

    /// Overwrites the whole keypad state.
    pub fn set_keys(&mut self, pressed: [bool; 16]) {
        self.keypad.set_all(pressed);
    }

    /// Copy of the display for rendering (true = on, false = off).
    pub fn framebuffer(&self) -> Display<bool> {
        self.display.snapshot()
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn registers(&self) -> &Registers {
        &self.registers
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn stack(&self) -> &CallStack {
        &self.stack
    }

    pub fn display(&self) -> &Framebuffer {
        &self.display
    }
}

impl Default for Chip8 {
    fn default() -> Self {
        Self::new()
    }
}
