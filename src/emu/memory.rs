use super::{
    Chip8Error,
    font::{FONT, FONT_END_ADDRESS, FONT_START_ADDRESS},
};

// The constants are specified by the CHIP-8 specification
pub const MEMORY_SIZE: usize = 4096;
pub const ROM_START_ADDRESS: usize = 0x200;
pub const MAX_ROM_SIZE: usize = MEMORY_SIZE - ROM_START_ADDRESS;

/// Flat 4KB address space. Every access wraps modulo `MEMORY_SIZE`.
pub struct Memory {
    bytes: [u8; MEMORY_SIZE],
}

impl Memory {
    /// Zeroed memory with the font seeded at `FONT_START_ADDRESS`.
    pub fn new() -> Self {
        let mut bytes = [0; MEMORY_SIZE];
        bytes[FONT_START_ADDRESS..FONT_END_ADDRESS].copy_from_slice(&FONT);
        Self { bytes }
    }

    pub fn read(&self, addr: u16) -> u8 {
        self.bytes[wrap(addr)]
    }

    /// Writes a byte, except into the font range, which programs may not overwrite.
    pub fn write(&mut self, addr: u16, value: u8) {
        let addr = wrap(addr);
        if (FONT_START_ADDRESS..FONT_END_ADDRESS).contains(&addr) {
            log::warn!("Dropped store of {value:#04X} into font area at {addr:#05X}");
            return;
        }
        self.bytes[addr] = value;
    }

    /// Big-endian 16-bit word at `addr` and `addr + 1`.
    pub fn read_word(&self, addr: u16) -> u16 {
        u16::from_be_bytes([self.read(addr), self.read(addr.wrapping_add(1))])
    }

    /// Clears the program region and copies `rom` to `ROM_START_ADDRESS`.
    ///
    /// Memory is left untouched when the ROM does not fit.
    pub fn load_program(&mut self, rom: &[u8]) -> Result<(), Chip8Error> {
        let program = self
            .bytes
            .get_mut(ROM_START_ADDRESS..)
            .filter(|region| rom.len() <= region.len())
            .ok_or(Chip8Error::RomTooLarge {
                size: rom.len(),
                max_size: MAX_ROM_SIZE,
            })?;

        program.fill(0);
        program[..rom.len()].copy_from_slice(rom);
        Ok(())
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bytes
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

fn wrap(addr: u16) -> usize {
    usize::from(addr) % MEMORY_SIZE
}
