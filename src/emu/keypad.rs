/// CHIP-8 key value at each keypad position.
///
/// Positions follow the physical 4x4 grid row by row:
/// ```text
/// 1 2 3 C
/// 4 5 6 D
/// 7 8 9 E
/// A 0 B F
/// ```
pub const KEYPAD_LAYOUT: [u8; 16] = [
    0x1, 0x2, 0x3, 0xC, //
    0x4, 0x5, 0x6, 0xD, //
    0x7, 0x8, 0x9, 0xE, //
    0xA, 0x0, 0xB, 0xF, //
];

/// Input latch: pressed state per keypad position, overwritten wholesale on each poll.
#[derive(Debug, Default, Clone)]
pub struct Keypad {
    pressed: [bool; 16],
}

impl Keypad {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_all(&mut self, pressed: [bool; 16]) {
        self.pressed = pressed;
    }

    pub fn state(&self) -> [bool; 16] {
        self.pressed
    }

    /// Whether the key with CHIP-8 value `value` is held. Values above 0xF never are.
    pub fn is_pressed(&self, value: u8) -> bool {
        KEYPAD_LAYOUT
            .iter()
            .position(|&key| key == value)
            .is_some_and(|pos| self.pressed[pos])
    }

    /// Value of the lowest-positioned pressed key.
    pub fn first_pressed(&self) -> Option<u8> {
        self.pressed
            .iter()
            .position(|&down| down)
            .map(|pos| KEYPAD_LAYOUT[pos])
    }
}
