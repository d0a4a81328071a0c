use super::{DISPLAY_X, DISPLAY_Y, Display};

/// Monochrome 64x32 framebuffer, one byte (0 or 1) per pixel.
pub struct Framebuffer {
    cells: Display<u8>,
}

impl Framebuffer {
    pub fn new() -> Self {
        Self {
            cells: [[0; DISPLAY_X]; DISPLAY_Y],
        }
    }

    pub fn clear(&mut self) {
        self.cells = [[0; DISPLAY_X]; DISPLAY_Y];
    }

    /// Pixel at (x, y), both wrapped to the screen size.
    pub fn get(&self, x: usize, y: usize) -> bool {
        self.cells[y % DISPLAY_Y][x % DISPLAY_X] != 0
    }

    /// XORs the pixel at (x, y), wrapping both axes, and returns its prior state.
    pub fn flip(&mut self, x: usize, y: usize) -> u8 {
        let cell = &mut self.cells[y % DISPLAY_Y][x % DISPLAY_X];
        let prior = *cell;
        *cell ^= 1;
        prior
    }

    pub fn is_blank(&self) -> bool {
        self.cells.iter().flatten().all(|&cell| cell == 0)
    }

    /// Copy of the screen for the render collaborator.
    pub fn snapshot(&self) -> Display<bool> {
        let mut out = [[false; DISPLAY_X]; DISPLAY_Y];
        for (dst, src) in out.iter_mut().zip(&self.cells) {
            for (pixel, &cell) in dst.iter_mut().zip(src) {
                *pixel = cell != 0;
            }
        }
        out
    }
}

impl Default for Framebuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flip_reports_prior_state() {
        let mut fb = Framebuffer::new();
        assert_eq!(fb.flip(3, 4), 0);
        assert!(fb.get(3, 4));
        assert_eq!(fb.flip(3, 4), 1);
        assert!(fb.is_blank());
    }

    #[test]
    fn coordinates_wrap_on_both_axes() {
        let mut fb = Framebuffer::new();
        fb.flip(DISPLAY_X, DISPLAY_Y + 1);
        assert!(fb.get(0, 1));
        assert!(fb.snapshot()[1][0]);
    }

    #[test]
    fn clear_blanks_everything() {
        let mut fb = Framebuffer::new();
        fb.flip(10, 10);
        fb.flip(63, 31);
        fb.clear();
        assert!(fb.is_blank());
    }
}
