use bitvec::{BitArr, array::BitArray};

pub const DISPLAY_WIDTH: usize = 64;
pub const DISPLAY_HEIGHT: usize = 32;
const PIXEL_COUNT: usize = DISPLAY_WIDTH * DISPLAY_HEIGHT;

/// 64x32 monochrome screen, one bit per cell, row-major.
#[derive(Debug, Clone)]
pub struct Framebuffer {
    pixels: BitArr!(for PIXEL_COUNT),
}

impl Framebuffer {
    pub fn new() -> Self {
        Framebuffer {
            pixels: BitArray::ZERO,
        }
    }

    pub fn clear(&mut self) {
        self.pixels.fill(false);
    }

    /// Reads a cell. Coordinates wrap around the screen edges.
    pub fn pixel(&self, x: usize, y: usize) -> bool {
        self.pixels[Self::offset(x, y)]
    }

    /// XORs an 8-pixel-wide sprite onto the screen with its top-left corner at
    /// `(x, y)`. Cells that fall off an edge wrap to the opposite one. Returns
    /// whether any lit cell was turned off.
    pub fn draw_sprite(&mut self, x: usize, y: usize, sprite: &[u8]) -> bool {
        let mut collision = false;

        for (row, &byte) in sprite.iter().enumerate() {
            for bit in 0..8 {
                if (byte >> (7 - bit)) & 1 == 0 {
                    continue;
                }
                let index = Self::offset(x + bit, y + row);
                let current = self.pixels[index];
                collision |= current;
                self.pixels.set(index, !current);
            }
        }
        collision
    }

    pub fn rows(&self) -> impl Iterator<Item = impl Iterator<Item = bool>> {
        self.pixels[..PIXEL_COUNT]
            .chunks(DISPLAY_WIDTH)
            .map(|row| row.iter().by_vals())
    }

    /// Number of lit cells.
    pub fn lit(&self) -> usize {
        self.pixels[..PIXEL_COUNT].count_ones()
    }

    /// Row-major presentation buffer where every cell becomes a `factor` x `factor` block.
    pub fn scaled(&self, factor: usize) -> Vec<bool> {
        let width = DISPLAY_WIDTH * factor;
        let height = DISPLAY_HEIGHT * factor;
        let mut out = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                out.push(self.pixel(x / factor, y / factor));
            }
        }
        out
    }

    fn offset(x: usize, y: usize) -> usize {
        (y % DISPLAY_HEIGHT) * DISPLAY_WIDTH + (x % DISPLAY_WIDTH)
    }
}

impl Default for Framebuffer {
    fn default() -> Self {
        Self::new()
    }
}
