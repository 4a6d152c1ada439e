use crate::error::{ExecutionError, RomError};
use crate::{Address, MEM_SIZE, PROGRAM_START};

pub const FONT_ADDR: Address = 0x000;
pub const FONT_HEIGHT: usize = 5;

/// Largest program image that fits between the program start and the end of memory.
pub const MAX_ROM_SIZE: usize = MEM_SIZE - PROGRAM_START as usize;

const FONT_DATA: [u8; 16 * FONT_HEIGHT] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];

/// Flat 4 KiB byte store. Every access is bounds checked.
pub struct Memory {
    data: [u8; MEM_SIZE],
}

impl Memory {
    pub fn new() -> Self {
        let mut memory = Memory {
            data: [0; MEM_SIZE],
        };
        memory.clear();
        memory
    }

    /// Zeroes the whole address space and restores the hex font glyphs.
    pub fn clear(&mut self) {
        self.data.fill(0);
        let font = FONT_ADDR as usize;
        self.data[font..font + FONT_DATA.len()].copy_from_slice(&FONT_DATA);
    }

    pub fn read(&self, addr: usize) -> Result<u8, ExecutionError> {
        self.data
            .get(addr)
            .copied()
            .ok_or(ExecutionError::OutOfBoundsAddress { address: addr })
    }

    pub fn write(&mut self, addr: usize, value: u8) -> Result<(), ExecutionError> {
        let cell = self
            .data
            .get_mut(addr)
            .ok_or(ExecutionError::OutOfBoundsAddress { address: addr })?;
        *cell = value;
        Ok(())
    }

    /// Borrows `len` bytes starting at `addr`, failing if any of them lies past the end.
    pub fn slice(&self, addr: usize, len: usize) -> Result<&[u8], ExecutionError> {
        let end = addr + len;
        if end > MEM_SIZE {
            return Err(ExecutionError::OutOfBoundsAddress { address: end - 1 });
        }
        Ok(&self.data[addr..end])
    }

    pub fn slice_mut(&mut self, addr: usize, len: usize) -> Result<&mut [u8], ExecutionError> {
        let end = addr + len;
        if end > MEM_SIZE {
            return Err(ExecutionError::OutOfBoundsAddress { address: end - 1 });
        }
        Ok(&mut self.data[addr..end])
    }

    /// Copies a program image to the program start. The rest of memory is left as is.
    pub fn load_rom(&mut self, rom: &[u8]) -> Result<(), RomError> {
        if rom.len() > MAX_ROM_SIZE {
            return Err(RomError::TooLarge {
                size: rom.len(),
                max: MAX_ROM_SIZE,
            });
        }
        let start = PROGRAM_START as usize;
        self.data[start..start + rom.len()].copy_from_slice(rom);
        Ok(())
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}
