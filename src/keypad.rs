use crate::error::KeyError;

pub const NUM_KEYS: usize = 16;

/// Pressed state of the hexadecimal keypad. The host is the only writer.
#[derive(Debug, Default)]
pub struct Keypad {
    keys: [bool; NUM_KEYS],
}

impl Keypad {
    pub fn new() -> Self {
        Keypad {
            keys: [false; NUM_KEYS],
        }
    }

    pub fn set(&mut self, index: u8, pressed: bool) -> Result<(), KeyError> {
        let key = self
            .keys
            .get_mut(usize::from(index))
            .ok_or(KeyError::OutOfRange(index))?;
        *key = pressed;
        Ok(())
    }

    /// Reads a key using the low nibble of `value`, the way the skip-if-key instructions do.
    pub fn is_pressed(&self, value: u8) -> bool {
        self.keys[usize::from(value & 0x0F)]
    }

    pub fn release_all(&mut self) {
        self.keys.fill(false);
    }
}
