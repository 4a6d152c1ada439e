use crate::Address;

pub const NUM_REGISTERS: usize = 16;
pub const STACK_DEPTH: usize = 16;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Register {
    V0,
    V1,
    V2,
    V3,
    V4,
    V5,
    V6,
    V7,
    V8,
    V9,
    VA,
    VB,
    VC,
    VD,
    VE,
    VF,
}

impl Register {
    /// Selects a register from the low four bits of `value`.
    pub fn from_nibble(value: u8) -> Self {
        match value & 0x0F {
            0x0 => Register::V0,
            0x1 => Register::V1,
            0x2 => Register::V2,
            0x3 => Register::V3,
            0x4 => Register::V4,
            0x5 => Register::V5,
            0x6 => Register::V6,
            0x7 => Register::V7,
            0x8 => Register::V8,
            0x9 => Register::V9,
            0xA => Register::VA,
            0xB => Register::VB,
            0xC => Register::VC,
            0xD => Register::VD,
            0xE => Register::VE,
            _ => Register::VF,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

/// General purpose registers V0-VF.
#[derive(Debug, Default)]
pub struct RegisterBank {
    registers: [u8; NUM_REGISTERS],
}

impl RegisterBank {
    pub fn new() -> Self {
        RegisterBank {
            registers: [0; NUM_REGISTERS],
        }
    }

    pub fn read(&self, reg: Register) -> u8 {
        self.registers[reg.index()]
    }

    pub fn write(&mut self, reg: Register, value: u8) {
        self.registers[reg.index()] = value;
    }

    /// Registers V0 through `last`, inclusive.
    pub fn through(&self, last: Register) -> &[u8] {
        &self.registers[..=last.index()]
    }

    pub fn through_mut(&mut self, last: Register) -> &mut [u8] {
        &mut self.registers[..=last.index()]
    }

    pub fn clear(&mut self) {
        self.registers.fill(0);
    }
}

/// Return address stack with a fixed nesting limit.
#[derive(Debug, Default)]
pub struct CallStack {
    frames: [Address; STACK_DEPTH],
    len: usize,
}

impl CallStack {
    pub fn new() -> Self {
        CallStack {
            frames: [0; STACK_DEPTH],
            len: 0,
        }
    }

    /// Pushes a return address. Returns `false` when the stack is already full.
    #[must_use]
    pub fn push(&mut self, addr: Address) -> bool {
        match self.frames.get_mut(self.len) {
            Some(slot) => {
                *slot = addr;
                self.len += 1;
                true
            }
            None => false,
        }
    }

    pub fn pop(&mut self) -> Option<Address> {
        self.len = self.len.checked_sub(1)?;
        Some(self.frames[self.len])
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }
}
