use std::path::PathBuf;

use crate::Address;

/// Errors raised while loading a program image.
#[derive(Debug, thiserror::Error)]
pub enum RomError {
    #[error("ROM is too large ({size} bytes), max size is {max} bytes")]
    TooLarge { size: usize, max: usize },

    #[error("unable to read ROM {}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised while executing instructions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecutionError {
    #[error("stack overflow: call at {pc:#05X} exceeds the maximum nesting depth")]
    StackOverflow { pc: Address },

    #[error("stack underflow: return at {pc:#05X} with an empty call stack")]
    StackUnderflow { pc: Address },

    #[error("memory access out of bounds at address {address:#06X}")]
    OutOfBoundsAddress { address: usize },

    #[error("unknown opcode {opcode:#06X}")]
    UnknownOpcode { opcode: u16 },

    #[error("machine is halted after a fault, reset or reload the program")]
    Halted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    #[error("key index {0} is outside the keypad range 0-15")]
    OutOfRange(u8),
}
