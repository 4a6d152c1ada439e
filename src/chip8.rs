use std::path::Path;

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::error::{ExecutionError, KeyError, RomError};
use crate::framebuffer::Framebuffer;
use crate::instruction::{Instruction, decode};
use crate::keypad::Keypad;
use crate::memory::Memory;
use crate::registers::{CallStack, Register, RegisterBank};
use crate::{ADDRESS_MASK, Address, PROGRAM_START, Timer};

/// Complete machine state. Every entry point takes `&mut self`, so one owner
/// drives the machine and any number of independent instances can coexist.
pub struct Chip8 {
    pub(crate) memory: Memory,
    pub(crate) registers: RegisterBank,
    pub(crate) pc: Address,
    pub(crate) index: Address,
    pub(crate) stack: CallStack,
    pub(crate) delay_timer: Timer,
    pub(crate) sound_timer: Timer,
    pub(crate) keypad: Keypad,
    pub(crate) framebuffer: Framebuffer,
    /// Destination register of a pending FX0A.
    pub(crate) awaiting_key: Option<Register>,
    halted: bool,
    pub(crate) rng: StdRng,
}

impl Chip8 {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }

    /// A machine whose random-number instruction produces a reproducible sequence.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Chip8 {
            memory: Memory::new(),
            registers: RegisterBank::new(),
            pc: PROGRAM_START,
            index: 0,
            stack: CallStack::new(),
            delay_timer: 0,
            sound_timer: 0,
            keypad: Keypad::new(),
            framebuffer: Framebuffer::new(),
            awaiting_key: None,
            halted: false,
            rng,
        }
    }

    /// Returns the machine to its power-on state, memory included.
    pub fn reset(&mut self) {
        self.memory.clear();
        self.keypad.release_all();
        self.reset_cpu();
        log::debug!("machine reset");
    }

    /// Copies `rom` to the program start and re-initializes the CPU. Memory
    /// outside the image keeps whatever an earlier program left there.
    pub fn load_program(&mut self, rom: &[u8]) -> Result<(), RomError> {
        self.memory.load_rom(rom)?;
        self.reset_cpu();
        log::debug!("loaded {} byte program at {PROGRAM_START:#05X}", rom.len());
        Ok(())
    }

    pub fn load_rom_file(&mut self, path: impl AsRef<Path>) -> Result<(), RomError> {
        let path = path.as_ref();
        let rom = std::fs::read(path).map_err(|source| RomError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        self.load_program(&rom)
    }

    fn reset_cpu(&mut self) {
        self.registers.clear();
        self.pc = PROGRAM_START;
        self.index = 0;
        self.stack.clear();
        self.delay_timer = 0;
        self.sound_timer = 0;
        self.framebuffer.clear();
        self.awaiting_key = None;
        self.halted = false;
    }

    /// Executes one instruction.
    ///
    /// While an FX0A is waiting for a key nothing is fetched and `Ok` is
    /// returned. Unknown opcodes are skipped. Any other error halts the
    /// program: later calls return [`ExecutionError::Halted`] until the
    /// machine is reset or a program is loaded.
    pub fn step(&mut self) -> Result<(), ExecutionError> {
        if self.halted {
            return Err(ExecutionError::Halted);
        }
        if self.awaiting_key.is_some() {
            return Ok(());
        }

        let pc = self.pc;
        let result = match self.fetch() {
            Ok(raw) => match decode(raw) {
                Ok(instruction) => {
                    log::trace!("{pc:#05X}: {raw:04X} {instruction}");
                    instruction.execute(self)
                }
                Err(ExecutionError::UnknownOpcode { opcode }) => {
                    log::debug!("skipping unknown opcode {opcode:#06X} at {pc:#05X}");
                    Ok(())
                }
                Err(err) => Err(err),
            },
            Err(err) => Err(err),
        };

        if let Err(err) = &result {
            log::error!("program fault at {pc:#05X}: {err}");
            self.halted = true;
        }
        result
    }

    fn fetch(&mut self) -> Result<u16, ExecutionError> {
        let pc = usize::from(self.pc);
        let high = self.memory.read(pc)?;
        let low = self.memory.read(pc + 1)?;

        // Move the program counter to next instruction
        self.pc = self.pc.wrapping_add(2) & ADDRESS_MASK;

        Ok(u16::from_be_bytes([high, low]))
    }

    /// Address of the instruction being executed.
    pub(crate) fn current_address(&self) -> Address {
        self.pc.wrapping_sub(2) & ADDRESS_MASK
    }

    pub(crate) fn jump(&mut self, addr: Address) {
        self.pc = addr & ADDRESS_MASK;
    }

    pub(crate) fn skip_if(&mut self, condition: bool) {
        if condition {
            self.jump(self.pc.wrapping_add(2));
        }
    }

    pub(crate) fn set_index(&mut self, addr: Address) {
        self.index = addr & ADDRESS_MASK;
    }

    /// Stores an arithmetic result, then the flag, so VF holds the flag even
    /// when it is also the destination.
    pub(crate) fn write_with_flag(&mut self, x: Register, value: u8, flag: bool) {
        self.registers.write(x, value);
        self.registers.write(Register::VF, u8::from(flag));
    }

    /// Decrements both timers, stopping at zero.
    pub fn tick_timers(&mut self) {
        self.delay_timer = self.delay_timer.saturating_sub(1);
        self.sound_timer = self.sound_timer.saturating_sub(1);
    }

    /// Records a key transition. A press resolves a pending FX0A.
    pub fn set_key(&mut self, index: u8, pressed: bool) -> Result<(), KeyError> {
        self.keypad.set(index, pressed)?;
        if pressed {
            if let Some(reg) = self.awaiting_key.take() {
                self.registers.write(reg, index);
            }
        }
        Ok(())
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    pub fn program_counter(&self) -> Address {
        self.pc
    }

    pub fn index(&self) -> Address {
        self.index
    }

    pub fn register(&self, reg: Register) -> u8 {
        self.registers.read(reg)
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn delay_timer(&self) -> Timer {
        self.delay_timer
    }

    pub fn sound_timer(&self) -> Timer {
        self.sound_timer
    }

    /// The host should be producing a tone.
    pub fn sound_timer_active(&self) -> bool {
        self.sound_timer > 0
    }

    pub fn stack_depth(&self) -> usize {
        self.stack.len()
    }

    pub fn is_awaiting_key(&self) -> bool {
        self.awaiting_key.is_some()
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }
}

impl Default for Chip8 {
    fn default() -> Self {
        Self::new()
    }
}
