use std::fmt;

use rand::Rng;

use crate::Address;
use crate::chip8::Chip8;
use crate::error::ExecutionError;
use crate::memory::{FONT_ADDR, FONT_HEIGHT};
use crate::registers::Register;

/// A decoded instruction word. `execute` runs with PC already pointing past it.
pub trait Instruction: fmt::Display {
    fn execute(&self, chip8: &mut Chip8) -> Result<(), ExecutionError>;
}

pub fn decode(raw: u16) -> Result<Box<dyn Instruction>, ExecutionError> {
    let decoded = DecodedInstruction::new(raw);
    let unknown = ExecutionError::UnknownOpcode { opcode: raw };

    match decoded.opcode {
        0x0 => match decoded.nnn {
            0x0E0 => Ok(Box::new(ClearScreen)),
            0x0EE => Ok(Box::new(SubroutineReturn)),
            _ => Err(unknown),
        },
        0x1 => Ok(Box::new(Jump(decoded))),
        0x2 => Ok(Box::new(SubroutineCall(decoded))),
        0x3 => Ok(Box::new(SkipEqX(decoded))),
        0x4 => Ok(Box::new(SkipNeqX(decoded))),
        0x5 if decoded.n == 0 => Ok(Box::new(SkipXEqY(decoded))),
        0x6 => Ok(Box::new(SetImmediate(decoded))),
        0x7 => Ok(Box::new(Add(decoded))),
        0x8 => match decoded.n {
            0x0 => Ok(Box::new(SetXToY(decoded))),
            0x1 => Ok(Box::new(BinaryOr(decoded))),
            0x2 => Ok(Box::new(BinaryAnd(decoded))),
            0x3 => Ok(Box::new(LogicalXor(decoded))),
            0x4 => Ok(Box::new(BinaryAdd(decoded))),
            0x5 => Ok(Box::new(SubtractYFromX(decoded))),
            0x6 => Ok(Box::new(RightShift(decoded))),
            0x7 => Ok(Box::new(SubtractXFromY(decoded))),
            0xE => Ok(Box::new(LeftShift(decoded))),
            _ => Err(unknown),
        },
        0x9 if decoded.n == 0 => Ok(Box::new(SkipXNeqY(decoded))),
        0xA => Ok(Box::new(SetIndex(decoded))),
        0xB => Ok(Box::new(JumpWithOffset(decoded))),
        0xC => Ok(Box::new(Random(decoded))),
        0xD => Ok(Box::new(Draw(decoded))),
        0xE => match decoded.nn {
            0x9E => Ok(Box::new(SkipIfKeyPressed(decoded))),
            0xA1 => Ok(Box::new(SkipIfKeyNotPressed(decoded))),
            _ => Err(unknown),
        },
        0xF => match decoded.nn {
            0x07 => Ok(Box::new(SetVxFromTimer(decoded))),
            0x0A => Ok(Box::new(GetKey(decoded))),
            0x15 => Ok(Box::new(SetDelayTimer(decoded))),
            0x18 => Ok(Box::new(SetSoundTimer(decoded))),
            0x1E => Ok(Box::new(AddToIndex(decoded))),
            0x29 => Ok(Box::new(FontChar(decoded))),
            0x33 => Ok(Box::new(BinaryCodedDecimal(decoded))),
            0x55 => Ok(Box::new(Store(decoded))),
            0x65 => Ok(Box::new(Load(decoded))),
            _ => Err(unknown),
        },
        _ => Err(unknown),
    }
}

/// Operand fields of a raw word `0xOXYN`. Each handler reads only the fields
/// its encoding defines.
#[derive(Clone, Copy)]
struct DecodedInstruction {
    opcode: u8,
    x: Register,
    y: Register,
    n: u8,
    /// Low byte.
    nn: u8,
    /// Low 12 bits.
    nnn: Address,
}

impl DecodedInstruction {
    fn new(raw: u16) -> Self {
        DecodedInstruction {
            opcode: (raw >> 12) as u8,
            x: Register::from_nibble((raw >> 8) as u8),
            y: Register::from_nibble((raw >> 4) as u8),
            n: (raw & 0x000F) as u8,
            nn: (raw & 0x00FF) as u8,
            nnn: raw & 0x0FFF,
        }
    }
}

struct ClearScreen;
impl Instruction for ClearScreen {
    fn execute(&self, chip8: &mut Chip8) -> Result<(), ExecutionError> {
        chip8.framebuffer.clear();
        Ok(())
    }
}
impl fmt::Display for ClearScreen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CLS")
    }
}

struct SubroutineReturn;
impl Instruction for SubroutineReturn {
    fn execute(&self, chip8: &mut Chip8) -> Result<(), ExecutionError> {
        let return_address = chip8.stack.pop().ok_or(ExecutionError::StackUnderflow {
            pc: chip8.current_address(),
        })?;
        chip8.jump(return_address);
        Ok(())
    }
}
impl fmt::Display for SubroutineReturn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RET")
    }
}

struct Jump(DecodedInstruction);
impl Instruction for Jump {
    fn execute(&self, chip8: &mut Chip8) -> Result<(), ExecutionError> {
        chip8.jump(self.0.nnn);
        Ok(())
    }
}
impl fmt::Display for Jump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JP {:#05X}", self.0.nnn)
    }
}

struct SubroutineCall(DecodedInstruction);
impl Instruction for SubroutineCall {
    fn execute(&self, chip8: &mut Chip8) -> Result<(), ExecutionError> {
        if !chip8.stack.push(chip8.pc) {
            return Err(ExecutionError::StackOverflow {
                pc: chip8.current_address(),
            });
        }
        chip8.jump(self.0.nnn);
        Ok(())
    }
}
impl fmt::Display for SubroutineCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CALL {:#05X}", self.0.nnn)
    }
}

struct SkipEqX(DecodedInstruction);
impl Instruction for SkipEqX {
    fn execute(&self, chip8: &mut Chip8) -> Result<(), ExecutionError> {
        chip8.skip_if(chip8.registers.read(self.0.x) == self.0.nn);
        Ok(())
    }
}
impl fmt::Display for SkipEqX {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SE {:?}, {:#04X}", self.0.x, self.0.nn)
    }
}

struct SkipNeqX(DecodedInstruction);
impl Instruction for SkipNeqX {
    fn execute(&self, chip8: &mut Chip8) -> Result<(), ExecutionError> {
        chip8.skip_if(chip8.registers.read(self.0.x) != self.0.nn);
        Ok(())
    }
}
impl fmt::Display for SkipNeqX {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SNE {:?}, {:#04X}", self.0.x, self.0.nn)
    }
}

struct SkipXEqY(DecodedInstruction);
impl Instruction for SkipXEqY {
    fn execute(&self, chip8: &mut Chip8) -> Result<(), ExecutionError> {
        let value_x = chip8.registers.read(self.0.x);
        let value_y = chip8.registers.read(self.0.y);
        chip8.skip_if(value_x == value_y);
        Ok(())
    }
}
impl fmt::Display for SkipXEqY {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SE {:?}, {:?}", self.0.x, self.0.y)
    }
}

struct SkipXNeqY(DecodedInstruction);
impl Instruction for SkipXNeqY {
    fn execute(&self, chip8: &mut Chip8) -> Result<(), ExecutionError> {
        let value_x = chip8.registers.read(self.0.x);
        let value_y = chip8.registers.read(self.0.y);
        chip8.skip_if(value_x != value_y);
        Ok(())
    }
}
impl fmt::Display for SkipXNeqY {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SNE {:?}, {:?}", self.0.x, self.0.y)
    }
}

struct SetImmediate(DecodedInstruction);
impl Instruction for SetImmediate {
    fn execute(&self, chip8: &mut Chip8) -> Result<(), ExecutionError> {
        chip8.registers.write(self.0.x, self.0.nn);
        Ok(())
    }
}
impl fmt::Display for SetImmediate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LD {:?}, {:#04X}", self.0.x, self.0.nn)
    }
}

struct Add(DecodedInstruction);
impl Instruction for Add {
    fn execute(&self, chip8: &mut Chip8) -> Result<(), ExecutionError> {
        let value_x = chip8.registers.read(self.0.x);
        chip8
            .registers
            .write(self.0.x, value_x.wrapping_add(self.0.nn));
        Ok(())
    }
}
impl fmt::Display for Add {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ADD {:?}, {:#04X}", self.0.x, self.0.nn)
    }
}

struct SetXToY(DecodedInstruction);
impl Instruction for SetXToY {
    fn execute(&self, chip8: &mut Chip8) -> Result<(), ExecutionError> {
        let value_y = chip8.registers.read(self.0.y);
        chip8.registers.write(self.0.x, value_y);
        Ok(())
    }
}
impl fmt::Display for SetXToY {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LD {:?}, {:?}", self.0.x, self.0.y)
    }
}

struct BinaryOr(DecodedInstruction);
impl Instruction for BinaryOr {
    fn execute(&self, chip8: &mut Chip8) -> Result<(), ExecutionError> {
        let value_x = chip8.registers.read(self.0.x);
        let value_y = chip8.registers.read(self.0.y);
        chip8.registers.write(self.0.x, value_x | value_y);
        Ok(())
    }
}
impl fmt::Display for BinaryOr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OR {:?}, {:?}", self.0.x, self.0.y)
    }
}

struct BinaryAnd(DecodedInstruction);
impl Instruction for BinaryAnd {
    fn execute(&self, chip8: &mut Chip8) -> Result<(), ExecutionError> {
        let value_x = chip8.registers.read(self.0.x);
        let value_y = chip8.registers.read(self.0.y);
        chip8.registers.write(self.0.x, value_x & value_y);
        Ok(())
    }
}
impl fmt::Display for BinaryAnd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AND {:?}, {:?}", self.0.x, self.0.y)
    }
}

struct LogicalXor(DecodedInstruction);
impl Instruction for LogicalXor {
    fn execute(&self, chip8: &mut Chip8) -> Result<(), ExecutionError> {
        let value_x = chip8.registers.read(self.0.x);
        let value_y = chip8.registers.read(self.0.y);
        chip8.registers.write(self.0.x, value_x ^ value_y);
        Ok(())
    }
}
impl fmt::Display for LogicalXor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "XOR {:?}, {:?}", self.0.x, self.0.y)
    }
}

struct BinaryAdd(DecodedInstruction);
impl Instruction for BinaryAdd {
    fn execute(&self, chip8: &mut Chip8) -> Result<(), ExecutionError> {
        let value_x = chip8.registers.read(self.0.x);
        let value_y = chip8.registers.read(self.0.y);
        let (sum, carry) = value_x.overflowing_add(value_y);
        chip8.write_with_flag(self.0.x, sum, carry);
        Ok(())
    }
}
impl fmt::Display for BinaryAdd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ADD {:?}, {:?}", self.0.x, self.0.y)
    }
}

struct SubtractYFromX(DecodedInstruction);
impl Instruction for SubtractYFromX {
    fn execute(&self, chip8: &mut Chip8) -> Result<(), ExecutionError> {
        let value_x = chip8.registers.read(self.0.x);
        let value_y = chip8.registers.read(self.0.y);
        // VF = 1 means no borrow
        chip8.write_with_flag(self.0.x, value_x.wrapping_sub(value_y), value_x >= value_y);
        Ok(())
    }
}
impl fmt::Display for SubtractYFromX {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SUB {:?}, {:?}", self.0.x, self.0.y)
    }
}

struct SubtractXFromY(DecodedInstruction);
impl Instruction for SubtractXFromY {
    fn execute(&self, chip8: &mut Chip8) -> Result<(), ExecutionError> {
        let value_x = chip8.registers.read(self.0.x);
        let value_y = chip8.registers.read(self.0.y);
        chip8.write_with_flag(self.0.x, value_y.wrapping_sub(value_x), value_y >= value_x);
        Ok(())
    }
}
impl fmt::Display for SubtractXFromY {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SUBN {:?}, {:?}", self.0.x, self.0.y)
    }
}

struct RightShift(DecodedInstruction);
impl Instruction for RightShift {
    fn execute(&self, chip8: &mut Chip8) -> Result<(), ExecutionError> {
        let value_x = chip8.registers.read(self.0.x);
        // VF gets the LSB from before the shift
        chip8.write_with_flag(self.0.x, value_x >> 1, value_x & 0x01 == 1);
        Ok(())
    }
}
impl fmt::Display for RightShift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SHR {:?}, {:?}", self.0.x, self.0.y)
    }
}

struct LeftShift(DecodedInstruction);
impl Instruction for LeftShift {
    fn execute(&self, chip8: &mut Chip8) -> Result<(), ExecutionError> {
        let value_x = chip8.registers.read(self.0.x);
        // VF gets the MSB from before the shift
        chip8.write_with_flag(self.0.x, value_x << 1, value_x & 0x80 != 0);
        Ok(())
    }
}
impl fmt::Display for LeftShift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SHL {:?}, {:?}", self.0.x, self.0.y)
    }
}

struct SetIndex(DecodedInstruction);
impl Instruction for SetIndex {
    fn execute(&self, chip8: &mut Chip8) -> Result<(), ExecutionError> {
        chip8.set_index(self.0.nnn);
        Ok(())
    }
}
impl fmt::Display for SetIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LD I, {:#05X}", self.0.nnn)
    }
}

struct JumpWithOffset(DecodedInstruction);
impl Instruction for JumpWithOffset {
    fn execute(&self, chip8: &mut Chip8) -> Result<(), ExecutionError> {
        let offset = Address::from(chip8.registers.read(Register::V0));
        chip8.jump(self.0.nnn + offset);
        Ok(())
    }
}
impl fmt::Display for JumpWithOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JP V0, {:#05X}", self.0.nnn)
    }
}

struct Random(DecodedInstruction);
impl Instruction for Random {
    fn execute(&self, chip8: &mut Chip8) -> Result<(), ExecutionError> {
        let random_value = chip8.rng.random::<u8>() & self.0.nn;
        chip8.registers.write(self.0.x, random_value);
        Ok(())
    }
}
impl fmt::Display for Random {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RND {:?}, {:#04X}", self.0.x, self.0.nn)
    }
}

struct Draw(DecodedInstruction);
impl Instruction for Draw {
    fn execute(&self, chip8: &mut Chip8) -> Result<(), ExecutionError> {
        let x = usize::from(chip8.registers.read(self.0.x));
        let y = usize::from(chip8.registers.read(self.0.y));
        let sprite = chip8
            .memory
            .slice(usize::from(chip8.index), usize::from(self.0.n))?;

        let collision = chip8.framebuffer.draw_sprite(x, y, sprite);
        chip8.registers.write(Register::VF, u8::from(collision));
        Ok(())
    }
}
impl fmt::Display for Draw {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DRW {:?}, {:?}, {}", self.0.x, self.0.y, self.0.n)
    }
}

struct SkipIfKeyPressed(DecodedInstruction);
impl Instruction for SkipIfKeyPressed {
    fn execute(&self, chip8: &mut Chip8) -> Result<(), ExecutionError> {
        let value_x = chip8.registers.read(self.0.x);
        chip8.skip_if(chip8.keypad.is_pressed(value_x));
        Ok(())
    }
}
impl fmt::Display for SkipIfKeyPressed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SKP {:?}", self.0.x)
    }
}

struct SkipIfKeyNotPressed(DecodedInstruction);
impl Instruction for SkipIfKeyNotPressed {
    fn execute(&self, chip8: &mut Chip8) -> Result<(), ExecutionError> {
        let value_x = chip8.registers.read(self.0.x);
        chip8.skip_if(!chip8.keypad.is_pressed(value_x));
        Ok(())
    }
}
impl fmt::Display for SkipIfKeyNotPressed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SKNP {:?}", self.0.x)
    }
}

struct SetVxFromTimer(DecodedInstruction);
impl Instruction for SetVxFromTimer {
    fn execute(&self, chip8: &mut Chip8) -> Result<(), ExecutionError> {
        chip8.registers.write(self.0.x, chip8.delay_timer);
        Ok(())
    }
}
impl fmt::Display for SetVxFromTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LD {:?}, DT", self.0.x)
    }
}

struct GetKey(DecodedInstruction);
impl Instruction for GetKey {
    fn execute(&self, chip8: &mut Chip8) -> Result<(), ExecutionError> {
        // resolved by the next key press reported through Chip8::set_key
        chip8.awaiting_key = Some(self.0.x);
        Ok(())
    }
}
impl fmt::Display for GetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LD {:?}, K", self.0.x)
    }
}

struct SetDelayTimer(DecodedInstruction);
impl Instruction for SetDelayTimer {
    fn execute(&self, chip8: &mut Chip8) -> Result<(), ExecutionError> {
        chip8.delay_timer = chip8.registers.read(self.0.x);
        Ok(())
    }
}
impl fmt::Display for SetDelayTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LD DT, {:?}", self.0.x)
    }
}

struct SetSoundTimer(DecodedInstruction);
impl Instruction for SetSoundTimer {
    fn execute(&self, chip8: &mut Chip8) -> Result<(), ExecutionError> {
        chip8.sound_timer = chip8.registers.read(self.0.x);
        Ok(())
    }
}
impl fmt::Display for SetSoundTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LD ST, {:?}", self.0.x)
    }
}

struct AddToIndex(DecodedInstruction);
impl Instruction for AddToIndex {
    fn execute(&self, chip8: &mut Chip8) -> Result<(), ExecutionError> {
        let value_x = Address::from(chip8.registers.read(self.0.x));
        chip8.set_index(chip8.index + value_x);
        Ok(())
    }
}
impl fmt::Display for AddToIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ADD I, {:?}", self.0.x)
    }
}

struct FontChar(DecodedInstruction);
impl Instruction for FontChar {
    fn execute(&self, chip8: &mut Chip8) -> Result<(), ExecutionError> {
        let digit = Address::from(chip8.registers.read(self.0.x));
        chip8.set_index(FONT_ADDR + digit * FONT_HEIGHT as Address);
        Ok(())
    }
}
impl fmt::Display for FontChar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LD F, {:?}", self.0.x)
    }
}

struct BinaryCodedDecimal(DecodedInstruction);
impl Instruction for BinaryCodedDecimal {
    fn execute(&self, chip8: &mut Chip8) -> Result<(), ExecutionError> {
        let value_x = chip8.registers.read(self.0.x);
        let bcd = [value_x / 100, (value_x / 10) % 10, value_x % 10];
        chip8
            .memory
            .slice_mut(usize::from(chip8.index), bcd.len())?
            .copy_from_slice(&bcd);
        Ok(())
    }
}
impl fmt::Display for BinaryCodedDecimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LD B, {:?}", self.0.x)
    }
}

struct Store(DecodedInstruction);
impl Instruction for Store {
    fn execute(&self, chip8: &mut Chip8) -> Result<(), ExecutionError> {
        let count = self.0.x.index() + 1;
        chip8
            .memory
            .slice_mut(usize::from(chip8.index), count)?
            .copy_from_slice(chip8.registers.through(self.0.x));
        chip8.set_index(chip8.index + count as Address);
        Ok(())
    }
}
impl fmt::Display for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LD [I], {:?}", self.0.x)
    }
}

struct Load(DecodedInstruction);
impl Instruction for Load {
    fn execute(&self, chip8: &mut Chip8) -> Result<(), ExecutionError> {
        let count = self.0.x.index() + 1;
        let values = chip8.memory.slice(usize::from(chip8.index), count)?;
        chip8.registers.through_mut(self.0.x).copy_from_slice(values);
        chip8.set_index(chip8.index + count as Address);
        Ok(())
    }
}
impl fmt::Display for Load {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LD {:?}, [I]", self.0.x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Register::*;
    use crate::registers::STACK_DEPTH;

    fn mnemonic(raw: u16) -> String {
        match decode(raw) {
            Ok(instruction) => instruction.to_string(),
            Err(err) => panic!("{raw:#06X} did not decode: {err}"),
        }
    }

    /// Loads `program` and runs one step per instruction word.
    fn run(chip8: &mut Chip8, program: &[u16]) {
        let rom: Vec<u8> = program.iter().flat_map(|word| word.to_be_bytes()).collect();
        chip8.load_program(&rom).unwrap();
        for _ in program {
            chip8.step().unwrap();
        }
    }

    fn after(program: &[u16]) -> Chip8 {
        let mut chip8 = Chip8::with_seed(42);
        run(&mut chip8, program);
        chip8
    }

    #[test]
    fn decodes_every_family() {
        let cases = [
            (0x00E0, "CLS"),
            (0x00EE, "RET"),
            (0x1234, "JP 0x234"),
            (0x2456, "CALL 0x456"),
            (0x342A, "SE V4, 0x2A"),
            (0x4A75, "SNE VA, 0x75"),
            (0x5AE0, "SE VA, VE"),
            (0x63F5, "LD V3, 0xF5"),
            (0x7B12, "ADD VB, 0x12"),
            (0x8590, "LD V5, V9"),
            (0x8101, "OR V1, V0"),
            (0x8642, "AND V6, V4"),
            (0x87F3, "XOR V7, VF"),
            (0x8264, "ADD V2, V6"),
            (0x8C35, "SUB VC, V3"),
            (0x8D06, "SHR VD, V0"),
            (0x8127, "SUBN V1, V2"),
            (0x8E5E, "SHL VE, V5"),
            (0x9340, "SNE V3, V4"),
            (0xA2F0, "LD I, 0x2F0"),
            (0xB300, "JP V0, 0x300"),
            (0xC70F, "RND V7, 0x0F"),
            (0xD125, "DRW V1, V2, 5"),
            (0xE89E, "SKP V8"),
            (0xE9A1, "SKNP V9"),
            (0xF007, "LD V0, DT"),
            (0xF10A, "LD V1, K"),
            (0xF215, "LD DT, V2"),
            (0xF318, "LD ST, V3"),
            (0xF41E, "ADD I, V4"),
            (0xF529, "LD F, V5"),
            (0xF633, "LD B, V6"),
            (0xF755, "LD [I], V7"),
            (0xF865, "LD V8, [I]"),
        ];
        for (raw, expected) in cases {
            assert_eq!(mnemonic(raw), expected, "decoding {raw:#06X}");
        }
    }

    #[test]
    fn unassigned_encodings_are_unknown() {
        for raw in [
            0x0000, 0x0123, 0x00E1, 0x5121, 0x8008, 0x800F, 0x9001, 0xE000, 0xE09F, 0xF000, 0xF0FF,
        ] {
            assert_eq!(
                decode(raw).err(),
                Some(ExecutionError::UnknownOpcode { opcode: raw }),
                "decoding {raw:#06X}"
            );
        }
    }

    #[test]
    fn load_immediate_sets_every_value() {
        for nn in 0..=255u16 {
            let chip8 = after(&[0x6500 | nn]);
            assert_eq!(chip8.register(V5), nn as u8);
        }
    }

    #[test]
    fn add_immediate_wraps_without_flag() {
        let chip8 = after(&[0x6AFA, 0x6F07, 0x7A0A]);
        assert_eq!(chip8.register(VA), 4);
        assert_eq!(chip8.register(VF), 7);
    }

    #[test]
    fn add_registers_sets_carry() {
        let chip8 = after(&[0x61C8, 0x6264, 0x8124]);
        assert_eq!(chip8.register(V1), 44);
        assert_eq!(chip8.register(VF), 1);

        let chip8 = after(&[0x610A, 0x6214, 0x6F01, 0x8124]);
        assert_eq!(chip8.register(V1), 30);
        assert_eq!(chip8.register(VF), 0);
    }

    #[test]
    fn sub_sets_no_borrow_flag() {
        let chip8 = after(&[0x6105, 0x620A, 0x8125]);
        assert_eq!(chip8.register(V1), 251);
        assert_eq!(chip8.register(VF), 0);

        let chip8 = after(&[0x610A, 0x6205, 0x8125]);
        assert_eq!(chip8.register(V1), 5);
        assert_eq!(chip8.register(VF), 1);

        let chip8 = after(&[0x6107, 0x6207, 0x8125]);
        assert_eq!(chip8.register(V1), 0);
        assert_eq!(chip8.register(VF), 1);
    }

    #[test]
    fn reverse_sub_sets_no_borrow_flag() {
        let chip8 = after(&[0x6105, 0x620A, 0x8127]);
        assert_eq!(chip8.register(V1), 5);
        assert_eq!(chip8.register(VF), 1);

        let chip8 = after(&[0x610A, 0x6205, 0x8127]);
        assert_eq!(chip8.register(V1), 251);
        assert_eq!(chip8.register(VF), 0);
    }

    #[test]
    fn shifts_capture_the_lost_bit_first() {
        let chip8 = after(&[0x6303, 0x8306]);
        assert_eq!(chip8.register(V3), 1);
        assert_eq!(chip8.register(VF), 1);

        let chip8 = after(&[0x6381, 0x6401, 0x834E]);
        assert_eq!(chip8.register(V3), 0x02);
        assert_eq!(chip8.register(VF), 1);

        let chip8 = after(&[0x6340, 0x834E]);
        assert_eq!(chip8.register(V3), 0x80);
        assert_eq!(chip8.register(VF), 0);
    }

    #[test]
    fn flag_wins_when_vf_is_the_destination() {
        let chip8 = after(&[0x6FC8, 0x6164, 0x8F14]);
        assert_eq!(chip8.register(VF), 1);

        let chip8 = after(&[0x6F02, 0x8F06]);
        assert_eq!(chip8.register(VF), 0);
    }

    #[test]
    fn bitwise_ops_leave_vf_alone() {
        let chip8 = after(&[0x6F09, 0x61F0, 0x623C, 0x8121]);
        assert_eq!(chip8.register(V1), 0xFC);
        let chip8 = after(&[0x6F09, 0x61F0, 0x623C, 0x8122]);
        assert_eq!(chip8.register(V1), 0x30);
        let chip8 = after(&[0x6F09, 0x61F0, 0x623C, 0x8123]);
        assert_eq!(chip8.register(V1), 0xCC);
        assert_eq!(chip8.register(VF), 9);
        let chip8 = after(&[0x623C, 0x8120]);
        assert_eq!(chip8.register(V1), 0x3C);
    }

    #[test]
    fn skips_compare_current_values() {
        let chip8 = after(&[0x6133, 0x3133]);
        assert_eq!(chip8.program_counter(), 0x206);
        let chip8 = after(&[0x6133, 0x3134]);
        assert_eq!(chip8.program_counter(), 0x204);
        let chip8 = after(&[0x6133, 0x4134]);
        assert_eq!(chip8.program_counter(), 0x206);
        let chip8 = after(&[0x6133, 0x6233, 0x5120]);
        assert_eq!(chip8.program_counter(), 0x208);
        let chip8 = after(&[0x6133, 0x6233, 0x9120]);
        assert_eq!(chip8.program_counter(), 0x206);
    }

    #[test]
    fn call_then_return_resumes_after_the_call() {
        for target in [0x206u16, 0x400, 0xABC] {
            let mut chip8 = Chip8::with_seed(0);
            let call = 0x2000 | target;
            chip8.load_program(&call.to_be_bytes()).unwrap();
            // RET at the call target
            let offset = usize::from(target);
            chip8.memory.write(offset, 0x00).unwrap();
            chip8.memory.write(offset + 1, 0xEE).unwrap();

            chip8.step().unwrap();
            assert_eq!(chip8.program_counter(), target);
            assert_eq!(chip8.stack_depth(), 1);
            chip8.step().unwrap();
            assert_eq!(chip8.program_counter(), 0x202);
            assert_eq!(chip8.stack_depth(), 0);
        }
    }

    #[test]
    fn call_beyond_max_depth_overflows() {
        // each call lands on the next call
        let program: Vec<u16> = (0..=STACK_DEPTH as u16)
            .map(|i| 0x2000 | (0x202 + i * 2))
            .collect();
        let mut chip8 = Chip8::with_seed(0);
        let rom: Vec<u8> = program.iter().flat_map(|word| word.to_be_bytes()).collect();
        chip8.load_program(&rom).unwrap();
        for _ in 0..STACK_DEPTH {
            chip8.step().unwrap();
        }
        assert_eq!(
            chip8.step(),
            Err(ExecutionError::StackOverflow { pc: 0x220 })
        );
    }

    #[test]
    fn return_on_empty_stack_underflows() {
        let mut chip8 = Chip8::with_seed(0);
        chip8.load_program(&[0x00, 0xEE]).unwrap();
        assert_eq!(
            chip8.step(),
            Err(ExecutionError::StackUnderflow { pc: 0x200 })
        );
    }

    #[test]
    fn jump_with_offset_wraps() {
        let chip8 = after(&[0x6010, 0xBFF8]);
        assert_eq!(chip8.program_counter(), 0x008);
        let chip8 = after(&[0x6004, 0xB300]);
        assert_eq!(chip8.program_counter(), 0x304);
    }

    #[test]
    fn random_is_masked() {
        let mut chip8 = Chip8::with_seed(1);
        let program: Vec<u16> = vec![0xC50F; 64];
        run(&mut chip8, &program);
        assert!(chip8.register(V5) <= 0x0F);

        let chip8 = after(&[0x65FF, 0xC500]);
        assert_eq!(chip8.register(V5), 0);
    }

    #[test]
    fn seeded_machines_agree() {
        let a = after(&[0xC1FF, 0xC2FF, 0xC3FF]);
        let b = after(&[0xC1FF, 0xC2FF, 0xC3FF]);
        for reg in [V1, V2, V3] {
            assert_eq!(a.register(reg), b.register(reg));
        }
    }

    #[test]
    fn clear_screen_turns_off_every_cell() {
        // draw the font glyph for 0, then clear
        let chip8 = after(&[0xA000, 0xD005, 0x00E0]);
        assert_eq!(chip8.framebuffer().lit(), 0);
    }

    #[test]
    fn drawing_twice_erases_and_collides() {
        let mut chip8 = Chip8::with_seed(0);
        chip8
            .load_program(&[0xA2, 0x08, 0xD0, 0x01, 0xD0, 0x01, 0x00, 0x00, 0xFF])
            .unwrap();
        chip8.step().unwrap();
        chip8.step().unwrap();
        assert_eq!(chip8.framebuffer().lit(), 8);
        assert_eq!(chip8.register(VF), 0);

        chip8.step().unwrap();
        assert_eq!(chip8.framebuffer().lit(), 0);
        assert_eq!(chip8.register(VF), 1);
    }

    #[test]
    fn draw_clears_stale_flag_and_wraps() {
        // VF = 1, x = 62, y = 31, draw the 0 glyph
        let chip8 = after(&[0x6F01, 0x613E, 0x621F, 0xA000, 0xD125]);
        assert_eq!(chip8.register(VF), 0);
        let fb = chip8.framebuffer();
        // top row 0xF0 at y = 31 spans x = 62, 63, 0, 1
        assert!(fb.pixel(62, 31) && fb.pixel(63, 31) && fb.pixel(0, 31) && fb.pixel(1, 31));
        // second row 0x90 wraps to y = 0
        assert!(fb.pixel(62, 0) && fb.pixel(1, 0));
        assert!(!fb.pixel(63, 0));
    }

    #[test]
    fn sprite_past_memory_end_faults() {
        let mut chip8 = Chip8::with_seed(0);
        chip8.load_program(&[0xAF, 0xFE, 0xD0, 0x03]).unwrap();
        chip8.step().unwrap();
        assert_eq!(
            chip8.step(),
            Err(ExecutionError::OutOfBoundsAddress { address: 0x1000 })
        );
    }

    #[test]
    fn key_skips_use_key_state() {
        let mut chip8 = Chip8::with_seed(0);
        chip8.load_program(&[0x61, 0x07, 0xE1, 0x9E]).unwrap();
        chip8.set_key(7, true).unwrap();
        chip8.step().unwrap();
        chip8.step().unwrap();
        assert_eq!(chip8.program_counter(), 0x206);

        let chip8 = after(&[0x6107, 0xE1A1]);
        assert_eq!(chip8.program_counter(), 0x206);
        let chip8 = after(&[0x6107, 0xE19E]);
        assert_eq!(chip8.program_counter(), 0x204);
    }

    #[test]
    fn key_skip_masks_register_value() {
        let mut chip8 = Chip8::with_seed(0);
        chip8.load_program(&[0x61, 0x17, 0xE1, 0x9E]).unwrap();
        chip8.set_key(7, true).unwrap();
        chip8.step().unwrap();
        chip8.step().unwrap();
        assert_eq!(chip8.program_counter(), 0x206);
    }

    #[test]
    fn timer_transfers() {
        let mut chip8 = after(&[0x6A1E, 0xFA15, 0xFA18]);
        assert_eq!(chip8.delay_timer(), 0x1E);
        assert_eq!(chip8.sound_timer(), 0x1E);
        chip8.tick_timers();
        chip8.memory.write(0x206, 0xFB).unwrap();
        chip8.memory.write(0x207, 0x07).unwrap();
        chip8.step().unwrap();
        assert_eq!(chip8.register(VB), 0x1D);
    }

    #[test]
    fn index_arithmetic_wraps_to_twelve_bits() {
        let chip8 = after(&[0xAFFE, 0x6105, 0xF11E]);
        assert_eq!(chip8.index(), 0x003);
        assert_eq!(chip8.register(VF), 0);
    }

    #[test]
    fn font_char_points_at_glyph() {
        let chip8 = after(&[0x610A, 0xF129]);
        assert_eq!(chip8.index(), 50);
        assert_eq!(
            chip8.memory().slice(50, 5).unwrap(),
            &[0xF0, 0x90, 0xF0, 0x90, 0x90]
        );
    }

    #[test]
    fn bcd_stores_three_digits() {
        let chip8 = after(&[0x629C, 0xA300, 0xF233]);
        assert_eq!(chip8.memory().slice(0x300, 3).unwrap(), &[1, 5, 6]);
        assert_eq!(chip8.index(), 0x300);

        let chip8 = after(&[0x6207, 0xA300, 0xF233]);
        assert_eq!(chip8.memory().slice(0x300, 3).unwrap(), &[0, 0, 7]);
    }

    #[test]
    fn bcd_near_memory_end_faults() {
        let mut chip8 = Chip8::with_seed(0);
        chip8.load_program(&[0xAF, 0xFE, 0xF0, 0x33]).unwrap();
        chip8.step().unwrap();
        assert!(matches!(
            chip8.step(),
            Err(ExecutionError::OutOfBoundsAddress { .. })
        ));
        assert_eq!(chip8.memory().read(0xFFE).unwrap(), 0);
    }

    #[test]
    fn register_dump_writes_and_advances_index() {
        let chip8 = after(&[0x600A, 0x610B, 0x620C, 0x630D, 0xA300, 0xF255]);
        assert_eq!(
            chip8.memory().slice(0x300, 4).unwrap(),
            &[0x0A, 0x0B, 0x0C, 0]
        );
        assert_eq!(chip8.index(), 0x303);
    }

    #[test]
    fn register_dump_past_memory_end_faults_without_writes() {
        let mut chip8 = Chip8::with_seed(0);
        // V0..V5 = 0x55, I = 0xFFC, dump V0..V5
        chip8
            .load_program(&[0x60, 0x55, 0x65, 0x55, 0xAF, 0xFC, 0xF5, 0x55])
            .unwrap();
        for _ in 0..3 {
            chip8.step().unwrap();
        }
        assert_eq!(
            chip8.step(),
            Err(ExecutionError::OutOfBoundsAddress { address: 0x1001 })
        );
        assert_eq!(chip8.memory().slice(0xFFC, 4).unwrap(), &[0, 0, 0, 0]);
        assert_eq!(chip8.index(), 0xFFC);
    }

    #[test]
    fn register_dump_then_load_round_trips() {
        let mut chip8 = after(&[
            0x6011, 0x6122, 0x6233, 0x6344, 0xA400, 0xF355, // dump V0..V3 at 0x400
            0x6000, 0x6100, 0x6200, 0x6300, 0xA400, 0xF365, // clobber, load back
        ]);
        assert_eq!(
            [V0, V1, V2, V3].map(|reg| chip8.register(reg)),
            [0x11, 0x22, 0x33, 0x44]
        );
        assert_eq!(chip8.index(), 0x404);
        chip8.reset();
        assert_eq!(chip8.register(V3), 0);
    }

    #[test]
    fn register_load_past_memory_end_faults_without_writes() {
        let mut chip8 = Chip8::with_seed(0);
        chip8.load_program(&[0x65, 0x55, 0xAF, 0xFC, 0xF5, 0x65]).unwrap();
        chip8.step().unwrap();
        chip8.step().unwrap();
        assert!(chip8.step().is_err());
        assert_eq!(chip8.register(V5), 0x55);
        assert_eq!(chip8.index(), 0xFFC);
    }
}
