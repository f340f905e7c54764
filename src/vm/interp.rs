use super::{
    disp::Display,
    input::Keypad,
    prog::{LoadError, PROGRAM_MAX_SIZE},
};

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

pub const VFLAG: usize = 15;

pub const PROGRAM_STARTING_ADDRESS: u16 = 0x200;
pub const MEMORY_SIZE: usize = 4096;
pub const STACK_DEPTH: usize = 16;

const ADDRESS_MASK: u16 = MEMORY_SIZE as u16 - 1;

const FONT_CHAR_DATA_SIZE: u16 = 5;
const FONT: [u8; 80] = [
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

// Takes 16 bits (instruction size) and decomposes it into its parts
#[derive(Clone, Copy, Debug)]
pub struct InstructionParameters {
    pub bits: u16,
    pub op: u8,
    pub x: u8,
    pub y: u8,
    pub n: u8,
    pub nn: u8,
    pub nnn: u16,
}

impl From<u16> for InstructionParameters {
    fn from(bits: u16) -> Self {
        InstructionParameters {
            bits,
            op: ((bits & 0xF000) >> 12) as u8,
            x: ((bits & 0x0F00) >> 8) as u8,
            y: ((bits & 0x00F0) >> 4) as u8,
            n: (bits & 0x000F) as u8,
            nn: (bits & 0x00FF) as u8,
            nnn: bits & 0x0FFF,
        }
    }
}

impl InstructionParameters {
    pub fn from_bytes(byte0: u8, byte1: u8) -> Self {
        InstructionParameters::from((byte0 as u16) << 8 | byte1 as u16)
    }

    pub fn try_decode(self) -> Result<Instruction, Self> {
        let (x, y, n, nn, nnn) = (self.x, self.y, self.n, self.nn, self.nnn);

        match self.op {
            0x0 => match nnn {
                0x0E0 => Ok(Instruction::ClearScreen),
                0x0EE => Ok(Instruction::SubroutineReturn),
                _ => Err(self),
            },
            0x1 => Ok(Instruction::Jump(nnn)),
            0x2 => Ok(Instruction::CallSubroutine(nnn)),
            0x3 => Ok(Instruction::SkipIfEqualsConstant(x, nn)),
            0x4 => Ok(Instruction::SkipIfNotEqualsConstant(x, nn)),
            0x5 => match n {
                0x0 => Ok(Instruction::SkipIfEquals(x, y)),
                _ => Err(self),
            },
            0x6 => Ok(Instruction::SetConstant(x, nn)),
            0x7 => Ok(Instruction::AddConstant(x, nn)),
            0x8 => match n {
                0x0 => Ok(Instruction::Set(x, y)),
                0x1 => Ok(Instruction::Or(x, y)),
                0x2 => Ok(Instruction::And(x, y)),
                0x3 => Ok(Instruction::Xor(x, y)),
                0x4 => Ok(Instruction::Add(x, y)),
                0x5 => Ok(Instruction::Sub(x, y, true)),
                0x6 => Ok(Instruction::Shift(x, true)),
                0x7 => Ok(Instruction::Sub(x, y, false)),
                0xE => Ok(Instruction::Shift(x, false)),
                _ => Err(self),
            },
            0x9 => match n {
                0x0 => Ok(Instruction::SkipIfNotEquals(x, y)),
                _ => Err(self),
            },
            0xA => Ok(Instruction::SetIndex(nnn)),
            0xB => Ok(Instruction::JumpWithOffset(nnn)),
            0xC => Ok(Instruction::GenerateRandom(x, nn)),
            0xD => Ok(Instruction::Draw(x, y, n)),
            0xE => match nn {
                0x9E => Ok(Instruction::SkipIfKeyDown(x)),
                0xA1 => Ok(Instruction::SkipIfKeyNotDown(x)),
                _ => Err(self),
            },
            0xF => match nn {
                0x07 => Ok(Instruction::GetDelayTimer(x)),
                0x0A => Ok(Instruction::GetKey(x)),
                0x15 => Ok(Instruction::SetDelayTimer(x)),
                0x18 => Ok(Instruction::SetSoundTimer(x)),
                0x1E => Ok(Instruction::AddToIndex(x)),
                0x29 => Ok(Instruction::SetIndexToHexChar(x)),
                0x33 => Ok(Instruction::StoreDecimal(x)),
                0x55 => Ok(Instruction::Store(x)),
                0x65 => Ok(Instruction::Load(x)),
                _ => Err(self),
            },
            _ => Err(self),
        }
    }
}

impl std::fmt::Display for InstructionParameters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:#06X} (op = {:#X?}, x = {:?}, y = {:?}, n = {:?}, nn = {:?}, nnn = {:?})",
            self.bits, self.op, self.x, self.y, self.n, self.nn, self.nnn
        )
    }
}

/// The 35 instruction forms of the CHIP-8 instruction set.
///
/// `Sub(x, y, true)` is `Vx -= Vy` (8XY5) and `Sub(x, y, false)` is
/// `Vx = Vy - Vx` (8XY7). `Shift` carries no source register because both
/// shifts operate on Vx alone, ignoring Vy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    ClearScreen,
    SubroutineReturn,
    Jump(u16),
    JumpWithOffset(u16),
    CallSubroutine(u16),
    SkipIfEqualsConstant(u8, u8),
    SkipIfNotEqualsConstant(u8, u8),
    SkipIfEquals(u8, u8),
    SkipIfNotEquals(u8, u8),
    SkipIfKeyDown(u8),
    SkipIfKeyNotDown(u8),
    GetKey(u8),
    SetConstant(u8, u8),
    AddConstant(u8, u8),
    Set(u8, u8),
    Or(u8, u8),
    And(u8, u8),
    Xor(u8, u8),
    Add(u8, u8),
    Sub(u8, u8, bool),
    Shift(u8, bool),
    GetDelayTimer(u8),
    SetDelayTimer(u8),
    SetSoundTimer(u8),
    SetIndex(u16),
    SetIndexToHexChar(u8),
    AddToIndex(u8),
    Load(u8),
    Store(u8),
    StoreDecimal(u8),
    GenerateRandom(u8, u8),
    Draw(u8, u8, u8),
}

// Where the program counter goes after an instruction executes. Stall leaves
// the counter in place so the same instruction is refetched next step, and
// also suppresses the timer update for that step.
enum ProgramStep {
    Next,
    Skip,
    Jump(u16),
    Stall,
}

/// The whole machine: memory, register file, call stack, timers, framebuffer
/// and input latch, advanced one fetch-decode-execute cycle per `step` call.
///
/// State is plain owned data so the driver can hold the interpreter by value
/// and tests can poke at it directly.
pub struct Interpreter {
    pub memory: [u8; MEMORY_SIZE],
    pub registers: [u8; 16],
    pub index: u16,
    pub pc: u16,
    pub stack: [u16; STACK_DEPTH],
    pub sp: u8,
    pub delay_timer: u8,
    pub sound_timer: u8,
    pub display: Display,
    pub keypad: Keypad,
    pub rng: StdRng,
    beeper: Box<dyn FnMut()>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        let mut memory = [0; MEMORY_SIZE];
        memory[..FONT.len()].copy_from_slice(&FONT);

        Interpreter {
            memory,
            registers: [0; 16],
            index: 0,
            pc: PROGRAM_STARTING_ADDRESS,
            stack: [0; STACK_DEPTH],
            sp: 0,
            delay_timer: 0,
            sound_timer: 0,
            display: Display::default(),
            keypad: Keypad::default(),
            rng: StdRng::from_entropy(),
            beeper: Box::new(|| ()),
        }
    }

    /// Registers the tone trigger invoked on the step that brings the sound
    /// timer to zero.
    pub fn set_beeper<F: FnMut() + 'static>(&mut self, beeper: F) {
        self.beeper = Box::new(beeper);
    }

    /// Copies a program image into memory at 0x200.
    ///
    /// Oversized images are rejected before a single byte is written.
    /// Loading does not touch registers, timers, or the framebuffer, so a
    /// second load simply overwrites the program region.
    pub fn load(&mut self, image: &[u8]) -> Result<(), LoadError> {
        if image.len() > PROGRAM_MAX_SIZE {
            return Err(LoadError::Oversize {
                size: image.len(),
                max: PROGRAM_MAX_SIZE,
            });
        }

        let start = PROGRAM_STARTING_ADDRESS as usize;
        self.memory[start..start + image.len()].copy_from_slice(image);
        Ok(())
    }

    pub fn fetch(&self) -> InstructionParameters {
        let address = (self.pc & ADDRESS_MASK) as usize;
        InstructionParameters::from_bytes(
            self.memory[address],
            self.memory[(address + 1) % MEMORY_SIZE],
        )
    }

    /// Executes exactly one fetch-decode-execute cycle and the trailing
    /// timer update.
    ///
    /// An unrecognized instruction word is logged and the program counter is
    /// left in place, so the machine hangs on it rather than running off
    /// into garbage. A key wait likewise stalls the whole step, timers
    /// included.
    pub fn step(&mut self) {
        match self.fetch().try_decode() {
            Ok(instruction) => {
                log::trace!("{:#05X} {:?}", self.pc, instruction);
                match self.exec(instruction) {
                    ProgramStep::Next => self.pc = self.pc.wrapping_add(2),
                    ProgramStep::Skip => self.pc = self.pc.wrapping_add(4),
                    ProgramStep::Jump(address) => self.pc = address,
                    ProgramStep::Stall => return,
                }
            }
            Err(params) => {
                log::warn!("unrecognized instruction at {:#05X}: {}", self.pc, params);
                return;
            }
        }

        if self.delay_timer > 0 {
            self.delay_timer -= 1;
        }
        if self.sound_timer > 0 {
            if self.sound_timer == 1 {
                (self.beeper)();
            }
            self.sound_timer -= 1;
        }
    }

    fn exec(&mut self, instruction: Instruction) -> ProgramStep {
        match instruction {
            Instruction::ClearScreen => self.display.clear(),

            Instruction::SubroutineReturn => {
                self.sp -= 1;
                return ProgramStep::Jump(self.stack[self.sp as usize].wrapping_add(2));
            }

            Instruction::Jump(address) => return ProgramStep::Jump(address),

            Instruction::JumpWithOffset(address) => {
                return ProgramStep::Jump(address.wrapping_add(self.registers[0] as u16))
            }

            Instruction::CallSubroutine(address) => {
                // the un-advanced pc is pushed; SubroutineReturn compensates
                self.stack[self.sp as usize] = self.pc;
                self.sp += 1;
                return ProgramStep::Jump(address);
            }

            Instruction::SkipIfEqualsConstant(x, value) => {
                if self.registers[x as usize] == value {
                    return ProgramStep::Skip;
                }
            }

            Instruction::SkipIfNotEqualsConstant(x, value) => {
                if self.registers[x as usize] != value {
                    return ProgramStep::Skip;
                }
            }

            Instruction::SkipIfEquals(x, y) => {
                if self.registers[x as usize] == self.registers[y as usize] {
                    return ProgramStep::Skip;
                }
            }

            Instruction::SkipIfNotEquals(x, y) => {
                if self.registers[x as usize] != self.registers[y as usize] {
                    return ProgramStep::Skip;
                }
            }

            Instruction::SkipIfKeyDown(x) => {
                if self.keypad.is_down(self.registers[x as usize]) {
                    return ProgramStep::Skip;
                }
            }

            Instruction::SkipIfKeyNotDown(x) => {
                if !self.keypad.is_down(self.registers[x as usize]) {
                    return ProgramStep::Skip;
                }
            }

            Instruction::GetKey(x) => match self.keypad.first_down() {
                Some(code) => self.registers[x as usize] = code,
                None => return ProgramStep::Stall,
            },

            Instruction::SetConstant(x, value) => self.registers[x as usize] = value,

            Instruction::AddConstant(x, change) => {
                // wraps modulo 256 and leaves VF alone, unlike Add
                self.registers[x as usize] = self.registers[x as usize].wrapping_add(change)
            }

            Instruction::Set(x, y) => self.registers[x as usize] = self.registers[y as usize],

            Instruction::Or(x, y) => self.registers[x as usize] |= self.registers[y as usize],

            Instruction::And(x, y) => self.registers[x as usize] &= self.registers[y as usize],

            Instruction::Xor(x, y) => self.registers[x as usize] ^= self.registers[y as usize],

            // The 8XYN arithmetic forms write VF before mutating Vx, which is
            // observable when x == 0xF.
            Instruction::Add(x, y) => {
                self.registers[VFLAG] =
                    (self.registers[y as usize] > 0xFF - self.registers[x as usize]) as u8;
                self.registers[x as usize] =
                    self.registers[x as usize].wrapping_add(self.registers[y as usize]);
            }

            Instruction::Sub(x, y, vx_minus_vy) => {
                if vx_minus_vy {
                    self.registers[VFLAG] =
                        (self.registers[x as usize] > self.registers[y as usize]) as u8;
                    self.registers[x as usize] =
                        self.registers[x as usize].wrapping_sub(self.registers[y as usize]);
                } else {
                    self.registers[VFLAG] =
                        (self.registers[y as usize] > self.registers[x as usize]) as u8;
                    self.registers[x as usize] =
                        self.registers[y as usize].wrapping_sub(self.registers[x as usize]);
                }
            }

            Instruction::Shift(x, right) => {
                if right {
                    self.registers[VFLAG] = self.registers[x as usize] & 1;
                    self.registers[x as usize] >>= 1;
                } else {
                    self.registers[VFLAG] = self.registers[x as usize] >> 7;
                    self.registers[x as usize] <<= 1;
                }
            }

            Instruction::GetDelayTimer(x) => self.registers[x as usize] = self.delay_timer,

            Instruction::SetDelayTimer(x) => self.delay_timer = self.registers[x as usize],

            Instruction::SetSoundTimer(x) => self.sound_timer = self.registers[x as usize],

            Instruction::SetIndex(address) => self.index = address,

            Instruction::SetIndexToHexChar(x) => {
                self.index = self.registers[x as usize] as u16 * FONT_CHAR_DATA_SIZE
            }

            Instruction::AddToIndex(x) => {
                let vx = self.registers[x as usize] as u16;
                self.registers[VFLAG] = (self.index as u32 + vx as u32 > ADDRESS_MASK as u32) as u8;
                self.index = self.index.wrapping_add(vx);
            }

            Instruction::Load(x) => {
                for i in 0..=x as usize {
                    self.registers[i] =
                        self.memory[(self.index as usize + i) & ADDRESS_MASK as usize];
                }
                self.index = x as u16 + 1;
            }

            Instruction::Store(x) => {
                for i in 0..=x as usize {
                    self.memory[(self.index as usize + i) & ADDRESS_MASK as usize] =
                        self.registers[i];
                }
                self.index = x as u16 + 1;
            }

            Instruction::StoreDecimal(x) => {
                let value = self.registers[x as usize];
                let address = self.index as usize;
                self.memory[address & ADDRESS_MASK as usize] = value / 100;
                self.memory[(address + 1) & ADDRESS_MASK as usize] = value / 10 % 10;
                self.memory[(address + 2) & ADDRESS_MASK as usize] = value % 10;
            }

            Instruction::GenerateRandom(x, bound) => {
                self.registers[x as usize] = (self.rng.next_u32() & bound as u32) as u8;
            }

            Instruction::Draw(x, y, height) => {
                let mut sprite = [0; 15];
                for (i, byte) in sprite[..height as usize].iter_mut().enumerate() {
                    *byte = self.memory[(self.index as usize + i) & ADDRESS_MASK as usize];
                }

                self.registers[VFLAG] = self.display.draw(
                    &sprite[..height as usize],
                    self.registers[x as usize],
                    self.registers[y as usize],
                ) as u8;
            }
        }

        ProgramStep::Next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::cell::Cell;
    use std::rc::Rc;

    fn interp_with(words: &[u16]) -> Interpreter {
        let mut image = Vec::with_capacity(words.len() * 2);
        for word in words {
            image.extend_from_slice(&word.to_be_bytes());
        }

        let mut interp = Interpreter::new();
        interp.load(&image).unwrap();
        interp
    }

    #[test]
    fn initial_state() {
        let interp = Interpreter::new();
        assert_eq!(interp.pc, 0x200);
        assert_eq!(interp.sp, 0);
        assert_eq!(interp.index, 0);
        assert_eq!(interp.registers, [0; 16]);
        assert_eq!(interp.delay_timer, 0);
        assert_eq!(interp.sound_timer, 0);
        // glyph table sits at the base of memory, 5 bytes per glyph
        assert_eq!(interp.memory[0..5], [0xF0, 0x90, 0x90, 0x90, 0xF0]); // "0"
        assert_eq!(interp.memory[75..80], [0xF0, 0x80, 0xF0, 0x80, 0x80]); // "F"
        assert_eq!(interp.memory[80..0x200], [0; 0x200 - 80]);
    }

    #[test]
    fn load_is_idempotent_and_preserves_state() {
        let mut interp = Interpreter::new();
        interp.registers[3] = 7;
        interp.delay_timer = 9;

        interp.load(&[0xAA, 0xBB]).unwrap();
        interp.load(&[0xCC]).unwrap();
        assert_eq!(interp.memory[0x200], 0xCC);
        assert_eq!(interp.memory[0x201], 0xBB);
        assert_eq!(interp.registers[3], 7);
        assert_eq!(interp.delay_timer, 9);
    }

    #[test]
    fn register_arithmetic_table() {
        // (word, V1 before, V2 before, V1 after, VF after)
        let cases = [
            (0x8124, 0xFF, 0x01, 0x00, 1), // add, carry
            (0x8124, 0x0F, 0x01, 0x10, 0), // add, no carry
            (0x8125, 0x01, 0x02, 0xFF, 0), // sub, borrow
            (0x8125, 0x05, 0x02, 0x03, 1), // sub, no borrow
            (0x8127, 0x01, 0x05, 0x04, 1), // subn, no borrow
            (0x8127, 0x05, 0x01, 0xFC, 0), // subn, borrow
            (0x8126, 0x05, 0xFF, 0x02, 1), // shr, Vy ignored
            (0x8126, 0x04, 0xFF, 0x02, 0),
            (0x812E, 0x81, 0xFF, 0x02, 1), // shl, Vy ignored
            (0x812E, 0x41, 0xFF, 0x82, 0),
        ];

        for &(word, v1, v2, v1_after, vf_after) in cases.iter() {
            let mut interp = interp_with(&[word]);
            interp.registers[1] = v1;
            interp.registers[2] = v2;
            interp.step();
            assert_eq!(
                interp.registers[1], v1_after,
                "V1 after {word:#06X} with V1={v1:#04X} V2={v2:#04X}"
            );
            assert_eq!(
                interp.registers[VFLAG], vf_after,
                "VF after {word:#06X} with V1={v1:#04X} V2={v2:#04X}"
            );
            assert_eq!(interp.pc, 0x202);
        }
    }

    #[test]
    fn bitwise_forms_leave_flag_alone() {
        // (word, V1 after)
        let cases = [
            (0x8120, 0b0011), // set
            (0x8121, 0b0111), // or
            (0x8122, 0b0010), // and
            (0x8123, 0b0101), // xor
        ];

        for &(word, v1_after) in cases.iter() {
            let mut interp = interp_with(&[word]);
            interp.registers[1] = 0b0110;
            interp.registers[2] = 0b0011;
            interp.registers[VFLAG] = 7;
            interp.step();
            assert_eq!(interp.registers[1], v1_after, "V1 after {word:#06X}");
            assert_eq!(interp.registers[VFLAG], 7, "VF after {word:#06X}");
        }
    }

    #[test]
    fn constant_forms() {
        let mut interp = interp_with(&[0x6142, 0x7103, 0x71FF]);
        interp.registers[VFLAG] = 5;

        interp.step();
        assert_eq!(interp.registers[1], 0x42);

        interp.step();
        assert_eq!(interp.registers[1], 0x45);

        // add-imm wraps without touching VF
        interp.step();
        assert_eq!(interp.registers[1], 0x44);
        assert_eq!(interp.registers[VFLAG], 5);
        assert_eq!(interp.pc, 0x206);
    }

    #[test]
    fn skip_forms() {
        // (word, V1, V2, skips)
        let cases = [
            (0x3142, 0x42, 0x00, true), // skip-eq-imm
            (0x3142, 0x41, 0x00, false),
            (0x4142, 0x41, 0x00, true), // skip-ne-imm
            (0x4142, 0x42, 0x00, false),
            (0x5120, 0x07, 0x07, true), // skip-eq-reg
            (0x5120, 0x07, 0x08, false),
            (0x9120, 0x07, 0x08, true), // skip-ne-reg
            (0x9120, 0x07, 0x07, false),
        ];

        for &(word, v1, v2, skips) in cases.iter() {
            let mut interp = interp_with(&[word]);
            interp.registers[1] = v1;
            interp.registers[2] = v2;
            interp.step();
            let expected = if skips { 0x204 } else { 0x202 };
            assert_eq!(interp.pc, expected, "pc after {word:#06X}");
        }
    }

    #[test]
    fn jump_forms() {
        let mut interp = interp_with(&[0x1300]);
        interp.step();
        assert_eq!(interp.pc, 0x300);

        let mut interp = interp_with(&[0xB300]);
        interp.registers[0] = 0x08;
        interp.step();
        assert_eq!(interp.pc, 0x308);
    }

    #[test]
    fn call_return_round_trip() {
        let mut interp = interp_with(&[0x2300]);
        interp.memory[0x300] = 0x00;
        interp.memory[0x301] = 0xEE;

        interp.step();
        assert_eq!(interp.pc, 0x300);
        assert_eq!(interp.sp, 1);
        assert_eq!(interp.stack[0], 0x200);

        interp.step();
        assert_eq!(interp.pc, 0x202);
        assert_eq!(interp.sp, 0);
    }

    #[test]
    fn index_forms() {
        let mut interp = interp_with(&[0xA123]);
        interp.step();
        assert_eq!(interp.index, 0x123);

        let mut interp = interp_with(&[0xF029]);
        interp.registers[0] = 0xA;
        interp.step();
        assert_eq!(interp.index, 0xA * 5);
        assert_eq!(interp.memory[interp.index as usize], 0xF0); // glyph "A"

        // add-index sets VF on 12-bit overflow
        let mut interp = interp_with(&[0xF11E]);
        interp.index = 0xFFF;
        interp.registers[1] = 1;
        interp.step();
        assert_eq!(interp.index, 0x1000);
        assert_eq!(interp.registers[VFLAG], 1);

        let mut interp = interp_with(&[0xF11E]);
        interp.index = 0x010;
        interp.registers[1] = 1;
        interp.step();
        assert_eq!(interp.index, 0x011);
        assert_eq!(interp.registers[VFLAG], 0);
    }

    #[test]
    fn random_respects_mask() {
        let mut interp = interp_with(&[0xC100]);
        interp.registers[1] = 0xAA;
        interp.step();
        assert_eq!(interp.registers[1], 0);

        let mut interp = interp_with(&[0xC10F]);
        interp.step();
        assert!(interp.registers[1] <= 0x0F);
    }

    #[test]
    fn draw_twice_clears_and_flags_collision() {
        let mut interp = interp_with(&[0xD011, 0xD011]);
        interp.index = 0x400;
        interp.memory[0x400] = 0xFF;

        interp.step();
        assert_eq!(interp.registers[VFLAG], 0);
        assert!(interp.display.take_redraw());
        assert!((0..8).all(|x| interp.display.pixel(x, 0)));

        interp.step();
        assert_eq!(interp.registers[VFLAG], 1);
        assert!(interp.display.take_redraw());
        assert!((0..8).all(|x| !interp.display.pixel(x, 0)));
    }

    #[test]
    fn draw_wraps_at_both_edges() {
        let mut interp = interp_with(&[0xD012]);
        interp.index = 0x400;
        interp.memory[0x400] = 0xFF;
        interp.memory[0x401] = 0xFF;
        interp.registers[0] = 60; // x
        interp.registers[1] = 31; // y
        interp.step();

        for y in [31, 0] {
            for x in [60, 61, 62, 63, 0, 1, 2, 3] {
                assert!(interp.display.pixel(x, y), "pixel ({x}, {y})");
            }
            assert!(!interp.display.pixel(4, y));
            assert!(!interp.display.pixel(59, y));
        }
    }

    #[test]
    fn clear_screen() {
        let mut interp = interp_with(&[0xD011, 0x00E0]);
        interp.index = 0x400;
        interp.memory[0x400] = 0xFF;

        interp.step();
        interp.step();
        assert!((0..64).all(|x| !interp.display.pixel(x, 0)));
        assert!(interp.display.take_redraw());
    }

    #[test]
    fn key_skip_forms() {
        let mut interp = interp_with(&[0xE19E]);
        interp.registers[1] = 0x7;
        interp.keypad.set_key(0x7, true);
        interp.step();
        assert_eq!(interp.pc, 0x204);

        let mut interp = interp_with(&[0xE19E]);
        interp.registers[1] = 0x7;
        interp.step();
        assert_eq!(interp.pc, 0x202);

        let mut interp = interp_with(&[0xE1A1]);
        interp.registers[1] = 0x7;
        interp.step();
        assert_eq!(interp.pc, 0x204);
    }

    #[test]
    fn wait_key_stalls_whole_step() {
        let mut interp = interp_with(&[0xF10A]);
        interp.delay_timer = 5;
        interp.sound_timer = 5;

        // nothing pressed: pc and timers frozen
        interp.step();
        interp.step();
        assert_eq!(interp.pc, 0x200);
        assert_eq!(interp.delay_timer, 5);
        assert_eq!(interp.sound_timer, 5);

        interp.keypad.set_key(0x7, true);
        interp.step();
        assert_eq!(interp.registers[1], 0x7);
        assert_eq!(interp.pc, 0x202);
        assert_eq!(interp.delay_timer, 4);
        assert_eq!(interp.sound_timer, 4);
    }

    #[test]
    fn wait_key_picks_lowest_pressed() {
        let mut interp = interp_with(&[0xF10A]);
        interp.keypad.set_key(0xC, true);
        interp.keypad.set_key(0x3, true);
        interp.step();
        assert_eq!(interp.registers[1], 0x3);
    }

    #[test]
    fn timer_forms() {
        let mut interp = interp_with(&[0xF115, 0xF207]);
        interp.registers[1] = 3;

        // the timer set by FX15 is already decremented at the end of the
        // same step
        interp.step();
        assert_eq!(interp.delay_timer, 2);

        interp.step();
        assert_eq!(interp.registers[2], 2);
        assert_eq!(interp.delay_timer, 1);
    }

    #[test]
    fn sound_timer_beeps_exactly_once() {
        let beeps = Rc::new(Cell::new(0));
        let mut interp = interp_with(&[0x6000, 0x6000, 0x6000, 0x6000]);
        interp.set_beeper({
            let beeps = Rc::clone(&beeps);
            move || beeps.set(beeps.get() + 1)
        });

        interp.sound_timer = 2;
        interp.step();
        assert_eq!(beeps.get(), 0);
        assert_eq!(interp.sound_timer, 1);

        // fires on the step that brings the timer to zero and never again
        interp.step();
        assert_eq!(beeps.get(), 1);
        assert_eq!(interp.sound_timer, 0);

        interp.step();
        interp.step();
        assert_eq!(beeps.get(), 1);
    }

    #[test]
    fn store_decimal_digits() {
        let mut interp = interp_with(&[0xF133]);
        interp.registers[1] = 234;
        interp.index = 0x400;
        interp.step();
        assert_eq!(interp.memory[0x400..0x403], [2, 3, 4]);

        let mut interp = interp_with(&[0xF133]);
        interp.registers[1] = 7;
        interp.index = 0x400;
        interp.step();
        assert_eq!(interp.memory[0x400..0x403], [0, 0, 7]);
    }

    #[test]
    fn store_and_load_registers() {
        let mut interp = interp_with(&[0xF255]);
        interp.registers[0] = 1;
        interp.registers[1] = 2;
        interp.registers[2] = 3;
        interp.registers[3] = 4; // beyond x, must not be stored
        interp.index = 0x400;
        interp.step();
        assert_eq!(interp.memory[0x400..0x404], [1, 2, 3, 0]);
        assert_eq!(interp.index, 3);

        let mut interp = interp_with(&[0xF165]);
        interp.memory[0x400] = 9;
        interp.memory[0x401] = 8;
        interp.memory[0x402] = 7; // beyond x, must not be loaded
        interp.index = 0x400;
        interp.step();
        assert_eq!(interp.registers[0], 9);
        assert_eq!(interp.registers[1], 8);
        assert_eq!(interp.registers[2], 0);
        assert_eq!(interp.index, 2);
    }

    #[test]
    fn unrecognized_word_hangs_in_place() {
        let mut interp = interp_with(&[0xF1FF]);
        interp.delay_timer = 5;
        interp.sound_timer = 5;

        interp.step();
        interp.step();
        assert_eq!(interp.pc, 0x200);
        assert_eq!(interp.delay_timer, 5);
        assert_eq!(interp.sound_timer, 5);
    }

    #[test]
    fn decode_rejects_malformed_words() {
        for word in [0x0000, 0x00E1, 0x5121, 0x8128, 0x9121, 0xE100, 0xF100] {
            assert!(
                InstructionParameters::from(word).try_decode().is_err(),
                "{word:#06X} should not decode"
            );
        }
    }
}
