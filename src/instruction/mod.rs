//!
//! Instructions as they come out of the program compiler, and the canonical form the
//! executor actually runs.
//!
//! A program line is an [`Opcode`] plus three raw integer operands. Pseudoinstructions are
//! rewritten into exactly one base instruction (see [`pseudo`]) and then decoded into a
//! [`Canonical`], which names every operand by its role and validates register indices.
//!

use std::fmt;
use thiserror::Error;

pub mod pseudo;

macro_rules! opcodes {
    ($($name:ident => $mnemonic:literal),* $(,)?) => {
        /// Every opcode the compiler can emit. The discriminant is the ordinal used in the
        /// program text format, so the order here must never change.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u8)]
        pub enum Opcode {
            $($name),*
        }

        impl Opcode {
            pub const ALL: &'static [Opcode] = &[$(Opcode::$name),*];

            pub fn mnemonic(self) -> &'static str {
                match self {
                    $(Opcode::$name => $mnemonic),*
                }
            }
        }
    };
}

opcodes! {
    Empty => "empty",
    Add => "add",
    Sub => "sub",
    And => "and",
    Or => "or",
    Xor => "xor",
    Slt => "slt",
    Sltu => "sltu",
    Sra => "sra",
    Srl => "srl",
    Sll => "sll",
    Mul => "mul",
    Slli => "slli",
    Addi => "addi",
    Andi => "andi",
    Ori => "ori",
    Xori => "xori",
    Slti => "slti",
    Sltiu => "sltiu",
    Srai => "srai",
    Srli => "srli",
    Lui => "lui",
    Auipc => "auipc",
    Lw => "lw",
    Sw => "sw",
    Beq => "beq",
    Bne => "bne",
    Blt => "blt",
    Bge => "bge",
    Bltu => "bltu",
    Bgeu => "bgeu",
    Jal => "jal",
    Jalr => "jalr",
    Flag => "flag",
    // Pseudoinstructions
    Nop => "nop",
    Li => "li",
    La => "la",
    Mv => "mv",
    Not => "not",
    Neg => "neg",
    Seqz => "seqz",
    Snez => "snez",
    Sltz => "sltz",
    Sgtz => "sgtz",
    Beqz => "beqz",
    Bnez => "bnez",
    Blez => "blez",
    Bgez => "bgez",
    Bltz => "bltz",
    Bgtz => "bgtz",
    Bgt => "bgt",
    Ble => "ble",
    Bgtu => "bgtu",
    Bleu => "bleu",
    J => "j",
    Jr => "jr",
    Ret => "ret",
    Call => "call",
}

impl Opcode {
    /// Looks up the opcode with the given ordinal
    pub fn from_ordinal(ordinal: i32) -> Option<Opcode> {
        usize::try_from(ordinal)
            .ok()
            .and_then(|i| Self::ALL.get(i))
            .copied()
    }

    pub fn ordinal(self) -> u8 {
        self as u8
    }
}

impl PartialOrd for Opcode {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Opcode {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.ordinal().cmp(&other.ordinal())
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.mnemonic())
    }
}

/// Index of one of the 32 general purpose registers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Reg(u8);

impl Reg {
    pub const ZERO: Reg = Reg(0);
    pub const RA: Reg = Reg(1);

    pub fn new(i: i32) -> Option<Reg> {
        u8::try_from(i).ok().filter(|&i| i < 32).map(Reg)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{}", self.0)
    }
}

/// One line of a program, exactly as the compiler wrote it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub op: Opcode,
    pub a: i32,
    pub b: i32,
    pub c: i32,
}

impl Instruction {
    pub const EMPTY: Instruction = Instruction::new(Opcode::Empty, 0, 0, 0);

    pub const fn new(op: Opcode, a: i32, b: i32, c: i32) -> Self {
        Self { op, a, b, c }
    }

    /// Rewrites pseudoinstructions and decodes the result into its canonical form
    pub fn canonical(&self) -> Result<Canonical, DecodeError> {
        Canonical::decode(&pseudo::expand(*self))
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<6} {} {} {}", self.op, self.a, self.b, self.c)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Unknown opcode ordinal {0}")]
    UnknownOpcode(i32),

    #[error("Operand {operand} of '{op}' must be a register (0-31), found {value}")]
    BadRegister {
        op: Opcode,
        operand: char,
        value: i32,
    },
}

/// An instruction with its operands resolved by role. This is what the executor dispatches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Canonical {
    /// rd, rs1, rs2
    Add(Reg, Reg, Reg),
    Sub(Reg, Reg, Reg),
    And(Reg, Reg, Reg),
    Or(Reg, Reg, Reg),
    Xor(Reg, Reg, Reg),
    Slt(Reg, Reg, Reg),
    Sltu(Reg, Reg, Reg),
    Sra(Reg, Reg, Reg),
    Srl(Reg, Reg, Reg),
    Sll(Reg, Reg, Reg),
    Mul(Reg, Reg, Reg),

    /// rd, rs1, imm
    Addi(Reg, Reg, i32),
    Andi(Reg, Reg, i32),
    Ori(Reg, Reg, i32),
    Xori(Reg, Reg, i32),
    Slti(Reg, Reg, i32),
    Sltiu(Reg, Reg, i32),
    Srai(Reg, Reg, i32),
    Srli(Reg, Reg, i32),
    Slli(Reg, Reg, i32),
    /// rd, imm
    Lui(Reg, i32),
    Auipc(Reg, i32),

    /// rd, base, offset
    Lw(Reg, Reg, i32),
    /// rs, base, offset
    Sw(Reg, Reg, i32),

    /// lhs, rhs, offset
    Beq(Reg, Reg, i32),
    Bne(Reg, Reg, i32),
    Blt(Reg, Reg, i32),
    Bge(Reg, Reg, i32),
    Bltu(Reg, Reg, i32),
    Bgeu(Reg, Reg, i32),

    /// rd, offset
    Jal(Reg, i32),
    /// rd, base, imm
    Jalr(Reg, Reg, i32),

    /// `empty`, `flag` and `nop`
    Nop,
    /// Accepted by the compiler, but not executable
    Unsupported(Opcode),
}

impl Canonical {
    /// Decodes a base (non-pseudo) instruction. Pseudoinstructions other than `nop` and `la`
    /// must go through [`pseudo::expand`] first.
    pub fn decode(i: &Instruction) -> Result<Canonical, DecodeError> {
        use Canonical as C;
        use Opcode::*;

        let reg = |operand: char, value: i32| {
            Reg::new(value).ok_or(DecodeError::BadRegister {
                op: i.op,
                operand,
                value,
            })
        };
        let (a, b, c) = (i.a, i.b, i.c);

        macro_rules! rrr {
            ($variant:ident) => {
                C::$variant(reg('a', a)?, reg('b', b)?, reg('c', c)?)
            };
        }
        macro_rules! rri {
            ($variant:ident) => {
                C::$variant(reg('a', a)?, reg('b', b)?, c)
            };
        }

        let decoded = match i.op {
            Add => rrr!(Add),
            Sub => rrr!(Sub),
            And => rrr!(And),
            Or => rrr!(Or),
            Xor => rrr!(Xor),
            Slt => rrr!(Slt),
            Sltu => rrr!(Sltu),
            Sra => rrr!(Sra),
            Srl => rrr!(Srl),
            Sll => rrr!(Sll),
            Mul => rrr!(Mul),

            Addi => rri!(Addi),
            Andi => rri!(Andi),
            Ori => rri!(Ori),
            Xori => rri!(Xori),
            Slti => rri!(Slti),
            Sltiu => rri!(Sltiu),
            Srai => rri!(Srai),
            Srli => rri!(Srli),
            Slli => rri!(Slli),
            Lui => C::Lui(reg('a', a)?, b),
            Auipc => C::Auipc(reg('a', a)?, b),

            Lw => rri!(Lw),
            Sw => rri!(Sw),

            Beq => rri!(Beq),
            Bne => rri!(Bne),
            Blt => rri!(Blt),
            Bge => rri!(Bge),
            Bltu => rri!(Bltu),
            Bgeu => rri!(Bgeu),

            Jal => C::Jal(reg('a', a)?, b),
            Jalr => rri!(Jalr),

            Empty | Flag | Nop => C::Nop,
            op => C::Unsupported(op),
        };

        Ok(decoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordinals() {
        assert_eq!(Opcode::from_ordinal(0), Some(Opcode::Empty));
        assert_eq!(Opcode::from_ordinal(12), Some(Opcode::Slli));
        assert_eq!(Opcode::from_ordinal(23), Some(Opcode::Lw));
        assert_eq!(Opcode::from_ordinal(31), Some(Opcode::Jal));
        assert_eq!(Opcode::from_ordinal(36), Some(Opcode::La));
        assert_eq!(Opcode::from_ordinal(57), Some(Opcode::Call));
        assert_eq!(Opcode::from_ordinal(58), None);
        assert_eq!(Opcode::from_ordinal(-1), None);

        for (i, op) in Opcode::ALL.iter().enumerate() {
            assert_eq!(op.ordinal() as usize, i);
        }
    }

    #[test]
    fn test_pseudo_boundary() {
        assert!(Opcode::Flag < Opcode::Nop);
        assert_eq!(Opcode::from_ordinal(Opcode::Flag.ordinal() as i32 + 1), Some(Opcode::Nop));
        assert!(Opcode::Call > Opcode::Nop);
    }

    #[test]
    fn test_decode_roles() {
        let r = |i| Reg::new(i).unwrap();
        let lw = Instruction::new(Opcode::Lw, 5, 2, -8);
        assert_eq!(lw.canonical(), Ok(Canonical::Lw(r(5), r(2), -8)));

        let jal = Instruction::new(Opcode::Jal, 1, -12, 99);
        assert_eq!(jal.canonical(), Ok(Canonical::Jal(r(1), -12)));

        let lui = Instruction::new(Opcode::Lui, 3, 0x12345, 0);
        assert_eq!(lui.canonical(), Ok(Canonical::Lui(r(3), 0x12345)));
    }

    #[test]
    fn test_decode_bad_register() {
        let add = Instruction::new(Opcode::Add, 1, 32, 3);
        assert_eq!(
            add.canonical(),
            Err(DecodeError::BadRegister {
                op: Opcode::Add,
                operand: 'b',
                value: 32
            })
        );

        // immediates are never checked
        let addi = Instruction::new(Opcode::Addi, 1, 2, 1 << 20);
        assert!(addi.canonical().is_ok());
    }

    #[test]
    fn test_no_ops() {
        for op in [Opcode::Empty, Opcode::Flag, Opcode::Nop] {
            assert_eq!(Instruction::new(op, 7, 8, 9).canonical(), Ok(Canonical::Nop));
        }
        assert_eq!(
            Instruction::new(Opcode::La, 1, 100, 0).canonical(),
            Ok(Canonical::Unsupported(Opcode::La))
        );
    }
}
