//! Deals with how instructions are executed

use super::error::ExecError;
use super::into_register::IntoRegister;
use super::memory::Memory;
use super::registers::Registers;
use crate::instruction::{Canonical, Reg};
use parking_lot::Mutex;

/// Executes an instruction of type R
#[inline(always)]
fn type_r<R, F>(regs: &Registers, rd: Reg, rs1: Reg, rs2: Reg, op: F)
where
    R: IntoRegister,
    F: Fn(u32, u32) -> R,
{
    regs.set(rd, op(regs.get(rs1), regs.get(rs2)));
}

/// Same as [`type_r`], but the second operand is an immediate
#[inline(always)]
fn type_i<R, F>(regs: &Registers, rd: Reg, rs1: Reg, imm: i32, op: F)
where
    R: IntoRegister,
    F: Fn(u32, u32) -> R,
{
    regs.set(rd, op(regs.get(rs1), imm as u32));
}

#[inline(always)]
fn branch<F>(regs: &Registers, pc: &mut u32, lhs: Reg, rhs: Reg, offset: i32, cond: F)
where
    F: Fn(u32, u32) -> bool,
{
    *pc = if cond(regs.get(lhs), regs.get(rhs)) {
        pc.wrapping_add_signed(offset)
    } else {
        pc.wrapping_add(4)
    };
}

/// Executes one instruction and moves the program counter.
///
/// `memory` is only locked by `lw` and `sw`, and only for the duration of the access. If the
/// access fails the instruction still completes (a failed load reads 0) and the error is
/// returned so the caller can report it.
pub fn execute(
    op: Canonical,
    regs: &Registers,
    memory: &Mutex<Memory>,
    pc: &mut u32,
) -> Result<(), ExecError> {
    use Canonical::*;

    let mut result = Ok(());
    match op {
        // Type R
        Add(rd, rs1, rs2) => type_r(regs, rd, rs1, rs2, |a, b| a.wrapping_add(b)),
        Sub(rd, rs1, rs2) => type_r(regs, rd, rs1, rs2, |a, b| a.wrapping_sub(b)),
        And(rd, rs1, rs2) => type_r(regs, rd, rs1, rs2, |a, b| a & b),
        Or(rd, rs1, rs2) => type_r(regs, rd, rs1, rs2, |a, b| a | b),
        Xor(rd, rs1, rs2) => type_r(regs, rd, rs1, rs2, |a, b| a ^ b),
        Slt(rd, rs1, rs2) => type_r(regs, rd, rs1, rs2, |a, b| (a as i32) < (b as i32)),
        Sltu(rd, rs1, rs2) => type_r(regs, rd, rs1, rs2, |a, b| a < b),
        Sra(rd, rs1, rs2) => type_r(regs, rd, rs1, rs2, |a, b| (a as i32) >> (b & 31)),
        Srl(rd, rs1, rs2) => type_r(regs, rd, rs1, rs2, |a, b| a >> (b & 31)),
        Sll(rd, rs1, rs2) => type_r(regs, rd, rs1, rs2, |a, b| a << (b & 31)),
        Mul(rd, rs1, rs2) => type_r(regs, rd, rs1, rs2, |a, b| a.wrapping_mul(b)),

        // Type I
        Addi(rd, rs1, imm) => type_i(regs, rd, rs1, imm, |a, b| a.wrapping_add(b)),
        Andi(rd, rs1, imm) => type_i(regs, rd, rs1, imm, |a, b| a & b),
        Ori(rd, rs1, imm) => type_i(regs, rd, rs1, imm, |a, b| a | b),
        Xori(rd, rs1, imm) => type_i(regs, rd, rs1, imm, |a, b| a ^ b),
        Slti(rd, rs1, imm) => type_i(regs, rd, rs1, imm, |a, b| (a as i32) < (b as i32)),
        Sltiu(rd, rs1, imm) => type_i(regs, rd, rs1, imm, |a, b| a < b),
        Srai(rd, rs1, imm) => type_i(regs, rd, rs1, imm, |a, b| (a as i32) >> (b & 31)),
        Srli(rd, rs1, imm) => type_i(regs, rd, rs1, imm, |a, b| a >> (b & 31)),
        Slli(rd, rs1, imm) => type_i(regs, rd, rs1, imm, |a, b| a << (b & 31)),
        Lui(rd, imm) => regs.set(rd, (imm as u32) << 12),
        Auipc(rd, imm) => regs.set(rd, pc.wrapping_add((imm as u32) << 12)),

        // Memory
        Lw(rd, base, offset) => {
            let addr = regs.get::<i32>(base).wrapping_add(offset);
            let loaded = memory.lock().load_word(addr);
            regs.set(rd, loaded.as_ref().copied().unwrap_or(0));
            result = loaded.map(drop).map_err(ExecError::from);
        }
        Sw(rs, base, offset) => {
            let addr = regs.get::<i32>(base).wrapping_add(offset);
            let value = regs.get::<i32>(rs);
            result = memory.lock().store_word(addr, value).map_err(ExecError::from);
        }

        // Branches + jumps
        Beq(lhs, rhs, offset) => {
            branch(regs, pc, lhs, rhs, offset, |a, b| a == b);
            return Ok(());
        }
        Bne(lhs, rhs, offset) => {
            branch(regs, pc, lhs, rhs, offset, |a, b| a != b);
            return Ok(());
        }
        Blt(lhs, rhs, offset) => {
            branch(regs, pc, lhs, rhs, offset, |a, b| (a as i32) < (b as i32));
            return Ok(());
        }
        Bge(lhs, rhs, offset) => {
            branch(regs, pc, lhs, rhs, offset, |a, b| (a as i32) >= (b as i32));
            return Ok(());
        }
        Bltu(lhs, rhs, offset) => {
            branch(regs, pc, lhs, rhs, offset, |a, b| a < b);
            return Ok(());
        }
        Bgeu(lhs, rhs, offset) => {
            branch(regs, pc, lhs, rhs, offset, |a, b| a >= b);
            return Ok(());
        }

        Jal(rd, offset) => {
            regs.set(rd, pc.wrapping_add(4));
            *pc = pc.wrapping_add_signed(offset);
            return Ok(());
        }
        Jalr(rd, base, imm) => {
            // `rd` is written before `base` is read, so `jalr x5 x5 0` jumps right past itself
            regs.set(rd, pc.wrapping_add(4));
            *pc = regs.get::<u32>(base).wrapping_add(imm as u32) & !1;
            return Ok(());
        }

        Nop => {}
        Unsupported(op) => result = Err(ExecError::Unsupported(op)),
    }

    *pc = pc.wrapping_add(4);
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::{Instruction, Opcode};
    use crate::simulator::error::AddressError;
    use crate::simulator::memory::{GPIO_IN, GPIO_OUT};
    use proptest::prelude::*;

    struct Cpu {
        regs: Registers,
        memory: Mutex<Memory>,
        pc: u32,
    }

    impl Cpu {
        fn new() -> Self {
            Self {
                regs: Registers::new(),
                memory: Mutex::new(Memory::new(0x0010_1000).unwrap()),
                pc: 0,
            }
        }

        fn run(&mut self, op: Opcode, a: i32, b: i32, c: i32) -> Result<(), ExecError> {
            let canonical = Instruction::new(op, a, b, c).canonical().unwrap();
            execute(canonical, &self.regs, &self.memory, &mut self.pc)
        }

        fn set(&self, r: i32, x: i32) {
            self.regs.set(Reg::new(r).unwrap(), x);
        }

        fn get(&self, r: i32) -> i32 {
            self.regs.get(Reg::new(r).unwrap())
        }
    }

    #[test]
    fn test_arithmetic() {
        use Opcode::*;
        let mut cpu = Cpu::new();
        cpu.set(1, -7);
        cpu.set(2, 3);

        let cases = [
            (Add, -4),
            (Sub, -10),
            (And, -7 & 3),
            (Or, -7 | 3),
            (Xor, -7 ^ 3),
            (Slt, 1),
            (Sltu, 0),
            (Sra, -1),
            (Srl, ((-7i32 as u32) >> 3) as i32),
            (Sll, -56),
            (Mul, -21),
        ];
        for (op, expected) in cases {
            cpu.run(op, 3, 1, 2).unwrap();
            assert_eq!(cpu.get(3), expected, "{op}");
        }
        assert_eq!(cpu.pc, 4 * cases.len() as u32);
    }

    #[test]
    fn test_shift_amount_is_masked() {
        let mut cpu = Cpu::new();
        cpu.set(1, 1);
        cpu.set(2, 33);
        cpu.run(Opcode::Sll, 3, 1, 2).unwrap();
        assert_eq!(cpu.get(3), 2);
        cpu.run(Opcode::Slli, 3, 1, 36).unwrap();
        assert_eq!(cpu.get(3), 16);
    }

    #[test]
    fn test_immediates() {
        use Opcode::*;
        let mut cpu = Cpu::new();
        cpu.set(1, -1);

        cpu.run(Sltiu, 2, 1, 5).unwrap();
        assert_eq!(cpu.get(2), 0);
        cpu.run(Slti, 2, 1, 5).unwrap();
        assert_eq!(cpu.get(2), 1);
        cpu.run(Srli, 2, 1, 28).unwrap();
        assert_eq!(cpu.get(2), 0xF);
        cpu.run(Srai, 2, 1, 28).unwrap();
        assert_eq!(cpu.get(2), -1);
        cpu.run(Lui, 2, 0x12345, 0).unwrap();
        assert_eq!(cpu.get(2), 0x1234_5000);

        // pc is 20 here
        cpu.run(Auipc, 2, 1, 0).unwrap();
        assert_eq!(cpu.get(2), 20 + 0x1000);
        assert_eq!(cpu.pc, 24);
    }

    #[test]
    fn test_load_store() {
        use Opcode::*;
        let mut cpu = Cpu::new();
        cpu.set(1, 0x100);
        cpu.set(2, 0x5566_7788);

        cpu.run(Sw, 2, 1, 8).unwrap();
        cpu.run(Lw, 3, 1, 8).unwrap();
        assert_eq!(cpu.get(3), 0x5566_7788);
        cpu.run(Lw, 4, 0, 0x108).unwrap();
        assert_eq!(cpu.get(4), 0x5566_7788);
        assert_eq!(cpu.pc, 12);
    }

    #[test]
    fn test_bad_access_continues_with_zero() {
        use Opcode::*;
        let mut cpu = Cpu::new();
        cpu.set(3, 99);

        let err = cpu.run(Lw, 3, 0, -16).unwrap_err();
        assert!(matches!(err, ExecError::Address(AddressError::OutOfRange { .. })));
        assert_eq!(cpu.get(3), 0);
        assert_eq!(cpu.pc, 4);

        let err = cpu.run(Lw, 3, 0, GPIO_OUT).unwrap_err();
        assert_eq!(err, ExecError::Address(AddressError::WriteOnly(GPIO_OUT)));

        let err = cpu.run(Sw, 3, 0, GPIO_IN).unwrap_err();
        assert_eq!(err, ExecError::Address(AddressError::ReadOnly(GPIO_IN)));
        assert_eq!(cpu.pc, 12);
    }

    #[test]
    fn test_branches() {
        use Opcode::*;
        let mut cpu = Cpu::new();
        cpu.set(1, -1);
        cpu.set(2, 1);

        let cases = [
            (Beq, false),
            (Bne, true),
            (Blt, true),
            (Bge, false),
            (Bltu, false),
            (Bgeu, true),
        ];
        for (op, taken) in cases {
            cpu.pc = 100;
            cpu.run(op, 1, 2, -40).unwrap();
            assert_eq!(cpu.pc, if taken { 60 } else { 104 }, "{op}");
        }
    }

    #[test]
    fn test_jumps() {
        use Opcode::*;
        let mut cpu = Cpu::new();
        cpu.pc = 16;
        cpu.run(Jal, 1, -8, 0).unwrap();
        assert_eq!((cpu.get(1), cpu.pc), (20, 8));

        cpu.set(5, 101);
        cpu.run(Jalr, 6, 5, 4).unwrap();
        assert_eq!((cpu.get(6), cpu.pc), (12, 104));

        cpu.run(Ret, 0, 0, 0).unwrap();
        assert_eq!(cpu.pc, 20);

        // rd == base reads the freshly written link
        cpu.run(Jalr, 7, 7, 0).unwrap();
        assert_eq!(cpu.pc, 24);
    }

    #[test]
    fn test_unsupported_is_a_nop() {
        let mut cpu = Cpu::new();
        let err = cpu.run(Opcode::La, 1, 100, 0).unwrap_err();
        assert_eq!(err, ExecError::Unsupported(Opcode::La));
        assert_eq!(cpu.get(1), 0);
        assert_eq!(cpu.pc, 4);
    }

    fn opcode() -> impl Strategy<Value = Opcode> {
        prop::sample::select(Opcode::ALL.to_vec())
    }

    proptest! {
        #[test]
        fn pc_moves_by_four(op in opcode(), a in 0..32i32, b in 0..32i32, c in 0..32i32, pc in 0..0x1000u32) {
            use Opcode::*;
            let is_control = matches!(op,
                Beq | Bne | Blt | Bge | Bltu | Bgeu | Jal | Jalr |
                Beqz | Bnez | Blez | Bgez | Bltz | Bgtz | Bgt | Ble | Bgtu | Bleu |
                J | Jr | Ret | Call);
            prop_assume!(!is_control);

            let mut cpu = Cpu::new();
            cpu.pc = pc * 4;
            let _ = cpu.run(op, a, b, c);
            prop_assert_eq!(cpu.pc, pc * 4 + 4);
        }

        #[test]
        fn mv_is_addi(rd in 0..32i32, rs in 0..32i32, values in prop::array::uniform32(any::<i32>())) {
            let mut mv = Cpu::new();
            let mut addi = Cpu::new();
            for (i, x) in values.iter().enumerate() {
                mv.set(i as i32, *x);
                addi.set(i as i32, *x);
            }

            mv.run(Opcode::Mv, rd, rs, 0).unwrap();
            addi.run(Opcode::Addi, rd, rs, 0).unwrap();
            prop_assert_eq!(mv.regs.snapshot(), addi.regs.snapshot());
            prop_assert_eq!(mv.pc, addi.pc);
        }

        #[test]
        fn beq_offset(lhs: i32, rhs: i32, offset in -1000..1000i32) {
            let mut cpu = Cpu::new();
            cpu.set(1, lhs);
            cpu.set(2, rhs);
            cpu.pc = 4000;
            cpu.run(Opcode::Beq, 1, 2, offset * 4).unwrap();
            let expected = if lhs == rhs { 4000 + offset * 4 } else { 4004 };
            prop_assert_eq!(cpu.pc, expected as u32);
        }
    }
}
