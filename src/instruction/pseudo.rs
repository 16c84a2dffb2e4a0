//! Pseudoinstruction rewrite table. Each pseudoinstruction becomes exactly one base
//! instruction with its operands permuted or replaced by constants.

use super::{Instruction, Opcode, Reg};

/// Where an operand of the rewritten instruction comes from
#[derive(Debug, Clone, Copy)]
enum Operand {
    A,
    B,
    C,
    Lit(i32),
}

use Operand::{Lit, A, B, C};

const X0: Operand = Lit(Reg::ZERO.0 as i32);
const X1: Operand = Lit(Reg::RA.0 as i32);

/// `None` for base instructions (and for `nop`/`la`, which decode on their own)
fn rewrite(op: Opcode) -> Option<(Opcode, [Operand; 3])> {
    use Opcode::*;

    let rule = match op {
        Li => (Addi, [A, X0, B]),
        Mv => (Addi, [A, B, Lit(0)]),
        Not => (Xori, [A, B, Lit(-1)]),
        Neg => (Sub, [A, X0, B]),
        Seqz => (Sltiu, [A, B, Lit(1)]),
        Snez => (Sltu, [A, X0, B]),
        Sltz => (Slt, [A, B, X0]),
        Sgtz => (Slt, [A, X0, B]),

        Beqz => (Beq, [A, X0, B]),
        Bnez => (Bne, [A, X0, B]),
        Blez => (Bge, [X0, A, B]),
        Bgez => (Bge, [A, X0, B]),
        Bltz => (Blt, [A, X0, B]),
        Bgtz => (Blt, [X0, A, B]),
        Bgt => (Blt, [B, A, C]),
        Ble => (Bge, [B, A, C]),
        Bgtu => (Bltu, [B, A, C]),
        Bleu => (Bgeu, [B, A, C]),

        J => (Jal, [X0, A, Lit(0)]),
        Jr => (Jalr, [X0, A, Lit(0)]),
        Ret => (Jalr, [X0, X1, Lit(0)]),
        Call => (Jal, [X1, A, Lit(0)]),

        _ => return None,
    };

    Some(rule)
}

/// Rewrites a pseudoinstruction into its base instruction. Anything else is returned as is.
pub fn expand(i: Instruction) -> Instruction {
    let Some((op, [a, b, c])) = rewrite(i.op) else {
        return i;
    };

    let pick = |operand| match operand {
        A => i.a,
        B => i.b,
        C => i.c,
        Lit(x) => x,
    };

    Instruction::new(op, pick(a), pick(b), pick(c))
}
