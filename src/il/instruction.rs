//! Instructions and the registers they produce.
use std::fmt::{self, Display, Formatter};

use crate::{
    ast::{BinaryOp, CastOp, CompareOp, Literal, NumericOp, ShiftOp, UnaryOp},
    error::{internal_error, InternalError},
};

use super::{BlockId, StructId, Type};

/// A virtual register: an index into the parameters of a block, followed by its
/// instructions. Registers are only meaningful within the block that produces them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Register(pub usize);
impl Display for Register {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "${}", self.0)
    }
}

/// A single operation, producing a value of type `ty`. Store-like operations produce
/// a `void` register.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub operation: Operation,
    pub ty: Type,
}
impl Instruction {
    pub fn new(operation: Operation, ty: Type) -> Self {
        Self { operation, ty }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Literal(Literal),
    /// Reference a block, so it can be jumped to or stored.
    BlockRef(BlockId),
    /// Mirror an existing register. Removed by the optimiser.
    GetSymbol(Register),
    Unary(UnaryOp, Register),
    Compare(CompareOp, Register, Register),
    Numeric(NumericOp, Register, Register),
    Shift(ShiftOp, Register, Register),
    StrConcat(Register, Register),
    Identity(Register, Register),
    GetIndex(Register, Register),
    SetIndex {
        array: Register,
        index: Register,
        value: Register,
    },
    GetField {
        object: Register,
        field: usize,
    },
    SetField {
        object: Register,
        field: usize,
        value: Register,
    },
    Cast(CastOp, Register),
    /// Allocate an instance of a struct on the heap.
    New(StructId),
    NewArray(Register),
    Native {
        name: String,
        arguments: Vec<Register>,
    },
}
impl Operation {
    /// Combine the operands of a fixed-arity operation into a single operation.
    /// The number of operands must match the arity of the operation.
    pub fn linear(op: LinearOp, operands: &[Register]) -> Self {
        if operands.len() != op.arity() {
            internal_error(InternalError::LinearArity {
                expected: op.arity(),
                found: operands.len(),
            });
        }

        match op {
            LinearOp::Unary(un) => Operation::Unary(un, operands[0]),
            LinearOp::Binary(bin) => {
                let (lhs, rhs) = (operands[0], operands[1]);
                match bin {
                    BinaryOp::Compare(cmp) => Operation::Compare(cmp, lhs, rhs),
                    BinaryOp::Numeric(num) => Operation::Numeric(num, lhs, rhs),
                    BinaryOp::Shift(shift) => Operation::Shift(shift, lhs, rhs),
                    BinaryOp::StrConcat => Operation::StrConcat(lhs, rhs),
                    BinaryOp::Identity => Operation::Identity(lhs, rhs),
                    BinaryOp::GetIndex => Operation::GetIndex(lhs, rhs),
                }
            }
        }
    }

    /// All registers read by this operation, in operand order.
    pub fn operands(&self) -> Vec<Register> {
        let mut operands = self.clone();
        operands.operands_mut().into_iter().map(|r| *r).collect()
    }

    pub fn operands_mut(&mut self) -> Vec<&mut Register> {
        match self {
            Self::Literal(_) | Self::BlockRef(_) | Self::New(_) => vec![],
            Self::GetSymbol(r) | Self::Unary(_, r) | Self::Cast(_, r) | Self::NewArray(r) => {
                vec![r]
            }
            Self::Compare(_, a, b)
            | Self::Numeric(_, a, b)
            | Self::Shift(_, a, b)
            | Self::StrConcat(a, b)
            | Self::Identity(a, b)
            | Self::GetIndex(a, b) => vec![a, b],
            Self::SetIndex {
                array,
                index,
                value,
            } => vec![array, index, value],
            Self::GetField { object, .. } => vec![object],
            Self::SetField { object, value, .. } => vec![object, value],
            Self::Native { arguments, .. } => arguments.iter_mut().collect(),
        }
    }

    pub fn as_block_ref(&self) -> Option<BlockId> {
        match self {
            Self::BlockRef(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_mirror(&self) -> Option<Register> {
        match self {
            Self::GetSymbol(src) => Some(*src),
            _ => None,
        }
    }
}
impl Display for Operation {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::Literal(lit) => write!(f, "{}", lit),
            Self::BlockRef(block) => write!(f, "ref {}", block),
            Self::GetSymbol(src) => write!(f, "{}", src),
            Self::Unary(op, r) => write!(f, "{} {}", op, r),
            Self::Compare(op, a, b) => write!(f, "{} cmp {} {}", a, op, b),
            Self::Numeric(op, a, b) => write!(f, "{} {} {}", a, op, b),
            Self::Shift(op, a, b) => write!(f, "{} {} {}", a, op, b),
            Self::StrConcat(a, b) => write!(f, "concat {}, {}", a, b),
            Self::Identity(a, b) => write!(f, "{} is {}", a, b),
            Self::GetIndex(a, i) => write!(f, "index {}[{}]", a, i),
            Self::SetIndex {
                array,
                index,
                value,
            } => write!(f, "setindex {}[{}] = {}", array, index, value),
            Self::GetField { object, field } => write!(f, "load {}->{}", object, field),
            Self::SetField {
                object,
                field,
                value,
            } => write!(f, "store {}->{} = {}", object, field, value),
            Self::Cast(op, r) => write!(f, "{} {}", op, r),
            Self::New(id) => write!(f, "new {}", id),
            Self::NewArray(len) => write!(f, "newarray {}", len),
            Self::Native { name, arguments } => {
                let args = arguments
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "native {}({})", name, args)
            }
        }
    }
}

/// An operation with a fixed, statically-known number of operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinearOp {
    Unary(UnaryOp),
    Binary(BinaryOp),
}
impl LinearOp {
    pub fn arity(&self) -> usize {
        match self {
            LinearOp::Unary(_) => 1,
            LinearOp::Binary(_) => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_operations_take_their_operands_in_order() {
        let op = Operation::linear(
            LinearOp::Binary(BinaryOp::Numeric(NumericOp::Sub)),
            &[Register(3), Register(1)],
        );
        assert_eq!(Operation::Numeric(NumericOp::Sub, Register(3), Register(1)), op);
        assert_eq!(vec![Register(3), Register(1)], op.operands());
    }

    #[test]
    #[should_panic(expected = "linear operation expects 1 operand(s), found 2")]
    fn linear_operation_rejects_wrong_operand_count() {
        Operation::linear(LinearOp::Unary(UnaryOp::Not), &[Register(0), Register(1)]);
    }

    #[test]
    fn operands_can_be_rewritten_in_place() {
        let mut op = Operation::SetIndex {
            array: Register(0),
            index: Register(1),
            value: Register(2),
        };
        for operand in op.operands_mut() {
            operand.0 += 10;
        }
        assert_eq!(vec![Register(10), Register(11), Register(12)], op.operands());
    }

    #[test]
    fn store_operations_render_their_target() {
        let op = Operation::SetField {
            object: Register(4),
            field: 2,
            value: Register(1),
        };
        assert_eq!("store $4->2 = $1", op.to_string());
        assert_eq!("ref B3", Operation::BlockRef(BlockId(3)).to_string());
    }
}
