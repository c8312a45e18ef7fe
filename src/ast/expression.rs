//! Analyzed expression nodes.
use std::fmt::{self, Display};

use super::{ClassId, FunctionId, TypeSpec};

/// An expression together with the type analysis resolved for it.
#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub ty: TypeSpec,
}
impl Expr {
    pub fn new(kind: ExprKind, ty: TypeSpec) -> Self {
        Self { kind, ty }
    }
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Literal(Literal),
    /// Read a variable.
    Symbol(String),
    /// Reference a function, yielding a value that can be called.
    Function(FunctionId),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    /// Short-circuiting logic. Analysis lowers these to control flow, so they never
    /// reach the IR builder.
    Logic(LogicOp, Box<Expr>, Box<Expr>),
    Cast(CastOp, Box<Expr>),
    /// Read field `n` of an object.
    GetField(Box<Expr>, usize),
    /// Assign to a symbol, field or index expression.
    Assign(Box<Expr>, Box<Expr>),
    CompoundAssign(CompoundOp, Box<Expr>, Box<Expr>),
    Postfix(PostfixOp, Box<Expr>),
    /// `condition ? first : second`
    Ternary(Box<Expr>, Box<Expr>, Box<Expr>),
    /// Call a callee with a list of arguments.
    Call(Box<Expr>, Vec<Expr>),
    /// Construct an instance of a class, passing one value per field.
    New(ClassId, Vec<Expr>),
    /// Allocate an array of the given length.
    NewArray(Box<Expr>),
    /// Call a routine provided by the target runtime.
    Native(String, Vec<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Bool(bool),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    S8(i8),
    S16(i16),
    S32(i32),
    S64(i64),
    F32(f32),
    F64(f64),
    Str(String),
    Null,
}
impl Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Literal::Bool(b) => write!(f, "{}", b),
            Literal::U8(v) => write!(f, "{}", v),
            Literal::U16(v) => write!(f, "{}", v),
            Literal::U32(v) => write!(f, "{}", v),
            Literal::U64(v) => write!(f, "{}", v),
            Literal::S8(v) => write!(f, "{}", v),
            Literal::S16(v) => write!(f, "{}", v),
            Literal::S32(v) => write!(f, "{}", v),
            Literal::S64(v) => write!(f, "{}", v),
            Literal::F32(v) => write!(f, "{:?}", v),
            Literal::F64(v) => write!(f, "{:?}", v),
            Literal::Str(s) => write!(f, "string {:?}", s),
            Literal::Null => f.write_str("null"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    Not,
    BitwiseNot,
}
impl Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            UnaryOp::Negate => "negate",
            UnaryOp::Not => "not",
            UnaryOp::BitwiseNot => "bnot",
        })
    }
}

/// Binary operations with two fixed operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Compare(CompareOp),
    Numeric(NumericOp),
    Shift(ShiftOp),
    StrConcat,
    /// Reference equality.
    Identity,
    GetIndex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}
impl Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            CompareOp::Eq => "eq",
            CompareOp::Ne => "ne",
            CompareOp::Gt => "gt",
            CompareOp::Ge => "ge",
            CompareOp::Lt => "lt",
            CompareOp::Le => "le",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericOp {
    Add,
    BitAnd,
    BitOr,
    BitXor,
    Div,
    Mod,
    Mul,
    Sub,
}
impl Display for NumericOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            NumericOp::Add => "add",
            NumericOp::BitAnd => "and",
            NumericOp::BitOr => "or",
            NumericOp::BitXor => "xor",
            NumericOp::Div => "div",
            NumericOp::Mod => "rem",
            NumericOp::Mul => "mul",
            NumericOp::Sub => "sub",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftOp {
    Arithmetic,
    Left,
    Right,
}
impl Display for ShiftOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            ShiftOp::Arithmetic => "ashr",
            ShiftOp::Left => "shl",
            ShiftOp::Right => "lshr",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicOp {
    And,
    Or,
    Xor,
}
impl Display for LogicOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            LogicOp::And => "&&",
            LogicOp::Or => "||",
            LogicOp::Xor => "^^",
        })
    }
}

/// The operation performed by a compound assignment such as `+=` or `<<=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompoundOp {
    Numeric(NumericOp),
    Shift(ShiftOp),
    StrConcat,
}
impl From<CompoundOp> for BinaryOp {
    fn from(op: CompoundOp) -> Self {
        match op {
            CompoundOp::Numeric(num) => BinaryOp::Numeric(num),
            CompoundOp::Shift(shift) => BinaryOp::Shift(shift),
            CompoundOp::StrConcat => BinaryOp::StrConcat,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostfixOp {
    Increment,
    Decrement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastOp {
    Downcast,
    Upcast,
    FloatExtend,
    FloatTruncate,
    FloatToSigned,
    FloatToUnsigned,
    SignedToFloat,
    UnsignedToFloat,
    SignExtend,
    Truncate,
    ZeroExtend,
    Reinterpret,
}
impl Display for CastOp {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            CastOp::Downcast => "downcast",
            CastOp::Upcast => "upcast",
            CastOp::FloatExtend => "fpext",
            CastOp::FloatTruncate => "fptrunc",
            CastOp::FloatToSigned => "fptosi",
            CastOp::FloatToUnsigned => "fptoui",
            CastOp::SignedToFloat => "sitofp",
            CastOp::UnsignedToFloat => "uitofp",
            CastOp::SignExtend => "sext",
            CastOp::Truncate => "trunc",
            CastOp::ZeroExtend => "zext",
            CastOp::Reinterpret => "bitcast",
        })
    }
}
