use thiserror::Error;

use crate::{
    ast::{CastOp, ClassId, FunctionId, LogicOp},
    il::{BlockId, Register, StructId, Type},
    prelude::*,
};

/// Abort generation because an invariant of the builder or of its input was violated.
///
/// These errors cannot be caused by a program that passed analysis, so there is nothing
/// sensible left to produce. The error is logged and the process unwinds.
pub fn internal_error(error: InternalError) -> ! {
    let diagnostic = Diagnostic::Internal(error);
    error!("{}", diagnostic);
    panic!("{}", diagnostic);
}

/// A problem found while generating code for a program.
///
/// Everything except [`Diagnostic::Internal`] is a warning: generation continues and the
/// diagnostic is handed back to the caller.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum Diagnostic {
    #[error("possible loss of value in variable '{0}'")]
    LossOfValue(String),
    #[error("unreachable code")]
    UnreachableCode,
    #[error("loop condition is unreachable")]
    UnreachableLoopCondition,
    #[error("internal compiler error: {0}")]
    Internal(InternalError),
}
impl Diagnostic {
    pub fn is_warning(&self) -> bool {
        !matches!(self, Diagnostic::Internal(_))
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum InternalError {
    #[error("{1} does not have the same shape as {0}")]
    ShapeMismatch(BlockId, BlockId),
    #[error("edge from {from} passes ({found}) to a block accepting ({expected})")]
    EdgeMismatch {
        from: BlockId,
        expected: String,
        found: String,
    },
    #[error("{0} has no return slot")]
    MissingReturnSlot(BlockId),
    #[error("{0} has no register {1}")]
    NoSuchRegister(BlockId, Register),
    #[error("no such block: {0}")]
    NoSuchBlock(BlockId),
    #[error("no such struct: {0}")]
    NoSuchStruct(StructId),
    #[error("linear operation expects {expected} operand(s), found {found}")]
    LinearArity { expected: usize, found: usize },
    #[error("logic operator '{0}' must be lowered before generating code")]
    UnloweredLogic(LogicOp),
    #[error("unknown symbol '{0}'")]
    UnknownSymbol(String),
    #[error("symbol '{0}' is read before it is initialized")]
    UninitializedSymbol(String),
    #[error("symbol '{0}' is already defined")]
    DuplicateSymbol(String),
    #[error("operand stack of {0} is empty")]
    EmptyStack(BlockId),
    #[error("break or continue outside of a loop")]
    NoEnclosingLoop,
    #[error("no enclosing loop is labeled '{0}'")]
    UnknownLabel(String),
    #[error("function '{0}' does not return a value on every path")]
    MissingReturn(String),
    #[error("return outside of a function")]
    ReturnOutsideFunction,
    #[error("return value does not match the result type '{0}'")]
    ReturnMismatch(Type),
    #[error("expression cannot be assigned to")]
    InvalidAssignTarget,
    #[error("{0} is already terminated")]
    Terminated(BlockId),
    #[error("unsupported object cast '{0}'")]
    ObjectCast(CastOp),
    #[error("type '{0}' is not numeric")]
    NotNumeric(Type),
    #[error("unknown function {0:?}")]
    UnknownFunction(FunctionId),
    #[error("unknown class {0:?}")]
    UnknownClass(ClassId),
    #[error("constructor of '{class}' expects {expected} argument(s), found {found}")]
    ConstructorArity {
        class: String,
        expected: usize,
        found: usize,
    },
    #[error("cannot access a field of type '{0}'")]
    NotAnObject(Type),
    #[error("type '{0}' is not callable")]
    NotCallable(Type),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warnings_are_distinguished_from_internal_errors() {
        assert!(Diagnostic::LossOfValue("x".to_string()).is_warning());
        assert!(!Diagnostic::Internal(InternalError::NoEnclosingLoop).is_warning());
    }

    #[test]
    #[should_panic(expected = "internal compiler error: unknown symbol 'y'")]
    fn internal_errors_abort() {
        internal_error(InternalError::UnknownSymbol("y".to_string()));
    }
}
