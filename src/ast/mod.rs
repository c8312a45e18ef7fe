//! Analyzed Abstract Syntax Tree definitions.
//!
//! Every expression carries its resolved type, implicit casts are explicit [`CastOp`]
//! nodes, and logic operators have been lowered to control flow.
pub mod build;
mod expression;
mod statement;
mod type_spec;

pub use expression::*;
pub use statement::*;
pub use type_spec::*;
