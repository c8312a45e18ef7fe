//! Intermediate code: a graph of parameterized blocks in continuation-passing style.

mod builder;
mod generator;
mod instruction;
mod layout;
mod optimiser;
mod system;
mod types;
mod verify;

pub use builder::Builder;
pub use generator::{generate, FunctionEntry, Generated};
pub use instruction::*;
pub use optimiser::optimise;
pub use system::*;
pub use types::*;
pub use verify::{verify, VerifyError};
