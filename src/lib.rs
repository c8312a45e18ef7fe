pub mod ast;
pub mod commandline;
pub mod demos;
pub mod error;
pub mod ext;
pub mod il;
pub mod listing;
pub mod prelude;
