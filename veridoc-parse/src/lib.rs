#![forbid(unsafe_code)]

mod error;
mod parser;
mod path;

pub use error::ParseFailure;
pub use parser::{compile, Compiled, Parser};
pub use path::{compile_path, repair_parens};
