//! Crate root: wires together the compilation pipeline.
//!
//! - `tokenizer` performs lexical analysis and produces a flat token stream.
//! - `parser` owns all syntactic knowledge and returns a function AST with locals.
//! - `codegen` lays out the stack frame and lowers the function to instructions.
//! - `asm` models those instructions and prints them in Intel or AT&T syntax.
//! - `vm` executes the instructions directly, mostly for testing.
//! - `error` centralises the diagnostics shared by the other modules.

pub mod asm;
pub mod codegen;
pub mod error;
pub mod parser;
pub mod tokenizer;
pub mod vm;

pub use asm::{Assembly, Syntax};
pub use error::{CompileError, CompileResult};

/// Compile a source string into the instructions of `main`.
pub fn compile(source: &str) -> CompileResult<Assembly> {
  let tokens = tokenizer::tokenize(source)?;
  let mut program = parser::parse(tokens, source)?;
  codegen::generate(&mut program)
}

/// Compile a source string into Intel-syntax assembly text.
pub fn generate_assembly(source: &str) -> CompileResult<String> {
  Ok(compile(source)?.listing(Syntax::Intel).to_string())
}
