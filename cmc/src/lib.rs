pub mod codegen;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod types;

use codegen::codegen::Context;
use codegen::instruction::InstructionList;
use error::CompileResult;
use lexer::lexer::Lexer;
use parser::ast::Program;
use parser::parser::{Parse, Parser};

/// Runs the lexer and parser over a source string.
pub fn parse(source: &str) -> CompileResult<Program> {
    let mut lexer = Lexer::new(source.to_string());
    let mut parser = Parser::new(&mut lexer)?;
    Program::parse(&mut parser)
}

/// Runs the whole front-end: source text to VM instruction list.
pub fn compile(source: &str) -> CompileResult<InstructionList> {
    let program = parse(source)?;
    let mut ctx = Context::new(program.statements);
    Ok(ctx.compile())
}
