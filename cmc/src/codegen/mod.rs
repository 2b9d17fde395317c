pub mod codegen;
pub mod instruction;
