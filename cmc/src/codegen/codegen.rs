use std::collections::HashMap;

use log::debug;

use super::instruction::{Instruction, InstructionList, OpCode, Reg};
use crate::lexer::token::TokenKind;
use crate::parser::ast::{
    BlockStatement, Expression, FunctionStatement, Initializer, InitializerList,
    LiteralExpression, Statement, SyntaxTree, VariableDeclaration,
};
use crate::types::types::FundamentalType;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SymbolKind {
    #[default]
    None,
    Variable,
    Function,
}

/// A frame slot: its byte size and its offset from BP.
#[derive(Clone, Debug)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub size: usize,
    pub address: i32,
}

/// One block's frame layout. `offset` is the next free byte from BP.
#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: HashMap<String, Symbol>,
    offset: i32,
}

impl SymbolTable {
    pub fn offset(&self) -> i32 {
        self.offset
    }

    pub fn advance(&mut self, bytes: usize) {
        self.offset += bytes as i32;
    }

    pub fn restore(&mut self, offset: i32) {
        self.offset = offset;
    }

    /// Assigns the symbol the current offset and reserves its span.
    pub fn add_symbol(&mut self, mut symbol: Symbol) {
        symbol.address = self.offset;
        self.offset += symbol.size as i32;
        self.symbols.insert(symbol.name.clone(), symbol);
    }

    pub fn contains_symbol(&self, name: &str) -> bool {
        self.symbols.contains_key(name)
    }

    pub fn get_symbol(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }
}

pub trait Emit {
    fn emit(&self, ctx: &mut Context) -> InstructionList;
}

/// Codegen context: the tree to lower and the stack of frame tables.
pub struct Context {
    ast: SyntaxTree,
    tables: Vec<SymbolTable>,
}

impl Context {
    pub fn new(tree: SyntaxTree) -> Self {
        Self {
            ast: tree,
            tables: vec![],
        }
    }

    /// Lowers every function declaration in the tree. The returned list
    /// is always terminated by `End`; an empty tree yields just that.
    pub fn compile(&mut self) -> InstructionList {
        let tree = self.ast.clone();

        let mut code: InstructionList = vec![];
        for stmt in &tree {
            if let Statement::Function(func) = stmt {
                code.extend(func.emit(self));
            }
        }

        code.push(Instruction {
            opcode: OpCode::End,
            ..Default::default()
        });
        code
    }

    fn table(&mut self) -> &mut SymbolTable {
        self.tables
            .last_mut()
            .expect("emission always runs inside a block frame")
    }
}

impl Emit for FunctionStatement {
    fn emit(&self, ctx: &mut Context) -> InstructionList {
        debug!("compiling function '{}'", self.name);

        match self.body.as_ref() {
            Statement::Block(block) => block.emit(ctx),
            _ => vec![],
        }
    }
}

impl Emit for BlockStatement {
    fn emit(&self, ctx: &mut Context) -> InstructionList {
        ctx.tables.push(SymbolTable::default());

        let mut result = vec![
            Instruction {
                opcode: OpCode::Push,
                sreg: Reg::Bp,
                ..Default::default()
            },
            Instruction {
                opcode: OpCode::Mov,
                sreg: Reg::Sp,
                dreg: Reg::Bp,
                ..Default::default()
            },
        ];

        for stmt in &self.statements {
            match stmt {
                Statement::Variable(var) => result.extend(var.emit(ctx)),
                Statement::Block(block) => result.extend(block.emit(ctx)),
                // Everything else has no lowering yet.
                _ => {}
            }
        }

        ctx.tables.pop();
        result.push(Instruction {
            opcode: OpCode::Leave,
            ..Default::default()
        });

        result
    }
}

impl Emit for VariableDeclaration {
    fn emit(&self, ctx: &mut Context) -> InstructionList {
        let size = self.ty.byte_size();
        let symbol = Symbol {
            name: self.name.clone(),
            kind: SymbolKind::Variable,
            size,
            address: 0,
        };

        match &self.init {
            // The initializer writes at the pre-advance offset; adding
            // the symbol afterwards reserves the span.
            Some(init) => {
                let result = init.emit(ctx);
                ctx.table().add_symbol(symbol);
                result
            }

            None => match self.ty.ftype {
                FundamentalType::Boolean
                | FundamentalType::Character
                | FundamentalType::Integer32
                | FundamentalType::Integer64 => {
                    let store = Instruction {
                        opcode: OpCode::Store,
                        sreg: Reg::Bp,
                        disp: ctx.table().offset(),
                        size: self.ty.size / 8,
                        ..Default::default()
                    };
                    ctx.table().add_symbol(symbol);
                    vec![store]
                }

                // An uninitialized string reserves its slot but stores
                // nothing.
                FundamentalType::String => {
                    ctx.table().add_symbol(symbol);
                    vec![]
                }

                _ => vec![],
            },
        }
    }
}

impl Emit for Initializer {
    fn emit(&self, ctx: &mut Context) -> InstructionList {
        match &self.value {
            Expression::Literal(lit) => lit.emit(ctx),
            Expression::InitializerList(list) => list.emit(ctx),
            _ => vec![],
        }
    }
}

impl Emit for Expression {
    fn emit(&self, ctx: &mut Context) -> InstructionList {
        match self {
            Expression::Literal(lit) => lit.emit(ctx),
            // Calls, references and the comparison forms have no
            // lowering yet.
            _ => vec![],
        }
    }
}

impl Emit for LiteralExpression {
    fn emit(&self, ctx: &mut Context) -> InstructionList {
        match self.ty.ftype {
            FundamentalType::Boolean
            | FundamentalType::Character
            | FundamentalType::Integer32
            | FundamentalType::Integer64 => {
                let imm64 = match self.token.kind {
                    TokenKind::True => 1,
                    TokenKind::False => 0,
                    _ => self.token.num as u64,
                };

                vec![Instruction {
                    opcode: OpCode::Store,
                    imm64,
                    sreg: Reg::Bp,
                    disp: ctx.table().offset(),
                    size: self.ty.size / 8,
                    ..Default::default()
                }]
            }

            // One store per lexeme byte through a local cursor; the
            // table offset is left for the declaration to reserve.
            FundamentalType::String => {
                let mut offset = ctx.table().offset();
                let mut result: InstructionList = vec![];

                for byte in self.token.span.text.bytes() {
                    result.push(Instruction {
                        opcode: OpCode::Store,
                        imm64: u64::from(byte),
                        sreg: Reg::Bp,
                        disp: offset,
                        size: 1,
                        ..Default::default()
                    });
                    offset += 1;
                }

                result
            }

            _ => vec![],
        }
    }
}

impl Emit for InitializerList {
    fn emit(&self, ctx: &mut Context) -> InstructionList {
        let prev_offset = ctx.table().offset();

        let mut result: InstructionList = vec![];
        for item in &self.items {
            result.extend(item.emit(ctx));
            let step = item.ty().byte_size();
            ctx.table().advance(step);
        }

        ctx.table().restore(prev_offset);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lexer::Lexer;
    use crate::parser::ast::Program;
    use crate::parser::parser::{Parse, Parser};

    fn compile_src(src: &str) -> InstructionList {
        let mut lexer = Lexer::new(src.to_string());
        let mut parser = Parser::new(&mut lexer).unwrap();
        let program = Program::parse(&mut parser).unwrap();
        Context::new(program.statements).compile()
    }

    fn bare(opcode: OpCode) -> Instruction {
        Instruction {
            opcode,
            ..Default::default()
        }
    }

    fn prologue() -> Vec<Instruction> {
        vec![
            Instruction {
                opcode: OpCode::Push,
                sreg: Reg::Bp,
                ..Default::default()
            },
            Instruction {
                opcode: OpCode::Mov,
                sreg: Reg::Sp,
                dreg: Reg::Bp,
                ..Default::default()
            },
        ]
    }

    fn store(imm64: u64, disp: i32, size: u8) -> Instruction {
        Instruction {
            opcode: OpCode::Store,
            sreg: Reg::Bp,
            imm64,
            disp,
            size,
            ..Default::default()
        }
    }

    #[test]
    fn empty_source() {
        assert_eq!(compile_src(""), vec![bare(OpCode::End)]);
    }

    #[test]
    fn empty_function_frame() {
        let mut expected = prologue();
        expected.push(bare(OpCode::Leave));
        expected.push(bare(OpCode::End));

        assert_eq!(compile_src("fn main() { }"), expected);
    }

    #[test]
    fn scalar_initializer() {
        let mut expected = prologue();
        expected.push(store(42, 0, 8));
        expected.push(bare(OpCode::Leave));
        expected.push(bare(OpCode::End));

        assert_eq!(compile_src("fn f() { let x: i64 = 42; }"), expected);
    }

    #[test]
    fn array_initializer_list() {
        let mut expected = prologue();
        expected.push(store(1, 0, 4));
        expected.push(store(2, 4, 4));
        expected.push(store(3, 8, 4));
        expected.push(bare(OpCode::Leave));
        expected.push(bare(OpCode::End));

        assert_eq!(
            compile_src("fn f() { let a: i32[3] = { 1, 2, 3 }; }"),
            expected
        );
    }

    #[test]
    fn string_initializer_stores_per_byte() {
        let mut expected = prologue();
        expected.push(store(u64::from(b'h'), 0, 1));
        expected.push(store(u64::from(b'i'), 1, 1));
        expected.push(bare(OpCode::Leave));
        expected.push(bare(OpCode::End));

        assert_eq!(compile_src("fn f() { let s: string = \"hi\"; }"), expected);
    }

    #[test]
    fn uninitialized_variable_reserves_its_slot() {
        // The zero store is elem-width; the next declaration lands past
        // the reserved span.
        let mut expected = prologue();
        expected.push(store(0, 0, 4));
        expected.push(store(7, 4, 8));
        expected.push(bare(OpCode::Leave));
        expected.push(bare(OpCode::End));

        assert_eq!(
            compile_src("fn f() { let x: i32; let y: i64 = 7; }"),
            expected
        );
    }

    #[test]
    fn uninitialized_string_emits_nothing() {
        let mut expected = prologue();
        expected.push(bare(OpCode::Leave));
        expected.push(bare(OpCode::End));

        assert_eq!(compile_src("fn f() { let s: string; }"), expected);
    }

    #[test]
    fn boolean_literals() {
        let mut expected = prologue();
        expected.push(store(1, 0, 1));
        expected.push(store(0, 1, 1));
        expected.push(bare(OpCode::Leave));
        expected.push(bare(OpCode::End));

        assert_eq!(
            compile_src("fn f() { let a: bool = true; let b: bool = false; }"),
            expected
        );
    }

    #[test]
    fn character_literal() {
        let mut expected = prologue();
        expected.push(store(u64::from(b'x'), 0, 1));
        expected.push(bare(OpCode::Leave));
        expected.push(bare(OpCode::End));

        assert_eq!(compile_src("fn f() { let c: char = 'x'; }"), expected);
    }

    #[test]
    fn variables_stack_up_in_declaration_order() {
        let code = compile_src("fn f() { let a: i64 = 1; let b: i64 = 2; let c: i32; }");

        let stores: Vec<&Instruction> = code
            .iter()
            .filter(|i| i.opcode == OpCode::Store)
            .collect();
        assert_eq!(stores.len(), 3);
        assert_eq!((stores[0].disp, stores[0].size), (0, 8));
        assert_eq!((stores[1].disp, stores[1].size), (8, 8));
        assert_eq!((stores[2].disp, stores[2].size), (16, 4));
    }

    #[test]
    fn nested_blocks_balance_their_frames() {
        let code = compile_src("fn f() { { let x: i64 = 1; } { } }");

        let mut depth = 0i32;
        for ins in &code {
            match ins.opcode {
                OpCode::Push => depth += 1,
                OpCode::Leave => {
                    depth -= 1;
                    assert!(depth >= 0);
                }
                _ => {}
            }
        }
        assert_eq!(depth, 0);
        assert_eq!(
            code.iter().filter(|i| i.opcode == OpCode::Push).count(),
            3
        );
    }

    #[test]
    fn inner_blocks_get_fresh_frames() {
        let code = compile_src("fn f() { let a: i64 = 1; { let b: i64 = 2; } }");

        let stores: Vec<&Instruction> = code
            .iter()
            .filter(|i| i.opcode == OpCode::Store)
            .collect();
        // Both land at displacement 0 of their own frame.
        assert_eq!(stores[0].disp, 0);
        assert_eq!(stores[1].disp, 0);
    }

    #[test]
    fn multiple_functions_in_order() {
        let code = compile_src("fn a() { } fn b() { }");

        let pushes = code.iter().filter(|i| i.opcode == OpCode::Push).count();
        let leaves = code.iter().filter(|i| i.opcode == OpCode::Leave).count();
        assert_eq!(pushes, 2);
        assert_eq!(leaves, 2);
        assert_eq!(code.last().unwrap().opcode, OpCode::End);
    }

    #[test]
    fn statements_without_lowering_are_skipped() {
        let mut expected = prologue();
        expected.push(bare(OpCode::Leave));
        expected.push(bare(OpCode::End));

        assert_eq!(
            compile_src("fn f() { g(1, 2); return; if true { } }"),
            expected
        );
    }

    #[test]
    fn emission_is_deterministic() {
        let src = "fn f() { let a: i32[2] = { 1, 2 }; let s: string = \"ok\"; }";
        assert_eq!(compile_src(src), compile_src(src));
    }
}
