use log::debug;

use super::parser::{Parse, Parser, Symbol};
use crate::error::{CompileError, CompileResult};
use crate::lexer::token::{Token, TokenKind};
use crate::types::types::{FundamentalType, Type};

pub type SyntaxTree = Vec<Statement>;

#[derive(Clone, Debug, PartialEq)]
pub enum Statement {
    Function(FunctionStatement),
    Variable(VariableDeclaration),
    Block(BlockStatement),
    If(IfStatement),
    While(WhileStatement),
    Return(ReturnStatement),
    Expression(Expression),
}

impl Parse for Statement {
    fn parse(parser: &mut Parser<'_>) -> CompileResult<Self> {
        match parser.current_token.kind {
            TokenKind::LSquirly => Ok(Self::Block(BlockStatement::parse(parser)?)),
            TokenKind::Let => Ok(Self::Variable(VariableDeclaration::parse(parser)?)),
            TokenKind::If => Ok(Self::If(IfStatement::parse(parser)?)),
            TokenKind::While => Ok(Self::While(WhileStatement::parse(parser)?)),
            TokenKind::Return => Ok(Self::Return(ReturnStatement::parse(parser)?)),

            _ => {
                let expr = Expression::parse(parser)?;

                if !parser.current_is(TokenKind::Semicolon) {
                    return Err(parser.error(format!(
                        "Expected a semicolon but got {} instead.",
                        parser.current_token.kind
                    )));
                }
                parser.bump()?;

                Ok(Self::Expression(expr))
            }
        }
    }
}

/// The sequence of top-level function declarations. Anything else at the
/// top level is skipped without a diagnostic.
#[derive(Clone, Debug, PartialEq)]
pub struct Program {
    pub statements: Vec<Statement>,
}

impl Parse for Program {
    fn parse(parser: &mut Parser<'_>) -> CompileResult<Self> {
        let mut statements: Vec<Statement> = vec![];

        while !parser.current_is(TokenKind::Eof) {
            if parser.current_is(TokenKind::Function) {
                let func = FunctionStatement::parse(parser)?;
                debug!("parsed function '{}'", func.name);
                statements.push(Statement::Function(func));
            } else {
                parser.bump()?;
            }
        }

        Ok(Self { statements })
    }
}

impl Parse for Type {
    fn parse(parser: &mut Parser<'_>) -> CompileResult<Self> {
        let Some(ty) = Type::from_token(&parser.current_token) else {
            return Err(parser.error(format!(
                "Unknown type '{}'.",
                parser.current_token.span.text
            )));
        };
        parser.bump()?;

        array_suffix(parser, ty)
    }
}

/// Parses the optional `[N]` after a type specifier.
fn array_suffix(parser: &mut Parser<'_>, mut ty: Type) -> CompileResult<Type> {
    if !parser.current_is(TokenKind::LBrack) {
        return Ok(ty);
    }
    parser.bump()?;

    if !parser.current_is(TokenKind::NumberLiteral) {
        return Err(parser.error(
            "Expected an array length specifier in the form of an integer literal.",
        ));
    }
    let length_token = parser.bump()?;
    ty.length = length_token.num as usize;

    if !parser.current_is(TokenKind::RBrack) {
        return Err(parser.error("Expected a closing square bracket."));
    }
    parser.bump()?;

    Ok(ty)
}

#[derive(Clone, Debug, PartialEq)]
pub struct FunctionStatement {
    pub name: String,
    pub params: FunctionParameterList,
    /// Void when the declaration carries no arrow specifier.
    pub return_type: Type,
    pub body: Box<Statement>,
    pub tokens: Vec<Token>,
}

impl Parse for FunctionStatement {
    fn parse(parser: &mut Parser<'_>) -> CompileResult<Self> {
        let fn_token = parser.bump()?;

        if !parser.current_is(TokenKind::Identifier) {
            return Err(parser.error(format!(
                "Expected an Identifier token but got an {} token.",
                parser.current_token.kind
            )));
        }
        let name_token = parser.bump()?;

        let params = FunctionParameterList::parse(parser)?;

        let mut return_type = Type::default();
        if parser.current_is(TokenKind::Minus) {
            parser.bump()?;
            if !parser.current_is(TokenKind::GreaterThan) {
                return Err(parser.error("Expected an arrow return type specifier."));
            }
            parser.bump()?;
            return_type = Type::parse(parser)?;
        }

        // The grammar allows any local statement as the body, so give a
        // bare statement a function-level scope to declare into.
        parser.push_scope();
        let body = Statement::parse(parser);
        parser.pop_scope();

        Ok(Self {
            name: name_token.span.text.clone(),
            params,
            return_type,
            body: Box::new(body?),
            tokens: vec![fn_token, name_token],
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FunctionParameter {
    pub name: String,
    pub ty: Type,
    pub tokens: Vec<Token>,
}

/// Parameters are recorded on the declaration but never enter a symbol
/// table, so a body reference to one fails name resolution.
#[derive(Clone, Debug, PartialEq)]
pub struct FunctionParameterList {
    pub params: Vec<FunctionParameter>,
    pub tokens: Vec<Token>,
}

impl Parse for FunctionParameterList {
    fn parse(parser: &mut Parser<'_>) -> CompileResult<Self> {
        if !parser.current_is(TokenKind::Lparen) {
            return Err(parser.error("Expected a parameter list."));
        }
        let open = parser.bump()?;

        let mut params: Vec<FunctionParameter> = vec![];
        loop {
            if parser.current_is(TokenKind::Rparen) {
                parser.bump()?;
                break;
            }
            if parser.current_is(TokenKind::Eof) {
                return Err(parser.error(
                    "Expected a closing brace after function parameter list declaration.",
                ));
            }
            if !parser.current_is(TokenKind::Identifier) {
                return Err(parser.error(format!(
                    "Expected an Identifier token but got an {} token.",
                    parser.current_token.kind
                )));
            }
            let name_token = parser.bump()?;

            if !parser.current_is(TokenKind::Colon) {
                return Err(parser.error("Expected a type specifier for the parameter."));
            }
            parser.bump()?;

            if Type::from_token(&parser.current_token).is_none() {
                return Err(parser.error("Expected a type specifier for the parameter."));
            }
            let ty = Type::parse(parser)?;

            params.push(FunctionParameter {
                name: name_token.span.text.clone(),
                ty,
                tokens: vec![name_token],
            });

            if parser.current_is(TokenKind::Comma) {
                parser.bump()?;
            }
        }

        Ok(Self {
            params,
            tokens: vec![open],
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct VariableDeclaration {
    pub name: String,
    pub ty: Type,
    pub init: Option<Initializer>,
    pub tokens: Vec<Token>,
}

impl Parse for VariableDeclaration {
    fn parse(parser: &mut Parser<'_>) -> CompileResult<Self> {
        let let_token = parser.bump()?;

        if !parser.current_is(TokenKind::Identifier) {
            return Err(parser.error(format!(
                "Expected an Identifier token but got an {} token.",
                parser.current_token.kind
            )));
        }
        let name_token = parser.bump()?;

        if !parser.current_is(TokenKind::Colon) {
            return Err(parser.error("Expected a colon type specifier."));
        }
        parser.bump()?;

        let ty = Type::parse(parser)?;

        let mut init = None;
        if parser.current_is(TokenKind::Assign) {
            parser.bump()?;
            let mut value = Expression::parse(parser)?;
            Self::check_initializer(&name_token, &ty, &mut value)?;
            init = Some(Initializer { value });
        }

        if !parser.current_is(TokenKind::Semicolon) {
            return Err(parser.error(format!(
                "Expected a semicolon but got {} instead.",
                parser.current_token.kind
            )));
        }
        parser.bump()?;

        parser.declare(Symbol {
            name: name_token.span.text.clone(),
            ty: ty.clone(),
            token: name_token.clone(),
        })?;

        Ok(Self {
            name: name_token.span.text.clone(),
            ty,
            init,
            tokens: vec![let_token, name_token],
        })
    }
}

impl VariableDeclaration {
    /// Initializer typing. Scalars must match the declared type
    /// structurally. Arrays take an initializer list of exactly `length`
    /// elements whose fundamental tags match the element type; integer
    /// literals are the one coercion (a number literal is Integer64 by
    /// inference but may initialize an i32 slot). The list and its
    /// literal elements are re-typed so the emitter sees the declared
    /// widths.
    fn check_initializer(
        name_token: &Token,
        declared: &Type,
        value: &mut Expression,
    ) -> CompileResult<()> {
        if !declared.is_array() {
            if value.ty() != declared {
                return Err(CompileError::at(
                    name_token,
                    format!(
                        "Type mismatch. Cannot perform implicit conversion from '{}' to '{}'.",
                        value.ty(),
                        declared
                    ),
                ));
            }
            return Ok(());
        }

        let Expression::InitializerList(list) = value else {
            return Err(CompileError::at(
                name_token,
                format!(
                    "Type mismatch. Cannot perform implicit conversion from '{}' to '{}'.",
                    value.ty(),
                    declared
                ),
            ));
        };

        if list.items.len() != declared.length {
            return Err(CompileError::at(
                name_token,
                format!(
                    "'{}' is an array of {} elements but is initialized with an initializer list of length {}.",
                    name_token.span.text,
                    declared.length,
                    list.items.len()
                ),
            ));
        }

        let element = declared.element();
        for item in &mut list.items {
            let item_ftype = item.ty().ftype;
            let integer_literal = matches!(item, Expression::Literal(_))
                && matches!(
                    item_ftype,
                    FundamentalType::Integer32 | FundamentalType::Integer64
                )
                && matches!(
                    element.ftype,
                    FundamentalType::Integer32 | FundamentalType::Integer64
                );

            if item_ftype != element.ftype && !integer_literal {
                return Err(CompileError::at(
                    name_token,
                    format!(
                        "Type mismatch. Cannot perform implicit conversion from '{}' to '{}'.",
                        item.ty(),
                        element
                    ),
                ));
            }

            if let Expression::Literal(lit) = item {
                lit.ty = element.clone();
            }
        }
        list.ty = declared.clone();

        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Initializer {
    pub value: Expression,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BlockStatement {
    pub statements: Vec<Statement>,
    pub tokens: Vec<Token>,
}

impl Parse for BlockStatement {
    fn parse(parser: &mut Parser<'_>) -> CompileResult<Self> {
        let open = parser.bump()?;

        // The scope must be released on the error path too.
        parser.push_scope();
        let statements = Self::parse_statements(parser);
        parser.pop_scope();

        Ok(Self {
            statements: statements?,
            tokens: vec![open],
        })
    }
}

impl BlockStatement {
    fn parse_statements(parser: &mut Parser<'_>) -> CompileResult<Vec<Statement>> {
        let mut statements: Vec<Statement> = vec![];

        while !parser.current_is(TokenKind::RSquirly) {
            if parser.current_is(TokenKind::Eof) {
                return Err(
                    parser.error("Expected a closing curly brace to end the block statement.")
                );
            }
            statements.push(Statement::parse(parser)?);
        }
        parser.bump()?;

        Ok(statements)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct IfStatement {
    pub condition: Expression,
    pub body: Box<Statement>,
    pub tokens: Vec<Token>,
}

impl Parse for IfStatement {
    fn parse(parser: &mut Parser<'_>) -> CompileResult<Self> {
        let if_token = parser.bump()?;

        let condition = Expression::parse(parser)?;
        if condition.ty() != &Type::boolean() {
            return Err(CompileError::at(
                &if_token,
                format!(
                    "Type mismatch. Cannot perform implicit conversion from '{}' to '{}'.",
                    condition.ty(),
                    Type::boolean()
                ),
            ));
        }

        let body = Box::new(Statement::parse(parser)?);

        Ok(Self {
            condition,
            body,
            tokens: vec![if_token],
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct WhileStatement {
    pub condition: Expression,
    pub body: Box<Statement>,
    pub tokens: Vec<Token>,
}

impl Parse for WhileStatement {
    fn parse(parser: &mut Parser<'_>) -> CompileResult<Self> {
        let while_token = parser.bump()?;

        let condition = Expression::parse(parser)?;
        if condition.ty() != &Type::boolean() {
            return Err(CompileError::at(
                &while_token,
                format!(
                    "Type mismatch. Cannot perform implicit conversion from '{}' to '{}'.",
                    condition.ty(),
                    Type::boolean()
                ),
            ));
        }

        let body = Box::new(Statement::parse(parser)?);

        Ok(Self {
            condition,
            body,
            tokens: vec![while_token],
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ReturnStatement {
    pub value: Option<Expression>,
    pub tokens: Vec<Token>,
}

impl Parse for ReturnStatement {
    fn parse(parser: &mut Parser<'_>) -> CompileResult<Self> {
        let return_token = parser.bump()?;

        let mut value = None;
        if !parser.current_is(TokenKind::Semicolon) {
            value = Some(Expression::parse(parser)?);
        }

        if !parser.current_is(TokenKind::Semicolon) {
            return Err(parser.error(format!(
                "Expected a semicolon but got {} instead.",
                parser.current_token.kind
            )));
        }
        parser.bump()?;

        Ok(Self {
            value,
            tokens: vec![return_token],
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Expression {
    Literal(LiteralExpression),
    Identifier(IdentifierName),
    Assignment(Box<AssignmentExpression>),
    InitializerList(InitializerList),
    Call(CallExpression),
    Comparison(Box<ComparisonExpression>),
}

impl Expression {
    pub fn ty(&self) -> &Type {
        match self {
            Expression::Literal(lit) => &lit.ty,
            Expression::Identifier(ident) => &ident.ty,
            Expression::Assignment(assign) => &assign.ty,
            Expression::InitializerList(list) => &list.ty,
            Expression::Call(call) => &call.ty,
            Expression::Comparison(cmp) => &cmp.ty,
        }
    }
}

impl Parse for Expression {
    // Alternatives are tried in a fixed order: literal, assignment,
    // initializer list, call, identifier. Assignment and call detection
    // use the one-token lookahead.
    fn parse(parser: &mut Parser<'_>) -> CompileResult<Self> {
        let left = match parser.current_token.kind {
            TokenKind::NumberLiteral
            | TokenKind::StringLiteral
            | TokenKind::CharacterLiteral
            | TokenKind::True
            | TokenKind::False => Self::Literal(LiteralExpression::parse(parser)?),

            TokenKind::LSquirly => Self::InitializerList(InitializerList::parse(parser)?),

            TokenKind::Identifier => {
                if parser.next_is(TokenKind::Assign) {
                    Self::Assignment(Box::new(AssignmentExpression::parse(parser)?))
                } else if parser.next_is(TokenKind::Lparen) {
                    Self::Call(CallExpression::parse(parser)?)
                } else {
                    Self::Identifier(IdentifierName::parse(parser)?)
                }
            }

            _ => return Err(parser.error("Invalid statement.")),
        };

        ComparisonExpression::maybe_extend(parser, left)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LiteralExpression {
    pub ty: Type,
    pub token: Token,
}

impl Parse for LiteralExpression {
    fn parse(parser: &mut Parser<'_>) -> CompileResult<Self> {
        let ty = match parser.current_token.kind {
            TokenKind::NumberLiteral => Type::integer64(),
            TokenKind::StringLiteral => Type::string(),
            TokenKind::CharacterLiteral => Type::character(),
            TokenKind::True | TokenKind::False => Type::boolean(),
            _ => return Err(parser.error("Invalid statement.")),
        };
        let token = parser.bump()?;

        Ok(Self { ty, token })
    }
}

/// A resolved reference. Construction walks the scope stack, so every
/// node of this kind carries the type its declaration gave it.
#[derive(Clone, Debug, PartialEq)]
pub struct IdentifierName {
    pub name: String,
    pub ty: Type,
    pub token: Token,
}

impl Parse for IdentifierName {
    fn parse(parser: &mut Parser<'_>) -> CompileResult<Self> {
        let name = parser.current_token.span.text.clone();

        let Some(symbol) = parser.resolve(&name) else {
            return Err(parser.error(format!(
                "The name '{}' does not exist in the current context.",
                name
            )));
        };
        let ty = symbol.ty.clone();

        let token = parser.bump()?;

        Ok(Self { name, ty, token })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AssignmentExpression {
    pub target: IdentifierName,
    pub value: Expression,
    pub ty: Type,
    pub tokens: Vec<Token>,
}

impl Parse for AssignmentExpression {
    fn parse(parser: &mut Parser<'_>) -> CompileResult<Self> {
        let target = IdentifierName::parse(parser)?;
        let assign_token = parser.bump()?;

        let value = Expression::parse(parser)?;
        if value.ty() != &target.ty {
            return Err(CompileError::at(
                &target.token,
                format!(
                    "Type mismatch. Cannot perform implicit conversion from '{}' to '{}'.",
                    value.ty(),
                    target.ty
                ),
            ));
        }

        let ty = target.ty.clone();
        Ok(Self {
            target,
            value,
            ty,
            tokens: vec![assign_token],
        })
    }
}

/// A brace-enclosed expression list. Its type is Void until the
/// enclosing declaration's checks stamp the declared array type on it.
#[derive(Clone, Debug, PartialEq)]
pub struct InitializerList {
    pub items: Vec<Expression>,
    pub ty: Type,
    pub tokens: Vec<Token>,
}

impl Parse for InitializerList {
    fn parse(parser: &mut Parser<'_>) -> CompileResult<Self> {
        let open = parser.bump()?;

        let mut items: Vec<Expression> = vec![];
        loop {
            if parser.current_is(TokenKind::RSquirly) {
                parser.bump()?;
                break;
            }
            if parser.current_is(TokenKind::Eof) {
                return Err(parser.error(
                    "Expected a closing curly brace to end the initializer list.",
                ));
            }

            items.push(Expression::parse(parser)?);

            if parser.current_is(TokenKind::Comma) {
                parser.bump()?;
            } else if !parser.current_is(TokenKind::RSquirly) {
                return Err(parser.error(
                    "Expected a closing curly brace to end the initializer list.",
                ));
            }
        }

        Ok(Self {
            items,
            ty: Type::default(),
            tokens: vec![open],
        })
    }
}

/// Calls parse but do not resolve: function names live in no symbol
/// table, and the emitter does not lower them yet.
#[derive(Clone, Debug, PartialEq)]
pub struct CallExpression {
    pub name: String,
    pub args: ArgumentList,
    pub ty: Type,
    pub tokens: Vec<Token>,
}

impl Parse for CallExpression {
    fn parse(parser: &mut Parser<'_>) -> CompileResult<Self> {
        let name_token = parser.bump()?;
        let args = ArgumentList::parse(parser)?;

        Ok(Self {
            name: name_token.span.text.clone(),
            args,
            ty: Type::default(),
            tokens: vec![name_token],
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ArgumentList {
    pub args: Vec<Expression>,
    pub tokens: Vec<Token>,
}

impl Parse for ArgumentList {
    fn parse(parser: &mut Parser<'_>) -> CompileResult<Self> {
        let open = parser.bump()?;

        let mut args: Vec<Expression> = vec![];
        loop {
            if parser.current_is(TokenKind::Rparen) {
                parser.bump()?;
                break;
            }
            if parser.current_is(TokenKind::Eof) {
                return Err(parser.error("Expected a closing brace after the argument list."));
            }

            args.push(Expression::parse(parser)?);

            if parser.current_is(TokenKind::Comma) {
                parser.bump()?;
            } else if !parser.current_is(TokenKind::Rparen) {
                return Err(parser.error("Expected a closing brace after the argument list."));
            }
        }

        Ok(Self {
            args,
            tokens: vec![open],
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComparisonOp {
    Equals,
    NotEquals,
    GreaterThan,
    LesserThan,
    GreaterThanOrEqual,
    LesserThanOrEqual,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ComparisonExpression {
    pub op: ComparisonOp,
    pub left: Expression,
    pub right: Expression,
    pub ty: Type,
    pub tokens: Vec<Token>,
}

impl ComparisonExpression {
    /// The two-byte operators arrive as two adjacent single-byte tokens.
    fn operator(parser: &Parser<'_>) -> Option<(ComparisonOp, usize)> {
        match (parser.current_token.kind, parser.next_token.kind) {
            (TokenKind::Assign, TokenKind::Assign) => Some((ComparisonOp::Equals, 2)),
            (TokenKind::Bang, TokenKind::Assign) => Some((ComparisonOp::NotEquals, 2)),
            (TokenKind::LessThan, TokenKind::Assign) => {
                Some((ComparisonOp::LesserThanOrEqual, 2))
            }
            (TokenKind::GreaterThan, TokenKind::Assign) => {
                Some((ComparisonOp::GreaterThanOrEqual, 2))
            }
            (TokenKind::LessThan, _) => Some((ComparisonOp::LesserThan, 1)),
            (TokenKind::GreaterThan, _) => Some((ComparisonOp::GreaterThan, 1)),
            _ => None,
        }
    }

    fn maybe_extend(parser: &mut Parser<'_>, left: Expression) -> CompileResult<Expression> {
        let Some((op, width)) = Self::operator(parser) else {
            return Ok(left);
        };

        let op_token = parser.bump()?;
        if width == 2 {
            parser.bump()?;
        }

        let right = Expression::parse(parser)?;
        if right.ty() != left.ty() {
            return Err(CompileError::at(
                &op_token,
                format!(
                    "Type mismatch. Cannot perform implicit conversion from '{}' to '{}'.",
                    right.ty(),
                    left.ty()
                ),
            ));
        }

        Ok(Expression::Comparison(Box::new(ComparisonExpression {
            op,
            left,
            right,
            ty: Type::boolean(),
            tokens: vec![op_token],
        })))
    }
}
