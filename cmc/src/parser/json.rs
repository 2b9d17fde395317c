//! JSON rendering of the typed syntax tree for the CLI's diagnostic
//! dump. Every node serializes as `{name, kind, children, type, tokens}`
//! with the statement-kind display names.

use serde_json::{json, Value};

use super::ast::{
    ComparisonOp, Expression, FunctionParameterList, IdentifierName, Program, Statement,
};
use crate::lexer::token::Token;
use crate::types::types::Type;

pub fn program(program: &Program) -> Value {
    Value::Array(program.statements.iter().map(statement).collect())
}

fn node(name: &str, kind: &str, children: Vec<Value>, ty: &Type, tokens: &[Token]) -> Value {
    json!({
        "name": name,
        "kind": kind,
        "children": children,
        "type": ty,
        "tokens": tokens,
    })
}

pub fn statement(stmt: &Statement) -> Value {
    match stmt {
        Statement::Function(func) => node(
            &func.name,
            "FunctionDeclaration",
            vec![parameter_list(&func.params), statement(&func.body)],
            &func.return_type,
            &func.tokens,
        ),

        Statement::Variable(var) => {
            let children = match &var.init {
                Some(init) => vec![node(
                    "",
                    "Initializer",
                    vec![expression(&init.value)],
                    init.value.ty(),
                    &[],
                )],
                None => vec![],
            };
            node(&var.name, "VariableDeclaration", children, &var.ty, &var.tokens)
        }

        Statement::Block(block) => node(
            "",
            "BlockStatement",
            block.statements.iter().map(statement).collect(),
            &Type::default(),
            &block.tokens,
        ),

        Statement::If(stmt) => node(
            "",
            "IfStatement",
            vec![expression(&stmt.condition), statement(&stmt.body)],
            &Type::default(),
            &stmt.tokens,
        ),

        Statement::While(stmt) => node(
            "",
            "WhileStatement",
            vec![expression(&stmt.condition), statement(&stmt.body)],
            &Type::default(),
            &stmt.tokens,
        ),

        Statement::Return(ret) => node(
            "",
            "ReturnStatement",
            ret.value.iter().map(expression).collect(),
            &Type::default(),
            &ret.tokens,
        ),

        Statement::Expression(expr) => expression(expr),
    }
}

fn parameter_list(params: &FunctionParameterList) -> Value {
    let children = params
        .params
        .iter()
        .map(|p| node(&p.name, "FunctionParameter", vec![], &p.ty, &p.tokens))
        .collect();
    node("", "FunctionParameterList", children, &Type::default(), &params.tokens)
}

fn identifier(ident: &IdentifierName) -> Value {
    node(
        &ident.name,
        "IdentifierName",
        vec![],
        &ident.ty,
        std::slice::from_ref(&ident.token),
    )
}

pub fn expression(expr: &Expression) -> Value {
    match expr {
        Expression::Literal(lit) => node(
            "",
            "LiteralExpression",
            vec![],
            &lit.ty,
            std::slice::from_ref(&lit.token),
        ),

        Expression::Identifier(ident) => identifier(ident),

        Expression::Assignment(assign) => node(
            "",
            "AssignmentExpression",
            vec![identifier(&assign.target), expression(&assign.value)],
            &assign.ty,
            &assign.tokens,
        ),

        Expression::InitializerList(list) => node(
            "",
            "InitializerList",
            list.items.iter().map(expression).collect(),
            &list.ty,
            &list.tokens,
        ),

        Expression::Call(call) => node(
            &call.name,
            "FunctionCallExpression",
            vec![node(
                "",
                "ArgumentListExpression",
                call.args.args.iter().map(expression).collect(),
                &Type::default(),
                &call.args.tokens,
            )],
            &call.ty,
            &call.tokens,
        ),

        Expression::Comparison(cmp) => node(
            "",
            comparison_kind(cmp.op),
            vec![expression(&cmp.left), expression(&cmp.right)],
            &cmp.ty,
            &cmp.tokens,
        ),
    }
}

fn comparison_kind(op: ComparisonOp) -> &'static str {
    match op {
        ComparisonOp::Equals => "Equals",
        ComparisonOp::NotEquals => "NotEquals",
        ComparisonOp::GreaterThan => "GreaterThan",
        ComparisonOp::LesserThan => "LesserThan",
        ComparisonOp::GreaterThanOrEqual => "GreaterThanOrEqual",
        ComparisonOp::LesserThanOrEqual => "LesserThanOrEqual",
    }
}

#[cfg(test)]
mod tests {
    use super::super::ast::Program;
    use super::super::parser::{Parse, Parser};
    use crate::lexer::lexer::Lexer;

    fn dump(src: &str) -> serde_json::Value {
        let mut lexer = Lexer::new(src.to_string());
        let mut parser = Parser::new(&mut lexer).unwrap();
        let program = Program::parse(&mut parser).unwrap();
        super::program(&program)
    }

    #[test]
    fn function_shape() {
        let v = dump("fn main() { let x: i64 = 42; }");

        assert_eq!(v[0]["kind"], "FunctionDeclaration");
        assert_eq!(v[0]["name"], "main");
        assert_eq!(v[0]["children"][0]["kind"], "FunctionParameterList");
        assert_eq!(v[0]["children"][1]["kind"], "BlockStatement");

        let var = &v[0]["children"][1]["children"][0];
        assert_eq!(var["kind"], "VariableDeclaration");
        assert_eq!(var["type"]["ftype"], "Integer64");
        assert_eq!(var["children"][0]["kind"], "Initializer");
        assert_eq!(var["children"][0]["children"][0]["kind"], "LiteralExpression");
        assert_eq!(var["children"][0]["children"][0]["tokens"][0]["num"], 42);
    }

    #[test]
    fn call_shape() {
        let v = dump("fn f() { g(1); }");

        let call = &v[0]["children"][1]["children"][0];
        assert_eq!(call["kind"], "FunctionCallExpression");
        assert_eq!(call["name"], "g");
        assert_eq!(call["children"][0]["kind"], "ArgumentListExpression");
        assert_eq!(call["children"][0]["children"][0]["kind"], "LiteralExpression");
    }
}
