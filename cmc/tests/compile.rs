use cmc::codegen::instruction::OpCode;

#[test]
fn compiles_a_full_program() {
    let source = r#"
fn helper(n: i64) -> i64 {
    return 0;
}

fn main() {
    let answer: i64 = 42;
    let grid: i32[3] = { 1, 2, 3 };
    let greeting: string = "hi";
    let flag: bool = true;
    while flag {
        helper(1);
    }
}
"#;

    let code = cmc::compile(source).unwrap();

    assert_eq!(code.last().unwrap().opcode, OpCode::End);

    // Frames balance across both functions.
    let pushes = code.iter().filter(|i| i.opcode == OpCode::Push).count();
    let leaves = code.iter().filter(|i| i.opcode == OpCode::Leave).count();
    assert_eq!(pushes, leaves);
    assert_eq!(pushes, 2);

    // 1 scalar + 3 array elements + 2 string bytes + 1 boolean.
    let stores = code.iter().filter(|i| i.opcode == OpCode::Store).count();
    assert_eq!(stores, 7);
}

#[test]
fn empty_source_compiles_to_end() {
    let code = cmc::compile("").unwrap();
    assert_eq!(code.len(), 1);
    assert_eq!(code[0].opcode, OpCode::End);
}

#[test]
fn diagnostics_carry_the_template() {
    let err = cmc::compile("fn f() { let x: i64 = true; }").unwrap_err();
    let rendered = err.to_string();

    assert!(rendered.starts_with("Compile Error @ line (1, "));
    assert!(rendered.ends_with(
        "Type mismatch. Cannot perform implicit conversion from 'Boolean' to 'Integer64'."
    ));
}

#[test]
fn parse_exposes_the_typed_tree() {
    let program = cmc::parse("fn main() { }").unwrap();
    assert_eq!(program.statements.len(), 1);
}
