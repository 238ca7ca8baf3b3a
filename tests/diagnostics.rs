use stackcc::{compile, generate_assembly};

fn diagnostic(source: &str) -> String {
  compile(source).unwrap_err().render(source)
}

#[test]
fn expected_expression() {
  assert_eq!(
    diagnostic("1+;"),
    "1+;\n  ^ expected an expression, but got \";\""
  );
}

#[test]
fn missing_semicolon_at_end_of_input() {
  assert_eq!(
    diagnostic("a = 1"),
    "a = 1\n     ^ expected \";\", but got \"EOF\""
  );
}

#[test]
fn invalid_token() {
  assert_eq!(diagnostic("a = 1 é 2;"), "a = 1 é 2;\n      ^ invalid token");
}

#[test]
fn not_an_lvalue() {
  assert_eq!(diagnostic("x = 1;\n 3 = x;"), " 3 = x;\n ^ not an lvalue");
}

#[test]
fn number_out_of_range() {
  assert_eq!(
    diagnostic("9223372036854775808;"),
    "9223372036854775808;\n^ invalid number: number too large to fit in target type"
  );
}

#[test]
fn listing_shape() {
  let text = generate_assembly("a=1; b=2; a+b;").unwrap();
  let lines: Vec<_> = text.lines().collect();
  assert_eq!(lines[..4], [".intel_syntax noprefix", ".globl main", "main:", "  push rbp"]);
  assert_eq!(lines[5], "  sub rsp, 16");
  assert_eq!(lines[lines.len() - 3..], ["  mov rsp, rbp", "  pop rbp", "  ret"]);
}
