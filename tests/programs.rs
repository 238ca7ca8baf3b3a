//! End-to-end: compile programs and execute them on the reference VM.

use stackcc::{CompileError, compile, vm};

fn eval(source: &str) -> i64 {
  let asm = compile(source).unwrap_or_else(|err| panic!("{}", err.render(source)));
  vm::run(&asm).unwrap_or_else(|err| panic!("{source:?}: {err}"))
}

fn assert_eval(expected: i64, source: &str) {
  assert_eq!(eval(source), expected, "{source:?}");
}

#[test]
fn literals() {
  for value in [0, 1, 42, 255, 65536, i64::MAX] {
    assert_eval(value, &format!("{value};"));
  }
}

#[test]
fn arithmetic() {
  assert_eval(21, "5+20-4;");
  assert_eval(41, " 12 + 34 - 5 ;");
  assert_eval(47, "5+6*7;");
  assert_eval(7, "1+2*3;");
  assert_eval(9, "(1+2)*3;");
  assert_eval(15, "5*(9-6);");
  assert_eval(4, "(3+5)/2;");
  assert_eval(-3, "-7/2;");
}

#[test]
fn unary_sign() {
  assert_eval(10, "-10+20;");
  assert_eval(10, "- -10;");
  assert_eval(10, "- - +10;");
  assert_eval(-5, "-(2+3);");
}

#[test]
fn comparisons() {
  assert_eval(0, "0==1;");
  assert_eval(1, "42==42;");
  assert_eval(1, "0!=1;");
  assert_eval(0, "42!=42;");

  assert_eval(1, "0<1;");
  assert_eval(0, "1<1;");
  assert_eval(0, "2<1;");
  assert_eval(1, "0<=1;");
  assert_eval(1, "1<=1;");
  assert_eval(0, "2<=1;");

  assert_eval(1, "1>0;");
  assert_eval(0, "1>1;");
  assert_eval(0, "1>2;");
  assert_eval(1, "1>=0;");
  assert_eval(1, "1>=1;");
  assert_eval(0, "1>=2;");

  assert_eval(1, "-1<0;");
  assert_eval(1, "1<2==1;");
}

#[test]
fn swapped_comparisons_compile_identically() {
  assert_eq!(compile("1>2;").unwrap(), compile("2<1;").unwrap());
  assert_eval(0, "1>2;");
  assert_eval(0, "2<1;");
}

#[test]
fn variables() {
  assert_eval(3, "a=3; a;");
  assert_eval(8, "a=3; z=5; a+z;");
  assert_eval(6, "a=b=3; a+b;");
  assert_eval(3, "foo=3; foo;");
  assert_eval(8, "foo123=3; bar=5; foo123+bar;");
  assert_eval(7, "_x=7; _x;");
}

#[test]
fn chained_assignment_sets_every_target() {
  assert_eval(3, "a=b=3; a;");
  assert_eval(3, "a=b=3; b;");
  assert_eval(3, "a=b=3;");
}

#[test]
fn statement_results_are_discarded() {
  assert_eval(3, "a=1; b=2; a+b;");
  assert_eval(5, "1; 2; 3; 4; 5;");
}

#[test]
fn vertical_tab_separates_statements() {
  assert_eval(2, "1;\x0B2;");
}

#[test]
fn reassignment_overwrites_the_slot() {
  assert_eval(10, "a=1; a=a+9; a;");
  assert_eval(2, "x=1; y=x; x=2; y+x-1;");
}

#[test]
fn many_locals_do_not_overlap() {
  let mut source: String = (0..30).map(|i| format!("v{i}={i};")).collect();
  source.push_str(&(0..30).map(|i| format!("v{i}")).collect::<Vec<_>>().join("+"));
  source.push(';');
  assert_eval((0..30).sum(), &source);
}

#[test]
fn division_by_zero_is_a_runtime_fault() {
  let asm = compile("1/0;").unwrap();
  assert_eq!(vm::run(&asm), Err(vm::VmError::DivideError));
}

#[test]
fn errors_stop_compilation() {
  assert!(matches!(
    compile("1+;"),
    Err(CompileError::ExpectedExpression { loc: 2, .. })
  ));
  assert!(matches!(
    compile("a=1"),
    Err(CompileError::ExpectedToken { expected: ";", .. })
  ));
  assert!(matches!(
    compile("1 $ 2;"),
    Err(CompileError::ExpectedToken { expected: ";", loc: 2, .. })
  ));
  assert!(matches!(
    compile("1 ~ 2;"),
    Err(CompileError::ExpectedToken { loc: 2, .. })
  ));
  assert!(matches!(
    compile("1 + é;"),
    Err(CompileError::InvalidToken { loc: 4 })
  ));
  assert!(matches!(
    compile("a+1=2;"),
    Err(CompileError::NotAnLvalue { loc: 0 })
  ));
}
