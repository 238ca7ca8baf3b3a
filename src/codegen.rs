//! Code generation: lower the parsed AST into x86-64 instructions.
//!
//! Every expression leaves its value in `rax`. Binary operators spill the
//! right operand to the machine stack while the left one is computed, then
//! pop it back into `rdi`. Locals live in the frame below `rbp`.

use tracing::{debug, trace};

use crate::asm::{Assembly, Cond, Inst, Reg};
use crate::error::{CompileResult, NotAnLvalueSnafu};
use crate::parser::{AstNode, BinaryOp, Function, Stmt};

/// Every local occupies one machine word.
const WORD_SIZE: usize = 8;
/// The frame is rounded up to this so `rsp` stays ABI-aligned.
const STACK_ALIGN: usize = 16;

/// Round `n` up to the nearest multiple of `align`.
pub fn align_to(n: usize, align: usize) -> usize {
  n.div_ceil(align) * align
}

/// Give every local its own stack slot and size the frame.
pub fn assign_lvar_offsets(func: &mut Function) {
  let mut offset = 0;
  for obj in &mut func.locals {
    offset += WORD_SIZE;
    obj.offset = offset;
    trace!(name = %obj.name, offset, "assigned stack slot");
  }
  func.stack_size = align_to(offset, STACK_ALIGN);
  debug!(
    locals = func.locals.len(),
    stack_size = func.stack_size,
    "laid out frame"
  );
}

/// Lay out the frame, then emit the whole of `main`.
pub fn generate(func: &mut Function) -> CompileResult<Assembly> {
  assign_lvar_offsets(func);

  let mut emitter = CodeGen::new(func);
  emitter.prologue();
  for stmt in &func.body {
    emitter.emit_stmt(stmt)?;
  }
  emitter.epilogue();

  debug!(instructions = emitter.insts.len(), "emitted assembly");
  Ok(Assembly { insts: emitter.insts })
}

struct CodeGen<'a> {
  func: &'a Function,
  insts: Vec<Inst>,
  /// Values currently spilled to the stack by this emitter.
  depth: usize,
}

impl<'a> CodeGen<'a> {
  fn new(func: &'a Function) -> Self {
    Self {
      func,
      insts: Vec::new(),
      depth: 0,
    }
  }

  fn emit(&mut self, inst: Inst) {
    self.insts.push(inst);
  }

  fn push(&mut self) {
    self.emit(Inst::Push(Reg::Rax));
    self.depth += 1;
  }

  fn pop(&mut self, reg: Reg) {
    self.emit(Inst::Pop(reg));
    self.depth -= 1;
  }

  fn prologue(&mut self) {
    self.emit(Inst::Push(Reg::Rbp));
    self.emit(Inst::Mov(Reg::Rbp, Reg::Rsp));
    if self.func.stack_size > 0 {
      self.emit(Inst::SubImm(Reg::Rsp, self.func.stack_size as i64));
    }
  }

  fn epilogue(&mut self) {
    self.emit(Inst::Mov(Reg::Rsp, Reg::Rbp));
    self.emit(Inst::Pop(Reg::Rbp));
    self.emit(Inst::Ret);
  }

  fn emit_stmt(&mut self, stmt: &Stmt) -> CompileResult<()> {
    match stmt {
      Stmt::Expr(expr) => self.emit_expr(expr)?,
    }
    debug_assert_eq!(self.depth, 0, "unbalanced stack after statement");
    Ok(())
  }

  fn emit_var_addr(&mut self, obj: usize) {
    let offset = self.func.locals[obj].offset as i64;
    self.emit(Inst::Lea {
      dst: Reg::Rax,
      base: Reg::Rbp,
      disp: -offset,
    });
  }

  /// Load the address of an assignment target into `rax`.
  fn emit_addr(&mut self, node: &AstNode, loc: usize) -> CompileResult<()> {
    match node {
      AstNode::Var { obj } => {
        self.emit_var_addr(*obj);
        Ok(())
      }
      _ => NotAnLvalueSnafu { loc }.fail(),
    }
  }

  fn emit_expr(&mut self, node: &AstNode) -> CompileResult<()> {
    match node {
      AstNode::Num { value } => self.emit(Inst::MovImm(Reg::Rax, *value)),
      AstNode::Neg { operand } => {
        self.emit_expr(operand)?;
        self.emit(Inst::Neg(Reg::Rax));
      }
      AstNode::Var { obj } => {
        self.emit_var_addr(*obj);
        self.emit(Inst::Load {
          dst: Reg::Rax,
          addr: Reg::Rax,
        });
      }
      AstNode::Assign { lhs, rhs, loc } => {
        self.emit_addr(lhs, *loc)?;
        self.push();
        self.emit_expr(rhs)?;
        self.pop(Reg::Rdi);
        self.emit(Inst::Store {
          addr: Reg::Rdi,
          src: Reg::Rax,
        });
      }
      AstNode::Binary { op, lhs, rhs } => {
        self.emit_expr(rhs)?;
        self.push();
        self.emit_expr(lhs)?;
        self.pop(Reg::Rdi);
        self.emit_binary(*op);
      }
    }
    Ok(())
  }

  /// Apply `op` to `rax` (left) and `rdi` (right), result in `rax`.
  fn emit_binary(&mut self, op: BinaryOp) {
    let cond = match op {
      BinaryOp::Add => return self.emit(Inst::Add(Reg::Rax, Reg::Rdi)),
      BinaryOp::Sub => return self.emit(Inst::Sub(Reg::Rax, Reg::Rdi)),
      BinaryOp::Mul => return self.emit(Inst::Imul(Reg::Rax, Reg::Rdi)),
      BinaryOp::Div => {
        self.emit(Inst::Cqo);
        self.emit(Inst::Idiv(Reg::Rdi));
        return;
      }
      BinaryOp::Eq => Cond::Eq,
      BinaryOp::Ne => Cond::Ne,
      BinaryOp::Lt => Cond::Lt,
      BinaryOp::Le => Cond::Le,
    };
    self.emit(Inst::Cmp(Reg::Rax, Reg::Rdi));
    self.emit(Inst::Set(cond));
    self.emit(Inst::Movzb(Reg::Rax));
  }
}
