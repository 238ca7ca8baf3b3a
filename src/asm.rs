//! Typed x86-64 instructions and their textual rendering.
//!
//! The code generator only ever builds [`Inst`] values; turning them into
//! text is a separate step so the same program can be printed in Intel or
//! AT&T syntax, or handed to [`crate::vm`] without going through an assembler.

use std::fmt;
use std::io;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reg {
  Rax,
  Rdi,
  Rdx,
  Rbp,
  Rsp,
}

impl Reg {
  fn name(self) -> &'static str {
    match self {
      Reg::Rax => "rax",
      Reg::Rdi => "rdi",
      Reg::Rdx => "rdx",
      Reg::Rbp => "rbp",
      Reg::Rsp => "rsp",
    }
  }
}

/// Condition codes for `set<cc>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cond {
  Eq,
  Ne,
  Lt,
  Le,
}

impl Cond {
  fn suffix(self) -> &'static str {
    match self {
      Cond::Eq => "e",
      Cond::Ne => "ne",
      Cond::Lt => "l",
      Cond::Le => "le",
    }
  }
}

/// Two-operand instructions follow Intel operand order: destination first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inst {
  Push(Reg),
  Pop(Reg),
  /// `dst = imm`
  MovImm(Reg, i64),
  /// `dst = src`
  Mov(Reg, Reg),
  /// `dst = base + disp`
  Lea { dst: Reg, base: Reg, disp: i64 },
  /// `dst = [addr]`
  Load { dst: Reg, addr: Reg },
  /// `[addr] = src`
  Store { addr: Reg, src: Reg },
  /// `dst -= imm`
  SubImm(Reg, i64),
  Add(Reg, Reg),
  Sub(Reg, Reg),
  Imul(Reg, Reg),
  /// Sign-extend `rax` into `rdx:rax`.
  Cqo,
  /// Signed divide `rdx:rax` by the operand; quotient in `rax`.
  Idiv(Reg),
  Neg(Reg),
  Cmp(Reg, Reg),
  /// Set `al` from the flags of the last `cmp`.
  Set(Cond),
  /// Zero-extend `al` into the operand.
  Movzb(Reg),
  Ret,
}

/// Assembler dialect used when printing a listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Syntax {
  #[default]
  Intel,
  Att,
}

impl Syntax {
  fn directive(self) -> &'static str {
    match self {
      Syntax::Intel => ".intel_syntax noprefix",
      Syntax::Att => ".att_syntax prefix",
    }
  }

  fn reg(self, reg: Reg) -> String {
    match self {
      Syntax::Intel => reg.name().to_string(),
      Syntax::Att => format!("%{}", reg.name()),
    }
  }

  fn al(self) -> &'static str {
    match self {
      Syntax::Intel => "al",
      Syntax::Att => "%al",
    }
  }

  fn imm(self, value: i64) -> String {
    match self {
      Syntax::Intel => value.to_string(),
      Syntax::Att => format!("${value}"),
    }
  }

  fn mem(self, base: Reg, disp: i64) -> String {
    match (self, disp) {
      (Syntax::Intel, 0) => format!("[{}]", base.name()),
      (Syntax::Intel, _) => format!("[{}{disp:+}]", base.name()),
      (Syntax::Att, 0) => format!("({})", self.reg(base)),
      (Syntax::Att, _) => format!("{disp}({})", self.reg(base)),
    }
  }

  /// `mnemonic dst, src` in Intel order, flipped for AT&T.
  fn two(self, mnemonic: &str, dst: &str, src: &str) -> String {
    match self {
      Syntax::Intel => format!("{mnemonic} {dst}, {src}"),
      Syntax::Att => format!("{mnemonic} {src}, {dst}"),
    }
  }

  pub fn render(self, inst: &Inst) -> String {
    match *inst {
      Inst::Push(reg) => format!("push {}", self.reg(reg)),
      Inst::Pop(reg) => format!("pop {}", self.reg(reg)),
      Inst::MovImm(dst, value) => self.two("mov", &self.reg(dst), &self.imm(value)),
      Inst::Mov(dst, src) => self.two("mov", &self.reg(dst), &self.reg(src)),
      Inst::Lea { dst, base, disp } => self.two("lea", &self.reg(dst), &self.mem(base, disp)),
      Inst::Load { dst, addr } => self.two("mov", &self.reg(dst), &self.mem(addr, 0)),
      Inst::Store { addr, src } => self.two("mov", &self.mem(addr, 0), &self.reg(src)),
      Inst::SubImm(dst, value) => self.two("sub", &self.reg(dst), &self.imm(value)),
      Inst::Add(dst, src) => self.two("add", &self.reg(dst), &self.reg(src)),
      Inst::Sub(dst, src) => self.two("sub", &self.reg(dst), &self.reg(src)),
      Inst::Imul(dst, src) => self.two("imul", &self.reg(dst), &self.reg(src)),
      Inst::Cqo => "cqo".to_string(),
      Inst::Idiv(reg) => format!("idiv {}", self.reg(reg)),
      Inst::Neg(reg) => format!("neg {}", self.reg(reg)),
      Inst::Cmp(lhs, rhs) => self.two("cmp", &self.reg(lhs), &self.reg(rhs)),
      Inst::Set(cond) => format!("set{} {}", cond.suffix(), self.al()),
      Inst::Movzb(dst) => self.two("movzb", &self.reg(dst), self.al()),
      Inst::Ret => "ret".to_string(),
    }
  }
}

/// Name of the single function every program compiles to.
pub const ENTRY: &str = "main";

/// The body of `main`, prologue and epilogue included.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assembly {
  pub insts: Vec<Inst>,
}

impl Assembly {
  pub fn listing(&self, syntax: Syntax) -> Listing<'_> {
    Listing {
      asm: self,
      syntax,
    }
  }

  /// Write the listing to `sink`, one line per directive, label or instruction.
  pub fn write_to(&self, syntax: Syntax, sink: &mut impl io::Write) -> io::Result<()> {
    write!(sink, "{}", self.listing(syntax))
  }
}

/// Displayable text form of an [`Assembly`].
pub struct Listing<'a> {
  asm: &'a Assembly,
  syntax: Syntax,
}

impl fmt::Display for Listing<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "{}", self.syntax.directive())?;
    writeln!(f, ".globl {ENTRY}")?;
    writeln!(f, "{ENTRY}:")?;
    for inst in &self.asm.insts {
      writeln!(f, "  {}", self.syntax.render(inst))?;
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn both(inst: Inst) -> (String, String) {
    (Syntax::Intel.render(&inst), Syntax::Att.render(&inst))
  }

  #[test]
  fn operand_order_flips_between_dialects() {
    assert_eq!(
      both(Inst::Mov(Reg::Rbp, Reg::Rsp)),
      ("mov rbp, rsp".to_string(), "mov %rsp, %rbp".to_string())
    );
    assert_eq!(
      both(Inst::MovImm(Reg::Rax, -3)),
      ("mov rax, -3".to_string(), "mov $-3, %rax".to_string())
    );
    assert_eq!(
      both(Inst::Cmp(Reg::Rax, Reg::Rdi)),
      ("cmp rax, rdi".to_string(), "cmp %rdi, %rax".to_string())
    );
  }

  #[test]
  fn memory_operands() {
    assert_eq!(
      both(Inst::Lea {
        dst: Reg::Rax,
        base: Reg::Rbp,
        disp: -16
      }),
      ("lea rax, [rbp-16]".to_string(), "lea -16(%rbp), %rax".to_string())
    );
    assert_eq!(
      both(Inst::Store {
        addr: Reg::Rdi,
        src: Reg::Rax
      }),
      ("mov [rdi], rax".to_string(), "mov %rax, (%rdi)".to_string())
    );
    assert_eq!(
      both(Inst::Load {
        dst: Reg::Rax,
        addr: Reg::Rax
      }),
      ("mov rax, [rax]".to_string(), "mov (%rax), %rax".to_string())
    );
  }

  #[test]
  fn comparison_materialisation() {
    assert_eq!(
      both(Inst::Set(Cond::Le)),
      ("setle al".to_string(), "setle %al".to_string())
    );
    assert_eq!(
      both(Inst::Movzb(Reg::Rax)),
      ("movzb rax, al".to_string(), "movzb %al, %rax".to_string())
    );
  }

  #[test]
  fn listing_header() {
    let asm = Assembly {
      insts: vec![Inst::Ret],
    };
    assert_eq!(
      asm.listing(Syntax::Att).to_string(),
      ".att_syntax prefix\n.globl main\nmain:\n  ret\n"
    );

    let mut sink = Vec::new();
    asm.write_to(Syntax::Intel, &mut sink).unwrap();
    assert_eq!(
      String::from_utf8(sink).unwrap(),
      ".intel_syntax noprefix\n.globl main\nmain:\n  ret\n"
    );
  }
}
