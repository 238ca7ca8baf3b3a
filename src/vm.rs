//! A tiny interpreter for the instructions the code generator emits.
//!
//! It models just enough of x86-64 to run `main`: five registers, the flags
//! of the last `cmp`, and a downward-growing stack of 8-byte words. Execution
//! starts as if `main` had just been called and stops when it returns.

use snafu::Snafu;
use tracing::trace;

use crate::asm::{Assembly, Cond, Inst, Reg};

/// Size of the simulated stack in words.
pub const STACK_WORDS: usize = 1 << 16;
/// Return address pushed before `main` runs; returning to it halts the machine.
const HALT_ADDR: i64 = -1;

#[derive(Debug, Snafu, PartialEq, Eq)]
pub enum VmError {
  #[snafu(display("stack pointer {rsp:#x} left the stack"))]
  StackOverflow { rsp: i64 },

  #[snafu(display("bad memory access at {addr:#x}"))]
  BadAddress { addr: i64 },

  #[snafu(display("divide error"))]
  DivideError,

  #[snafu(display("returned to unknown address {addr:#x}"))]
  BadReturn { addr: i64 },

  #[snafu(display("ran past the end of main without returning"))]
  NoReturn,
}

/// Run `main` and return the final value of `rax`.
pub fn run(asm: &Assembly) -> Result<i64, VmError> {
  let mut machine = Machine::new();
  machine.push(HALT_ADDR)?;
  machine.run(&asm.insts)
}

struct Machine {
  regs: [i64; 5],
  /// Operands of the most recent `cmp`.
  flags: (i64, i64),
  stack: Vec<i64>,
}

fn index(reg: Reg) -> usize {
  match reg {
    Reg::Rax => 0,
    Reg::Rdi => 1,
    Reg::Rdx => 2,
    Reg::Rbp => 3,
    Reg::Rsp => 4,
  }
}

impl Machine {
  fn new() -> Self {
    let mut regs = [0; 5];
    regs[index(Reg::Rsp)] = (STACK_WORDS * 8) as i64;
    Self {
      regs,
      flags: (0, 0),
      stack: vec![0; STACK_WORDS],
    }
  }

  fn get(&self, reg: Reg) -> i64 {
    self.regs[index(reg)]
  }

  fn set(&mut self, reg: Reg, value: i64) {
    self.regs[index(reg)] = value;
  }

  fn slot(&self, addr: i64) -> Result<usize, VmError> {
    if addr < 0 || addr % 8 != 0 || addr as usize / 8 >= STACK_WORDS {
      return BadAddressSnafu { addr }.fail();
    }
    Ok(addr as usize / 8)
  }

  fn load(&self, addr: i64) -> Result<i64, VmError> {
    Ok(self.stack[self.slot(addr)?])
  }

  fn store(&mut self, addr: i64, value: i64) -> Result<(), VmError> {
    let slot = self.slot(addr)?;
    self.stack[slot] = value;
    Ok(())
  }

  fn push(&mut self, value: i64) -> Result<(), VmError> {
    let rsp = self.get(Reg::Rsp) - 8;
    if rsp < 0 {
      return StackOverflowSnafu { rsp }.fail();
    }
    self.set(Reg::Rsp, rsp);
    self.store(rsp, value)
  }

  fn pop(&mut self) -> Result<i64, VmError> {
    let rsp = self.get(Reg::Rsp);
    if rsp < 0 || rsp as usize >= STACK_WORDS * 8 {
      return StackOverflowSnafu { rsp }.fail();
    }
    let value = self.load(rsp)?;
    self.set(Reg::Rsp, rsp + 8);
    Ok(value)
  }

  fn condition(&self, cond: Cond) -> bool {
    let (lhs, rhs) = self.flags;
    match cond {
      Cond::Eq => lhs == rhs,
      Cond::Ne => lhs != rhs,
      Cond::Lt => lhs < rhs,
      Cond::Le => lhs <= rhs,
    }
  }

  fn divide(&mut self, divisor: i64) -> Result<(), VmError> {
    let dividend = ((self.get(Reg::Rdx) as i128) << 64) | (self.get(Reg::Rax) as u64 as i128);
    let divisor = divisor as i128;
    let quotient = dividend.checked_div(divisor).ok_or(VmError::DivideError)?;
    let remainder = dividend.checked_rem(divisor).ok_or(VmError::DivideError)?;
    let quotient = i64::try_from(quotient).map_err(|_| VmError::DivideError)?;
    self.set(Reg::Rax, quotient);
    self.set(Reg::Rdx, remainder as i64);
    Ok(())
  }

  fn run(&mut self, insts: &[Inst]) -> Result<i64, VmError> {
    for inst in insts {
      trace!(?inst, rax = self.get(Reg::Rax), "step");
      match *inst {
        Inst::Push(reg) => self.push(self.get(reg))?,
        Inst::Pop(reg) => {
          let value = self.pop()?;
          self.set(reg, value);
        }
        Inst::MovImm(dst, value) => self.set(dst, value),
        Inst::Mov(dst, src) => self.set(dst, self.get(src)),
        Inst::Lea { dst, base, disp } => self.set(dst, self.get(base).wrapping_add(disp)),
        Inst::Load { dst, addr } => {
          let value = self.load(self.get(addr))?;
          self.set(dst, value);
        }
        Inst::Store { addr, src } => self.store(self.get(addr), self.get(src))?,
        Inst::SubImm(dst, value) => self.set(dst, self.get(dst).wrapping_sub(value)),
        Inst::Add(dst, src) => self.set(dst, self.get(dst).wrapping_add(self.get(src))),
        Inst::Sub(dst, src) => self.set(dst, self.get(dst).wrapping_sub(self.get(src))),
        Inst::Imul(dst, src) => self.set(dst, self.get(dst).wrapping_mul(self.get(src))),
        Inst::Cqo => self.set(Reg::Rdx, if self.get(Reg::Rax) < 0 { -1 } else { 0 }),
        Inst::Idiv(src) => self.divide(self.get(src))?,
        Inst::Neg(reg) => self.set(reg, self.get(reg).wrapping_neg()),
        Inst::Cmp(lhs, rhs) => self.flags = (self.get(lhs), self.get(rhs)),
        Inst::Set(cond) => {
          let al = i64::from(self.condition(cond));
          self.set(Reg::Rax, (self.get(Reg::Rax) & !0xff) | al);
        }
        Inst::Movzb(dst) => self.set(dst, self.get(Reg::Rax) & 0xff),
        Inst::Ret => {
          let addr = self.pop()?;
          if addr != HALT_ADDR {
            return BadReturnSnafu { addr }.fail();
          }
          return Ok(self.get(Reg::Rax));
        }
      }
    }
    NoReturnSnafu.fail()
  }
}
