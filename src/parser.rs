//! Recursive-descent parser producing a statement list and expression AST.
//!
//! One method per precedence level, lowest first. Statements live outside the
//! expression tree so sequencing stays a plain list. Variables are declared by
//! use: the first mention of a name creates a local, every later mention
//! resolves to the same one.

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::error::{CompileResult, ExpectedExpressionSnafu, ExpectedTokenSnafu, ExtraTokenSnafu};
use crate::tokenizer::{Token, TokenKind, describe_token, token_text};

/// Binary operators recognised by the language. `>` and `>=` never make it
/// into the tree; the parser rewrites them as `Lt`/`Le` with swapped operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
  Add,
  Sub,
  Mul,
  Div,
  Eq,
  Ne,
  Lt,
  Le,
}

/// Expression tree produced by the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AstNode {
  Num {
    value: i64,
  },
  /// Index into [`Function::locals`].
  Var {
    obj: usize,
  },
  Neg {
    operand: Box<AstNode>,
  },
  Binary {
    op: BinaryOp,
    lhs: Box<AstNode>,
    rhs: Box<AstNode>,
  },
  Assign {
    lhs: Box<AstNode>,
    rhs: Box<AstNode>,
    /// Source offset where the assignment target starts.
    loc: usize,
  },
}

impl AstNode {
  pub fn number(value: i64) -> Self {
    Self::Num { value }
  }

  pub fn var(obj: usize) -> Self {
    Self::Var { obj }
  }

  pub fn unary_neg(operand: AstNode) -> Self {
    Self::Neg {
      operand: Box::new(operand),
    }
  }

  pub fn binary(op: BinaryOp, lhs: AstNode, rhs: AstNode) -> Self {
    Self::Binary {
      op,
      lhs: Box::new(lhs),
      rhs: Box::new(rhs),
    }
  }

  pub fn assign(lhs: AstNode, rhs: AstNode, loc: usize) -> Self {
    Self::Assign {
      lhs: Box::new(lhs),
      rhs: Box::new(rhs),
      loc,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
  /// An expression evaluated for its side effects; the value is dropped.
  Expr(AstNode),
}

/// A local variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Obj {
  pub name: String,
  /// Distance below `rbp`. Zero until the code generator lays out the frame.
  pub offset: usize,
}

impl Obj {
  fn new(name: &str) -> Self {
    Self {
      name: name.to_string(),
      offset: 0,
    }
  }
}

/// The parse result: every statement in program order plus the locals they
/// reference, in order of first appearance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Function {
  pub body: Vec<Stmt>,
  pub locals: Vec<Obj>,
  pub stack_size: usize,
}

impl Function {
  #[cfg(test)]
  fn find_local(&self, name: &str) -> Option<&Obj> {
    self.locals.iter().find(|obj| obj.name == name)
  }
}

/// Parse a whole program from the token stream.
pub fn parse(tokens: Vec<Token>, source: &str) -> CompileResult<Function> {
  let mut parser = Parser::new(TokenStream::new(tokens, source));

  let mut body = Vec::new();
  while !parser.stream.is_eof() {
    body.push(parser.stmt()?);
  }
  parser.stream.finish()?;

  debug!(
    statements = body.len(),
    locals = parser.locals.len(),
    "parsed program"
  );

  Ok(Function {
    body,
    locals: parser.locals,
    stack_size: 0,
  })
}

struct Parser<'a> {
  stream: TokenStream<'a>,
  locals: Vec<Obj>,
  by_name: HashMap<String, usize>,
}

impl<'a> Parser<'a> {
  fn new(stream: TokenStream<'a>) -> Self {
    Self {
      stream,
      locals: Vec::new(),
      by_name: HashMap::new(),
    }
  }

  fn find_or_create_var(&mut self, name: &str) -> usize {
    if let Some(&obj) = self.by_name.get(name) {
      return obj;
    }
    let obj = self.locals.len();
    self.locals.push(Obj::new(name));
    self.by_name.insert(name.to_string(), obj);
    trace!(name, obj, "declared local");
    obj
  }

  // stmt = expr-stmt
  fn stmt(&mut self) -> CompileResult<Stmt> {
    self.expr_stmt()
  }

  // expr-stmt = expr ";"
  fn expr_stmt(&mut self) -> CompileResult<Stmt> {
    let expr = self.expr()?;
    self.stream.skip(";")?;
    Ok(Stmt::Expr(expr))
  }

  // expr = assign
  fn expr(&mut self) -> CompileResult<AstNode> {
    self.assign()
  }

  // assign = equality ("=" assign)?
  fn assign(&mut self) -> CompileResult<AstNode> {
    let loc = self.stream.loc();
    let node = self.equality()?;

    if self.stream.equal("=") {
      let rhs = self.assign()?;
      return Ok(AstNode::assign(node, rhs, loc));
    }

    Ok(node)
  }

  // equality = relational ("==" relational | "!=" relational)*
  fn equality(&mut self) -> CompileResult<AstNode> {
    let mut node = self.relational()?;

    loop {
      node = if self.stream.equal("==") {
        AstNode::binary(BinaryOp::Eq, node, self.relational()?)
      } else if self.stream.equal("!=") {
        AstNode::binary(BinaryOp::Ne, node, self.relational()?)
      } else {
        return Ok(node);
      };
    }
  }

  // relational = add ("<" add | "<=" add | ">" add | ">=" add)*
  fn relational(&mut self) -> CompileResult<AstNode> {
    let mut node = self.add()?;

    loop {
      node = if self.stream.equal("<") {
        AstNode::binary(BinaryOp::Lt, node, self.add()?)
      } else if self.stream.equal("<=") {
        AstNode::binary(BinaryOp::Le, node, self.add()?)
      } else if self.stream.equal(">") {
        let rhs = self.add()?;
        AstNode::binary(BinaryOp::Lt, rhs, node)
      } else if self.stream.equal(">=") {
        let rhs = self.add()?;
        AstNode::binary(BinaryOp::Le, rhs, node)
      } else {
        return Ok(node);
      };
    }
  }

  // add = mul ("+" mul | "-" mul)*
  fn add(&mut self) -> CompileResult<AstNode> {
    let mut node = self.mul()?;

    loop {
      node = if self.stream.equal("+") {
        AstNode::binary(BinaryOp::Add, node, self.mul()?)
      } else if self.stream.equal("-") {
        AstNode::binary(BinaryOp::Sub, node, self.mul()?)
      } else {
        return Ok(node);
      };
    }
  }

  // mul = unary ("*" unary | "/" unary)*
  fn mul(&mut self) -> CompileResult<AstNode> {
    let mut node = self.unary()?;

    loop {
      node = if self.stream.equal("*") {
        AstNode::binary(BinaryOp::Mul, node, self.unary()?)
      } else if self.stream.equal("/") {
        AstNode::binary(BinaryOp::Div, node, self.unary()?)
      } else {
        return Ok(node);
      };
    }
  }

  // unary = ("+" | "-") unary | primary
  fn unary(&mut self) -> CompileResult<AstNode> {
    if self.stream.equal("+") {
      return self.unary();
    }

    if self.stream.equal("-") {
      let operand = self.unary()?;
      return Ok(AstNode::unary_neg(operand));
    }

    self.primary()
  }

  // primary = "(" expr ")" | ident | num
  fn primary(&mut self) -> CompileResult<AstNode> {
    if self.stream.equal("(") {
      let node = self.expr()?;
      self.stream.skip(")")?;
      return Ok(node);
    }

    if let Some(name) = self.stream.consume_ident() {
      let obj = self.find_or_create_var(name);
      return Ok(AstNode::var(obj));
    }

    if let Some(value) = self.stream.consume_number() {
      return Ok(AstNode::number(value));
    }

    ExpectedExpressionSnafu {
      found: self.stream.describe_current(),
      loc: self.stream.loc(),
    }
    .fail()
  }
}

/// Lightweight cursor over the token vector.
struct TokenStream<'a> {
  tokens: Vec<Token>,
  source: &'a str,
  pos: usize,
}

impl<'a> TokenStream<'a> {
  fn new(tokens: Vec<Token>, source: &'a str) -> Self {
    Self {
      tokens,
      source,
      pos: 0,
    }
  }

  fn peek(&self) -> Option<&Token> {
    self.tokens.get(self.pos)
  }

  /// Source offset of the current token; the end of input once the tokens
  /// run out.
  fn loc(&self) -> usize {
    self.peek().map_or(self.source.len(), |token| token.loc)
  }

  fn describe_current(&self) -> String {
    describe_token(self.peek(), self.source)
  }

  /// Consume the current token if it is exactly the provided punctuator.
  fn equal(&mut self, op: &str) -> bool {
    if let Some(token) = self.peek()
      && token.kind == TokenKind::Punctuator
      && token_text(token, self.source) == op
    {
      self.pos += 1;
      return true;
    }
    false
  }

  fn skip(&mut self, op: &'static str) -> CompileResult<()> {
    if self.equal(op) {
      return Ok(());
    }
    ExpectedTokenSnafu {
      expected: op,
      found: self.describe_current(),
      loc: self.loc(),
    }
    .fail()
  }

  fn consume_ident(&mut self) -> Option<&'a str> {
    let token = self.peek().filter(|token| token.kind == TokenKind::Ident)?;
    let name = token_text(token, self.source);
    self.pos += 1;
    Some(name)
  }

  fn consume_number(&mut self) -> Option<i64> {
    let value = self
      .peek()
      .filter(|token| token.kind == TokenKind::Num)
      .and_then(|token| token.value)?;
    self.pos += 1;
    Some(value)
  }

  fn is_eof(&self) -> bool {
    matches!(self.peek().map(|token| token.kind), Some(TokenKind::Eof))
  }

  /// Step over the end marker and make sure nothing follows it.
  fn finish(&mut self) -> CompileResult<()> {
    self.pos += 1;
    match self.peek() {
      None => Ok(()),
      Some(token) => ExtraTokenSnafu {
        found: describe_token(Some(token), self.source),
        loc: token.loc,
      }
      .fail(),
    }
  }
}
