//! Parser for the host-expression subset the host quoter evaluates.
//!
//! Precedence, loosest first: conditional `a if c else b`, `or`, `and`,
//! `not`, comparisons (chained), `|`, `^`, `&`, shifts, `+ -`,
//! `* / // %`, unary `- + ~`, `**` (right-associative), then subscripts and
//! calls.

use quasi_lexer::{tokenize, unquote_literal, SourceBuffer, Token, TokenKind};

use crate::{QuoteError, Value};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Mod,
    Pow,
    BitOr,
    BitXor,
    BitAnd,
    LShift,
    RShift,
}

impl BinOp {
    pub(super) fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::FloorDiv => "//",
            Self::Mod => "%",
            Self::Pow => "**",
            Self::BitOr => "|",
            Self::BitXor => "^",
            Self::BitAnd => "&",
            Self::LShift => "<<",
            Self::RShift => ">>",
        }
    }

    /// Infix operators handled by precedence climbing, with their binding
    /// power. `**` is parsed separately.
    fn infix(op: &str) -> Option<(Self, u8)> {
        Some(match op {
            "|" => (Self::BitOr, 1),
            "^" => (Self::BitXor, 2),
            "&" => (Self::BitAnd, 3),
            "<<" => (Self::LShift, 4),
            ">>" => (Self::RShift, 4),
            "+" => (Self::Add, 5),
            "-" => (Self::Sub, 5),
            "*" => (Self::Mul, 6),
            "/" => (Self::Div, 6),
            "//" => (Self::FloorDiv, 6),
            "%" => (Self::Mod, 6),
            _ => return None,
        })
    }

    fn augmented(op: &str) -> Option<Self> {
        let base = op.strip_suffix('=')?;
        if base == "**" {
            return Some(Self::Pow);
        }
        Self::infix(base).map(|(op, _)| op)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum CmpOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    In,
    NotIn,
    Is,
    IsNot,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum UnaryOp {
    Neg,
    Pos,
    Invert,
}

#[derive(Clone, Debug)]
pub(super) enum Expr {
    Const(Value),
    Name(String),
    List(Vec<Expr>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Compare(Box<Expr>, Vec<(CmpOp, Expr)>),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    IfElse {
        cond: Box<Expr>,
        then: Box<Expr>,
        orelse: Box<Expr>,
    },
    Index(Box<Expr>, Box<Expr>),
    Call(String, Vec<Expr>),
}

#[derive(Clone, Debug)]
pub(super) enum Stmt {
    Assign(String, Expr),
    AugAssign(String, BinOp, Expr),
    Expr(Expr),
    Pass,
}

/// Parse expression-form body text. The body may span lines.
pub(super) fn parse_expression(body: &str) -> Result<Expr, QuoteError> {
    // Bracketing makes line breaks inside the body insignificant.
    let text = format!("(\n{body}\n)");
    let buf = SourceBuffer::new(&text);
    let mut parser = Parser::new(&buf, 1)?;
    let expr = parser.expr()?;
    parser.skip_newlines();
    parser.expect_kind(TokenKind::EndMarker, "end of expression")?;
    Ok(expr)
}

/// Parse block-form body text: one simple statement per logical line.
pub(super) fn parse_statements(body: &str) -> Result<Vec<Stmt>, QuoteError> {
    let buf = SourceBuffer::new(body);
    let mut parser = Parser::new(&buf, 0)?;
    if parser.peek().kind == TokenKind::Indent {
        parser.advance();
    }
    let mut stmts = Vec::new();
    loop {
        let token = parser.peek();
        match token.kind {
            TokenKind::EndMarker => break,
            TokenKind::Newline | TokenKind::Dedent => {
                parser.advance();
            }
            TokenKind::Indent => return Err(parser.error(&token, "unexpected indent")),
            _ => {
                stmts.push(parser.statement()?);
                while parser.eat_op(";") {
                    if matches!(parser.peek().kind, TokenKind::Newline | TokenKind::EndMarker) {
                        break;
                    }
                    stmts.push(parser.statement()?);
                }
                let end = parser.peek();
                if !matches!(end.kind, TokenKind::Newline | TokenKind::EndMarker) {
                    return Err(parser.error(&end, "expected end of statement"));
                }
            }
        }
    }
    Ok(stmts)
}

struct Parser<'a> {
    tokens: Vec<Token<'a>>,
    pos: usize,
    /// Lines added in front of the body before tokenizing.
    line_shift: u32,
}

impl<'a> Parser<'a> {
    fn new(buf: &'a SourceBuffer, line_shift: u32) -> Result<Self, QuoteError> {
        let tokens = tokenize(buf)
            .map_err(|err| QuoteError::eval(format!("invalid syntax: {err}")))?
            .into_iter()
            .filter(|t| !matches!(t.kind, TokenKind::Comment | TokenKind::Nl))
            .collect();
        Ok(Self {
            tokens,
            pos: 0,
            line_shift,
        })
    }

    // Token access

    fn peek(&self) -> Token<'a> {
        self.peek_at(0)
    }

    fn peek_at(&self, ahead: usize) -> Token<'a> {
        let last = self.tokens.len().saturating_sub(1);
        self.tokens[(self.pos + ahead).min(last)]
    }

    fn advance(&mut self) -> Token<'a> {
        let token = self.peek();
        self.pos += 1;
        token
    }

    fn at_op(&self, op: &str) -> bool {
        self.peek().is_op(op)
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        self.peek().is(TokenKind::Name, keyword)
    }

    fn eat_op(&mut self, op: &str) -> bool {
        let found = self.at_op(op);
        if found {
            self.pos += 1;
        }
        found
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        let found = self.at_keyword(keyword);
        if found {
            self.pos += 1;
        }
        found
    }

    fn expect_op(&mut self, op: &str) -> Result<(), QuoteError> {
        if self.eat_op(op) {
            return Ok(());
        }
        let token = self.peek();
        Err(self.error(&token, &format!("expected `{op}`")))
    }

    fn expect_kind(&mut self, kind: TokenKind, what: &str) -> Result<(), QuoteError> {
        let token = self.advance();
        if token.kind == kind {
            return Ok(());
        }
        Err(self.error(&token, &format!("expected {what}")))
    }

    fn skip_newlines(&mut self) {
        while self.peek().kind == TokenKind::Newline {
            self.pos += 1;
        }
    }

    fn error(&self, token: &Token<'_>, message: &str) -> QuoteError {
        let found = match token.kind {
            TokenKind::EndMarker => "end of input".to_owned(),
            TokenKind::Newline => "end of line".to_owned(),
            _ => format!("`{}`", token.text),
        };
        QuoteError::eval(format!(
            "invalid syntax at {}:{}: {message}, found {found}",
            token.start.line.saturating_sub(self.line_shift),
            token.start.column + 1,
        ))
    }

    // Statements

    fn statement(&mut self) -> Result<Stmt, QuoteError> {
        let first = self.peek();
        if first.is(TokenKind::Name, "pass") {
            self.advance();
            return Ok(Stmt::Pass);
        }
        if first.kind == TokenKind::Name && !is_keyword(first.text) {
            let next = self.peek_at(1);
            if next.is_op("=") {
                self.pos += 2;
                return Ok(Stmt::Assign(first.text.to_owned(), self.expr()?));
            }
            if next.kind == TokenKind::Op {
                if let Some(op) = BinOp::augmented(next.text) {
                    self.pos += 2;
                    return Ok(Stmt::AugAssign(first.text.to_owned(), op, self.expr()?));
                }
            }
        }
        Ok(Stmt::Expr(self.expr()?))
    }

    // Expressions

    fn expr(&mut self) -> Result<Expr, QuoteError> {
        let then = self.or_test()?;
        if !self.eat_keyword("if") {
            return Ok(then);
        }
        let cond = self.or_test()?;
        if !self.eat_keyword("else") {
            let token = self.peek();
            return Err(self.error(&token, "expected `else`"));
        }
        let orelse = self.expr()?;
        Ok(Expr::IfElse {
            cond: Box::new(cond),
            then: Box::new(then),
            orelse: Box::new(orelse),
        })
    }

    fn or_test(&mut self) -> Result<Expr, QuoteError> {
        let mut left = self.and_test()?;
        while self.eat_keyword("or") {
            left = Expr::Or(Box::new(left), Box::new(self.and_test()?));
        }
        Ok(left)
    }

    fn and_test(&mut self) -> Result<Expr, QuoteError> {
        let mut left = self.not_test()?;
        while self.eat_keyword("and") {
            left = Expr::And(Box::new(left), Box::new(self.not_test()?));
        }
        Ok(left)
    }

    fn not_test(&mut self) -> Result<Expr, QuoteError> {
        if self.eat_keyword("not") {
            return Ok(Expr::Not(Box::new(self.not_test()?)));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr, QuoteError> {
        let left = self.binary(0)?;
        let mut rest = Vec::new();
        while let Some(op) = self.comparison_op() {
            rest.push((op, self.binary(0)?));
        }
        if rest.is_empty() {
            return Ok(left);
        }
        Ok(Expr::Compare(Box::new(left), rest))
    }

    fn comparison_op(&mut self) -> Option<CmpOp> {
        let token = self.peek();
        let op = match (token.kind, token.text) {
            (TokenKind::Op, "<") => CmpOp::Lt,
            (TokenKind::Op, "<=") => CmpOp::Le,
            (TokenKind::Op, ">") => CmpOp::Gt,
            (TokenKind::Op, ">=") => CmpOp::Ge,
            (TokenKind::Op, "==") => CmpOp::Eq,
            (TokenKind::Op, "!=") => CmpOp::Ne,
            (TokenKind::Name, "in") => CmpOp::In,
            (TokenKind::Name, "not") if self.peek_at(1).is(TokenKind::Name, "in") => {
                self.pos += 2;
                return Some(CmpOp::NotIn);
            }
            (TokenKind::Name, "is") if self.peek_at(1).is(TokenKind::Name, "not") => {
                self.pos += 2;
                return Some(CmpOp::IsNot);
            }
            (TokenKind::Name, "is") => CmpOp::Is,
            _ => return None,
        };
        self.pos += 1;
        Some(op)
    }

    /// Precedence climbing over the infix arithmetic and bitwise operators.
    fn binary(&mut self, min_power: u8) -> Result<Expr, QuoteError> {
        let mut left = self.unary()?;
        loop {
            let token = self.peek();
            if token.kind != TokenKind::Op {
                break;
            }
            let Some((op, power)) = BinOp::infix(token.text) else {
                break;
            };
            if power <= min_power {
                break;
            }
            self.advance();
            let right = self.binary(power)?;
            left = Expr::Binary(op, Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr, QuoteError> {
        let op = if self.eat_op("-") {
            UnaryOp::Neg
        } else if self.eat_op("+") {
            UnaryOp::Pos
        } else if self.eat_op("~") {
            UnaryOp::Invert
        } else {
            return self.power();
        };
        Ok(Expr::Unary(op, Box::new(self.unary()?)))
    }

    fn power(&mut self) -> Result<Expr, QuoteError> {
        let base = self.postfix()?;
        if self.eat_op("**") {
            let exponent = self.unary()?;
            return Ok(Expr::Binary(BinOp::Pow, Box::new(base), Box::new(exponent)));
        }
        Ok(base)
    }

    fn postfix(&mut self) -> Result<Expr, QuoteError> {
        let mut expr = self.atom()?;
        loop {
            if self.eat_op("[") {
                let index = self.expr()?;
                self.expect_op("]")?;
                expr = Expr::Index(Box::new(expr), Box::new(index));
            } else if self.at_op("(") {
                let Expr::Name(func) = expr else {
                    let token = self.peek();
                    return Err(self.error(&token, "only built-in functions can be called"));
                };
                self.advance();
                let args = self.sequence(")")?;
                expr = Expr::Call(func, args);
            } else {
                return Ok(expr);
            }
        }
    }

    /// Comma-separated expressions up to `close`, trailing comma allowed.
    fn sequence(&mut self, close: &str) -> Result<Vec<Expr>, QuoteError> {
        let mut items = Vec::new();
        while !self.eat_op(close) {
            items.push(self.expr()?);
            if !self.eat_op(",") {
                self.expect_op(close)?;
                break;
            }
        }
        Ok(items)
    }

    fn atom(&mut self) -> Result<Expr, QuoteError> {
        let token = self.advance();
        match token.kind {
            TokenKind::Number => self.number(&token),
            TokenKind::String => {
                let mut text = self.string(&token)?;
                while self.peek().kind == TokenKind::String {
                    let next = self.advance();
                    text.push_str(&self.string(&next)?);
                }
                Ok(Expr::Const(Value::str(text)))
            }
            TokenKind::Name => match token.text {
                "True" => Ok(Expr::Const(Value::bool(true))),
                "False" => Ok(Expr::Const(Value::bool(false))),
                "None" => Ok(Expr::Const(Value::none())),
                name if is_keyword(name) => Err(self.error(&token, "expected an expression")),
                name => Ok(Expr::Name(name.to_owned())),
            },
            TokenKind::Op if token.text == "(" => {
                let inner = self.expr()?;
                self.expect_op(")")?;
                Ok(inner)
            }
            TokenKind::Op if token.text == "[" => Ok(Expr::List(self.sequence("]")?)),
            _ => Err(self.error(&token, "expected an expression")),
        }
    }

    fn number(&self, token: &Token<'_>) -> Result<Expr, QuoteError> {
        let text = token.text.replace('_', "");
        let lower = text.to_ascii_lowercase();
        let radix = match lower.get(..2) {
            Some("0x") => Some(16),
            Some("0o") => Some(8),
            Some("0b") => Some(2),
            _ => None,
        };
        let value = if let Some(radix) = radix {
            i64::from_str_radix(&lower[2..], radix).ok().map(Value::int)
        } else if lower.contains(['.', 'e']) {
            lower.parse::<f64>().ok().map(Value::float)
        } else {
            lower.parse::<i64>().ok().map(Value::int)
        };
        value
            .map(Expr::Const)
            .ok_or_else(|| self.error(token, "unsupported numeric literal"))
    }

    fn string(&self, token: &Token<'_>) -> Result<String, QuoteError> {
        let prefix = token.text.split(['"', '\'']).next().unwrap_or_default();
        if prefix.to_ascii_lowercase().contains(['b', 'f']) {
            return Err(self.error(token, "bytes and f-strings are not supported"));
        }
        unquote_literal(token.text).map_err(|err| self.error(token, &err.to_string()))
    }
}

fn is_keyword(name: &str) -> bool {
    matches!(
        name,
        "and" | "or" | "not" | "in" | "is" | "if" | "else" | "pass" | "lambda" | "for" | "while"
            | "def" | "class" | "return" | "with" | "import" | "from" | "del" | "global"
    )
}
