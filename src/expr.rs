//! Integer expressions as they appear in `#if` lines and descriptor
//! initializers, e.g. `LV_COLOR_DEPTH == 16 && !(LV_COLOR_16_SWAP == 0)` or
//! `76 * 76 * LV_IMG_PX_SIZE_ALPHA_BYTE`.
//!
//! Arithmetic is on `i64` and wraps. Unlike a C preprocessor, an undefined
//! identifier is an error rather than zero, except inside `defined(..)` or
//! an operand that `&&`, `||` or `?:` never evaluates.

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::error::ExprError;
use crate::format::ColorDepth;
use crate::source::lexer::{self, Token};

/// Named integer constants an expression may reference.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Symbols {
    values: BTreeMap<String, i64>,
}

impl Symbols {
    pub fn new() -> Self {
        Self::default()
    }

    /// The configuration macros LVGL image sources test.
    pub fn lvgl(depth: ColorDepth, swap16: bool) -> Self {
        Symbols::new()
            .with("LV_COLOR_DEPTH", depth.bits() as i64)
            .with("LV_COLOR_16_SWAP", swap16 as i64)
            .with("LV_COLOR_SIZE", depth.color_size() as i64)
            .with("LV_IMG_PX_SIZE_ALPHA_BYTE", depth.px_size_alpha_byte() as i64)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: i64) -> Option<i64> {
        self.values.insert(name.into(), value)
    }

    pub fn with(mut self, name: impl Into<String>, value: i64) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<i64> {
        self.values.get(name).copied()
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn eval(&self, expr: &str) -> Result<i64, ExprError> {
        eval(expr, self)
    }

    /// Evaluates a condition; nonzero is true.
    pub fn test(&self, condition: &str) -> Result<bool, ExprError> {
        eval(condition, self).map(|v| v != 0)
    }
}

/// Evaluates `expr` against `symbols`.
pub fn eval(expr: &str, symbols: &Symbols) -> Result<i64, ExprError> {
    let mut p = Parser {
        tokens: lexer::tokenize(expr).collect(),
        pos: 0,
        symbols,
        skip: 0,
        depth: 0,
    };
    let v = p.conditional()?;
    match p.tokens.get(p.pos) {
        Some(t) => Err(ExprError::UnexpectedToken(t.text().to_string())),
        None => Ok(v),
    }
}

struct Parser<'a, 's> {
    tokens: Vec<Token<'a>>,
    pos: usize,
    symbols: &'s Symbols,
    /// Nonzero while parsing an operand whose value is discarded.
    skip: u32,
    /// Open parentheses, unary operators and `?:` arms above the cursor.
    depth: u32,
}

/// Deepest nesting an expression may reach before evaluation gives up.
pub const MAX_NESTING: u32 = 256;

fn precedence(op: &str) -> Option<u8> {
    Some(match op {
        "||" => 1,
        "&&" => 2,
        "|" => 3,
        "^" => 4,
        "&" => 5,
        "==" | "!=" => 6,
        "<" | ">" | "<=" | ">=" => 7,
        "<<" | ">>" => 8,
        "+" | "-" => 9,
        "*" | "/" | "%" => 10,
        _ => return None,
    })
}

impl<'a, 's> Parser<'a, 's> {
    fn peek(&self) -> Option<&Token<'a>> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Result<Token<'a>, ExprError> {
        let t = self.tokens.get(self.pos).cloned().ok_or(ExprError::UnexpectedEnd)?;
        self.pos += 1;
        Ok(t)
    }

    fn expect(&mut self, p: &str) -> Result<(), ExprError> {
        let t = self.bump()?;
        if t.is_punct(p) {
            Ok(())
        } else {
            Err(ExprError::UnexpectedToken(t.text().to_string()))
        }
    }

    /// Parses an operand, discarding errors that only arise from evaluation.
    fn skipped<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, ExprError>,
    ) -> Result<T, ExprError> {
        self.skip += 1;
        let r = f(self);
        self.skip -= 1;
        r
    }

    /// Parses one nesting level deeper, failing past [`MAX_NESTING`].
    fn nested(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<i64, ExprError>,
    ) -> Result<i64, ExprError> {
        if self.depth >= MAX_NESTING {
            return Err(ExprError::TooDeep(MAX_NESTING));
        }
        self.depth += 1;
        let r = f(self);
        self.depth -= 1;
        r
    }

    fn conditional(&mut self) -> Result<i64, ExprError> {
        let cond = self.binary(1)?;
        if !self.peek().is_some_and(|t| t.is_punct("?")) {
            return Ok(cond);
        }
        self.pos += 1;
        let yes = if cond != 0 {
            self.nested(Self::conditional)?
        } else {
            self.skipped(|p| p.nested(Self::conditional))?
        };
        self.expect(":")?;
        let no = if cond == 0 {
            self.nested(Self::conditional)?
        } else {
            self.skipped(|p| p.nested(Self::conditional))?
        };
        Ok(if cond != 0 { yes } else { no })
    }

    fn binary(&mut self, min_prec: u8) -> Result<i64, ExprError> {
        let mut lhs = self.unary()?;
        loop {
            let Some(Token::Punct(op)) = self.peek() else {
                break;
            };
            let op = *op;
            let Some(prec) = precedence(op).filter(|&p| p >= min_prec) else {
                break;
            };
            self.pos += 1;
            let short = (op == "&&" && lhs == 0) || (op == "||" && lhs != 0);
            if short {
                self.skipped(|p| p.binary(prec + 1))?;
                lhs = (op == "||") as i64;
                continue;
            }
            let rhs = self.binary(prec + 1)?;
            lhs = self.apply(op, lhs, rhs)?;
        }
        Ok(lhs)
    }

    fn apply(&self, op: &str, a: i64, b: i64) -> Result<i64, ExprError> {
        let shift = |v: i64| u32::try_from(v).ok();
        Ok(match op {
            "||" => (a != 0 || b != 0) as i64,
            "&&" => (a != 0 && b != 0) as i64,
            "|" => a | b,
            "^" => a ^ b,
            "&" => a & b,
            "==" => (a == b) as i64,
            "!=" => (a != b) as i64,
            "<" => (a < b) as i64,
            ">" => (a > b) as i64,
            "<=" => (a <= b) as i64,
            ">=" => (a >= b) as i64,
            "<<" => shift(b).and_then(|s| a.checked_shl(s)).unwrap_or(0),
            ">>" => shift(b).and_then(|s| a.checked_shr(s)).unwrap_or(0),
            "+" => a.wrapping_add(b),
            "-" => a.wrapping_sub(b),
            "*" => a.wrapping_mul(b),
            "/" | "%" if b == 0 => {
                if self.skip > 0 {
                    0
                } else {
                    return Err(ExprError::DivisionByZero);
                }
            }
            "/" => a.wrapping_div(b),
            "%" => a.wrapping_rem(b),
            other => return Err(ExprError::UnexpectedToken(other.to_string())),
        })
    }

    fn unary(&mut self) -> Result<i64, ExprError> {
        match self.bump()? {
            Token::Punct("!") => Ok((self.nested(Self::unary)? == 0) as i64),
            Token::Punct("-") => Ok(self.nested(Self::unary)?.wrapping_neg()),
            Token::Punct("~") => Ok(!self.nested(Self::unary)?),
            Token::Punct("+") => self.nested(Self::unary),
            Token::Punct("(") => {
                let v = self.nested(Self::conditional)?;
                self.expect(")")?;
                Ok(v)
            }
            Token::Number(n) => lexer::parse_int(n)
                .map(|v| v as i64)
                .ok_or_else(|| ExprError::BadNumber(n.to_string())),
            Token::Ident("defined") => {
                let parens = self.peek().is_some_and(|t| t.is_punct("("));
                if parens {
                    self.pos += 1;
                }
                let name = match self.bump()? {
                    Token::Ident(name) => name,
                    other => return Err(ExprError::UnexpectedToken(other.text().to_string())),
                };
                if parens {
                    self.expect(")")?;
                }
                Ok(self.symbols.is_defined(name) as i64)
            }
            Token::Ident(name) => match self.symbols.get(name) {
                Some(v) => Ok(v),
                None if self.skip > 0 => Ok(0),
                None => Err(ExprError::UnknownSymbol(name.to_string())),
            },
            other => Err(ExprError::UnexpectedToken(other.text().to_string())),
        }
    }
}
