//! A forgiving C tokenizer.
//!
//! Comments and string or character literals are dropped. Preprocessor
//! lines come out whole as [`Token::Directive`], with line continuations
//! joined and comments removed. Anything not understood is skipped.

use alloc::string::String;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token<'a> {
    Ident(&'a str),
    /// A preprocessing number: digits, letters, `.` and `_`, e.g. `0x1Fu`.
    Number(&'a str),
    Punct(&'a str),
    /// `#name body`, `body` trimmed.
    Directive { name: &'a str, body: String },
}

impl<'a> Token<'a> {
    pub(crate) fn text(&self) -> &str {
        match self {
            Token::Ident(s) | Token::Number(s) | Token::Punct(s) => s,
            Token::Directive { name, .. } => name,
        }
    }

    #[inline]
    pub(crate) fn is_punct(&self, p: &str) -> bool {
        matches!(self, Token::Punct(s) if *s == p)
    }
}

const TWO_CHAR: [&str; 11] = ["==", "!=", "<=", ">=", "&&", "||", "<<", ">>", "->", "++", "--"];

pub(crate) struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    line_start: bool,
}

pub(crate) fn tokenize(src: &str) -> Lexer<'_> {
    Lexer {
        src,
        pos: 0,
        line_start: true,
    }
}

impl<'a> Lexer<'a> {
    #[inline]
    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.src.as_bytes().get(self.pos + offset).copied()
    }

    fn take_while(&mut self, f: impl Fn(u8) -> bool) -> &'a str {
        let start = self.pos;
        while self.peek_at(0).is_some_and(&f) {
            self.pos += 1;
        }
        &self.src[start..self.pos]
    }

    /// Skips a comment starting at `pos`, if any.
    fn skip_comment(&mut self) -> bool {
        match (self.peek_at(0), self.peek_at(1)) {
            (Some(b'/'), Some(b'/')) => {
                self.take_while(|c| c != b'\n');
                true
            }
            (Some(b'/'), Some(b'*')) => {
                let rest = &self.src[self.pos + 2..];
                let len = rest.find("*/").map_or(rest.len(), |i| i + 2);
                if rest[..len].contains('\n') {
                    self.line_start = true;
                }
                self.pos += 2 + len;
                true
            }
            _ => false,
        }
    }

    fn skip_quoted(&mut self, quote: u8) {
        self.pos += 1;
        while let Some(c) = self.peek_at(0) {
            self.pos += 1;
            match c {
                b'\\' => self.pos += 1,
                b'\n' => break,
                _ if c == quote => break,
                _ => {}
            }
        }
        self.pos = self.pos.min(self.src.len());
    }

    fn directive(&mut self) -> Token<'a> {
        self.pos += 1;
        self.take_while(|c| c == b' ' || c == b'\t');
        let name = self.take_while(|c| c.is_ascii_alphanumeric() || c == b'_');
        let start = self.pos;
        loop {
            match self.peek_at(0) {
                None => break,
                Some(b'\n') if self.src.as_bytes()[self.pos - 1] != b'\\' => break,
                // A block comment may span lines without ending the directive.
                Some(b'/') if self.peek_at(1) == Some(b'*') => {
                    let rest = &self.src[self.pos + 2..];
                    self.pos += 2 + rest.find("*/").map_or(rest.len(), |i| i + 2);
                }
                Some(_) => self.pos += 1,
            }
        }
        let body = strip_comments(&self.src[start..self.pos]).replace("\\\n", " ");
        self.line_start = true;
        Token::Directive {
            name,
            body: String::from(body.trim()),
        }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        loop {
            let c = self.peek_at(0)?;
            if c == b'\n' {
                self.line_start = true;
                self.pos += 1;
                continue;
            }
            if c.is_ascii_whitespace() {
                self.pos += 1;
                continue;
            }
            if self.skip_comment() {
                continue;
            }
            if c == b'#' && self.line_start {
                return Some(self.directive());
            }
            self.line_start = false;

            if c == b'"' || c == b'\'' {
                self.skip_quoted(c);
                continue;
            }
            if c.is_ascii_alphabetic() || c == b'_' {
                return Some(Token::Ident(
                    self.take_while(|c| c.is_ascii_alphanumeric() || c == b'_'),
                ));
            }
            let fraction = c == b'.' && self.peek_at(1).is_some_and(|d| d.is_ascii_digit());
            if c.is_ascii_digit() || fraction {
                return Some(Token::Number(
                    self.take_while(|c| c.is_ascii_alphanumeric() || c == b'.' || c == b'_'),
                ));
            }
            if !c.is_ascii() {
                // Skip the whole multi-byte character.
                let len = self.src[self.pos..].chars().next().map_or(1, char::len_utf8);
                self.pos += len;
                continue;
            }
            let two = self.src.get(self.pos..self.pos + 2);
            let len = if two.is_some_and(|t| TWO_CHAR.contains(&t)) { 2 } else { 1 };
            let tok = &self.src[self.pos..self.pos + len];
            self.pos += len;
            return Some(Token::Punct(tok));
        }
    }
}

/// Removes `/* */` and `//` comments from one logical line.
fn strip_comments(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut rest = line;
    loop {
        let block = rest.find("/*");
        let eol = rest.find("//");
        match (block, eol) {
            (Some(b), e) if e.is_none_or(|e| b < e) => {
                out.push_str(&rest[..b]);
                out.push(' ');
                rest = rest[b + 2..].find("*/").map_or("", |end| &rest[b + 2 + end + 2..]);
            }
            (_, Some(e)) => {
                out.push_str(&rest[..e]);
                // Keep a continuation that follows the comment.
                if let Some(nl) = rest[e..].find('\n') {
                    rest = &rest[e + nl..];
                    continue;
                }
                return out;
            }
            _ => {
                out.push_str(rest);
                return out;
            }
        }
    }
}

/// Integer value of a C integer literal: decimal, `0x` hex or `0b` binary,
/// with any `u`/`l` suffix.
pub(crate) fn parse_int(text: &str) -> Option<u64> {
    let digits = text.trim_end_matches(['u', 'U', 'l', 'L']);
    if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        return u64::from_str_radix(hex, 16).ok();
    }
    if let Some(bin) = digits.strip_prefix("0b").or_else(|| digits.strip_prefix("0B")) {
        return u64::from_str_radix(bin, 2).ok();
    }
    if digits.bytes().all(|c| c.is_ascii_digit()) {
        return digits.parse().ok();
    }
    None
}

/// Collapses whitespace runs to single spaces.
pub(crate) fn squash(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for word in text.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}
