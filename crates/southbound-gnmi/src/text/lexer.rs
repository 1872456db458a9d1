// Tokenizer for the protobuf text format.

use super::{Pos, TextError};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    /// Field name, enum value, `true`/`false`, `inf`, `nan`.
    Ident(String),
    /// A quoted literal with escapes already applied. Adjacent literals
    /// are concatenated by the parser, not here.
    Str(Vec<u8>),
    /// Numeric lexeme without sign, kept verbatim for typed decoding.
    Number(String),
    Punct(char),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Spanned {
    pub token: Token,
    pub pos: Pos,
}

pub(crate) fn tokenize(input: &str) -> Result<Vec<Spanned>, TextError> {
    Lexer::new(input).run()
}

struct Lexer<'a> {
    bytes: &'a [u8],
    at: usize,
    line: usize,
    col: usize,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            bytes: input.as_bytes(),
            at: 0,
            line: 1,
            col: 1,
        }
    }

    fn pos(&self) -> Pos {
        Pos {
            line: self.line,
            col: self.col,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.at).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.at += 1;
        if b == b'\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(b)
    }

    fn run(mut self) -> Result<Vec<Spanned>, TextError> {
        let mut out = Vec::new();
        while let Some(b) = self.peek() {
            let pos = self.pos();
            match b {
                b' ' | b'\t' | b'\r' | b'\n' => {
                    self.bump();
                }
                b'#' => {
                    while let Some(c) = self.bump() {
                        if c == b'\n' {
                            break;
                        }
                    }
                }
                b'"' | b'\'' => {
                    let token = self.string(b)?;
                    out.push(Spanned { token, pos });
                }
                b'0'..=b'9' => {
                    let token = Token::Number(self.word());
                    out.push(Spanned { token, pos });
                }
                b'.' if self
                    .bytes
                    .get(self.at + 1)
                    .is_some_and(u8::is_ascii_digit) =>
                {
                    let token = Token::Number(self.word());
                    out.push(Spanned { token, pos });
                }
                b if b.is_ascii_alphabetic() || b == b'_' => {
                    let token = Token::Ident(self.word());
                    out.push(Spanned { token, pos });
                }
                b':' | b'<' | b'>' | b'{' | b'}' | b'[' | b']' | b',' | b';' | b'-' => {
                    self.bump();
                    out.push(Spanned {
                        token: Token::Punct(char::from(b)),
                        pos,
                    });
                }
                other => {
                    return Err(TextError::at(
                        pos,
                        format!("unexpected character '{}'", char::from(other)),
                    ));
                }
            }
        }
        Ok(out)
    }

    /// Identifier or number body: letters, digits, `_`, `.`, and a sign
    /// directly after an exponent marker.
    fn word(&mut self) -> String {
        let start = self.at;
        while let Some(b) = self.peek() {
            let exponent_sign = (b == b'+' || b == b'-')
                && self.at > start
                && matches!(self.bytes[self.at - 1], b'e' | b'E')
                && self.bytes[start].is_ascii_digit()
                && !self.bytes[start..self.at].starts_with(b"0x");
            if b.is_ascii_alphanumeric() || b == b'_' || b == b'.' || exponent_sign {
                self.bump();
            } else {
                break;
            }
        }
        String::from_utf8_lossy(&self.bytes[start..self.at]).into_owned()
    }

    fn string(&mut self, quote: u8) -> Result<Token, TextError> {
        let start = self.pos();
        self.bump();
        let mut value = Vec::new();
        loop {
            let pos = self.pos();
            match self.bump() {
                None | Some(b'\n') => {
                    return Err(TextError::at(start, "unterminated string literal"));
                }
                Some(b) if b == quote => return Ok(Token::Str(value)),
                Some(b'\\') => self.escape(pos, &mut value)?,
                Some(b) => value.push(b),
            }
        }
    }

    fn escape(&mut self, pos: Pos, value: &mut Vec<u8>) -> Result<(), TextError> {
        let Some(b) = self.bump() else {
            return Err(TextError::at(pos, "unterminated escape sequence"));
        };
        match b {
            b'n' => value.push(b'\n'),
            b'r' => value.push(b'\r'),
            b't' => value.push(b'\t'),
            b'a' => value.push(0x07),
            b'b' => value.push(0x08),
            b'f' => value.push(0x0c),
            b'v' => value.push(0x0b),
            b'\\' | b'\'' | b'"' | b'?' => value.push(b),
            b'x' | b'X' => {
                let mut n: u32 = 0;
                let mut digits = 0;
                while digits < 2 {
                    match self.peek().and_then(|c| char::from(c).to_digit(16)) {
                        Some(d) => {
                            n = n * 16 + d;
                            digits += 1;
                            self.bump();
                        }
                        None => break,
                    }
                }
                if digits == 0 {
                    return Err(TextError::at(pos, "\\x escape without hex digits"));
                }
                value.push(low_byte(n));
            }
            b'0'..=b'7' => {
                let mut n = u32::from(b - b'0');
                for _ in 0..2 {
                    match self.peek() {
                        Some(c @ b'0'..=b'7') => {
                            n = n * 8 + u32::from(c - b'0');
                            self.bump();
                        }
                        _ => break,
                    }
                }
                if n > 0xff {
                    return Err(TextError::at(pos, "octal escape out of range"));
                }
                value.push(low_byte(n));
            }
            other => {
                return Err(TextError::at(
                    pos,
                    format!("unknown escape sequence '\\{}'", char::from(other)),
                ));
            }
        }
        Ok(())
    }
}

fn low_byte(n: u32) -> u8 {
    n.to_le_bytes()[0]
}
