// Generic field tree built from the token stream.
//
// The tree is schema-free: typed decoding happens afterwards in
// `decode.rs`, which lets every message share one grammar.

use super::lexer::{Spanned, Token};
use super::{Pos, TextError};

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub pos: Pos,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(Scalar, Pos),
    Message(Vec<Field>, Pos),
    /// `[a, b, c]` shorthand for a repeated field.
    List(Vec<Value>, Pos),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Ident(String),
    Bytes(Vec<u8>),
    Number { negative: bool, lexeme: String },
    /// `-inf`, `-nan` and friends.
    NegIdent(String),
}

impl Value {
    pub fn pos(&self) -> Pos {
        match self {
            Self::Scalar(_, pos) | Self::Message(_, pos) | Self::List(_, pos) => *pos,
        }
    }
}

/// Deepest message nesting accepted before parsing gives up.
pub(crate) const MAX_DEPTH: usize = 100;

pub(crate) fn parse_fields(tokens: Vec<Spanned>) -> Result<Vec<Field>, TextError> {
    let mut parser = Parser {
        tokens,
        at: 0,
        end: Pos { line: 1, col: 1 },
        depth: 0,
    };
    if let Some(last) = parser.tokens.last() {
        parser.end = last.pos;
    }
    parser.fields(None)
}

struct Parser {
    tokens: Vec<Spanned>,
    at: usize,
    end: Pos,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Spanned> {
        self.tokens.get(self.at)
    }

    fn next(&mut self) -> Option<Spanned> {
        let t = self.tokens.get(self.at).cloned();
        if t.is_some() {
            self.at += 1;
        }
        t
    }

    fn peek_punct(&self, c: char) -> bool {
        matches!(self.peek(), Some(Spanned { token: Token::Punct(p), .. }) if *p == c)
    }

    fn expect_punct(&mut self, c: char) -> Result<(), TextError> {
        match self.next() {
            Some(Spanned {
                token: Token::Punct(p),
                ..
            }) if p == c => Ok(()),
            Some(other) => Err(TextError::at(
                other.pos,
                format!("expected '{c}', found {}", describe(&other.token)),
            )),
            None => Err(TextError::at(
                self.end,
                format!("expected '{c}', found end of input"),
            )),
        }
    }

    /// Fields until `close` (or end of input for the top level).
    fn fields(&mut self, close: Option<char>) -> Result<Vec<Field>, TextError> {
        let mut fields = Vec::new();
        loop {
            let Some(spanned) = self.next() else {
                return match close {
                    None => Ok(fields),
                    Some(c) => Err(TextError::at(
                        self.end,
                        format!("expected '{c}', found end of input"),
                    )),
                };
            };
            match spanned.token {
                Token::Punct(p) if Some(p) == close => return Ok(fields),
                Token::Ident(name) => {
                    let value = self.field_value()?;
                    fields.push(Field {
                        name,
                        pos: spanned.pos,
                        value,
                    });
                    if self.peek_punct(',') || self.peek_punct(';') {
                        self.at += 1;
                    }
                }
                other => {
                    return Err(TextError::at(
                        spanned.pos,
                        format!("expected field name, found {}", describe(&other)),
                    ));
                }
            }
        }
    }

    fn field_value(&mut self) -> Result<Value, TextError> {
        let has_colon = self.peek_punct(':');
        if has_colon {
            self.at += 1;
        }
        let Some(next) = self.peek() else {
            return Err(TextError::at(self.end, "expected value, found end of input"));
        };
        let pos = next.pos;
        let token = next.token.clone();
        match &token {
            Token::Punct('<' | '{') => self.message(),
            Token::Punct('[') => {
                self.at += 1;
                let mut items = Vec::new();
                if self.peek_punct(']') {
                    self.at += 1;
                    return Ok(Value::List(items, pos));
                }
                loop {
                    let item = if self.peek_punct('<') || self.peek_punct('{') {
                        self.message()?
                    } else {
                        self.scalar()?
                    };
                    items.push(item);
                    if self.peek_punct(',') {
                        self.at += 1;
                        continue;
                    }
                    self.expect_punct(']')?;
                    return Ok(Value::List(items, pos));
                }
            }
            _ if has_colon => self.scalar(),
            other => Err(TextError::at(
                pos,
                format!("expected ':' or message, found {}", describe(other)),
            )),
        }
    }

    fn message(&mut self) -> Result<Value, TextError> {
        let Some(open) = self.next() else {
            return Err(TextError::at(self.end, "expected message"));
        };
        let close = match open.token {
            Token::Punct('<') => '>',
            Token::Punct('{') => '}',
            other => {
                return Err(TextError::at(
                    open.pos,
                    format!("expected '<' or '{{', found {}", describe(&other)),
                ));
            }
        };
        if self.depth >= MAX_DEPTH {
            return Err(TextError::at(
                open.pos,
                format!("message nesting exceeds {MAX_DEPTH}"),
            ));
        }
        self.depth += 1;
        let fields = self.fields(Some(close));
        self.depth -= 1;
        Ok(Value::Message(fields?, open.pos))
    }

    fn scalar(&mut self) -> Result<Value, TextError> {
        let Some(first) = self.next() else {
            return Err(TextError::at(self.end, "expected value, found end of input"));
        };
        let pos = first.pos;
        let scalar = match first.token {
            Token::Str(mut bytes) => {
                while let Some(Spanned {
                    token: Token::Str(more),
                    ..
                }) = self.peek()
                {
                    bytes.extend_from_slice(more);
                    self.at += 1;
                }
                Scalar::Bytes(bytes)
            }
            Token::Number(lexeme) => Scalar::Number {
                negative: false,
                lexeme,
            },
            Token::Ident(ident) => Scalar::Ident(ident),
            Token::Punct('-') => match self.next() {
                Some(Spanned {
                    token: Token::Number(lexeme),
                    ..
                }) => Scalar::Number {
                    negative: true,
                    lexeme,
                },
                Some(Spanned {
                    token: Token::Ident(ident),
                    ..
                }) => Scalar::NegIdent(ident),
                Some(other) => {
                    return Err(TextError::at(
                        other.pos,
                        format!("expected number after '-', found {}", describe(&other.token)),
                    ));
                }
                None => return Err(TextError::at(self.end, "expected number after '-'")),
            },
            other => {
                return Err(TextError::at(
                    pos,
                    format!("expected value, found {}", describe(&other)),
                ));
            }
        };
        Ok(Value::Scalar(scalar, pos))
    }
}

fn describe(token: &Token) -> String {
    match token {
        Token::Ident(s) => format!("identifier '{s}'"),
        Token::Str(_) => "string literal".into(),
        Token::Number(n) => format!("number '{n}'"),
        Token::Punct(p) => format!("'{p}'"),
    }
}
