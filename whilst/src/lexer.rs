//! Tokenizer for the extended WHILE language.
//!
//! Produces a flat token stream with 1-indexed line numbers for error
//! reporting. `#` starts a comment running to the end of the line.

use std::fmt;

use anyhow::{bail, Result};

use crate::sym::Var;

/// A single token of WHILE source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tok {
    /// `def`
    Def,
    /// `skip`
    Skip,
    /// `if`
    If,
    /// `else`
    Else,
    /// `while`
    While,
    /// `for`
    For,
    /// `in`
    In,
    /// `break`
    Break,
    /// `continue`
    Continue,
    /// `true` / `false`
    Bool(bool),
    /// Identifier.
    Ident(Var),
    /// Integer literal.
    Number(i64),
    /// `->`
    To,
    /// `;`
    Semicolon,
    /// `..`
    Ellipses,
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Times,
    /// `/`
    Divide,
    /// `(`
    LParen,
    /// `)`
    RParen,
    /// `{`
    LCurly,
    /// `}`
    RCurly,
    /// `[`
    LBrack,
    /// `]`
    RBrack,
    /// `:=`
    Assign,
    /// `==`
    Equals,
    /// `<`
    Less,
    /// `>`
    Greater,
}

impl fmt::Display for Tok {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Def => f.write_str("def"),
            Self::Skip => f.write_str("skip"),
            Self::If => f.write_str("if"),
            Self::Else => f.write_str("else"),
            Self::While => f.write_str("while"),
            Self::For => f.write_str("for"),
            Self::In => f.write_str("in"),
            Self::Break => f.write_str("break"),
            Self::Continue => f.write_str("continue"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Ident(name) => f.write_str(name),
            Self::Number(n) => write!(f, "{n}"),
            Self::To => f.write_str("->"),
            Self::Semicolon => f.write_str(";"),
            Self::Ellipses => f.write_str(".."),
            Self::Plus => f.write_str("+"),
            Self::Minus => f.write_str("-"),
            Self::Times => f.write_str("*"),
            Self::Divide => f.write_str("/"),
            Self::LParen => f.write_str("("),
            Self::RParen => f.write_str(")"),
            Self::LCurly => f.write_str("{"),
            Self::RCurly => f.write_str("}"),
            Self::LBrack => f.write_str("["),
            Self::RBrack => f.write_str("]"),
            Self::Assign => f.write_str(":="),
            Self::Equals => f.write_str("=="),
            Self::Less => f.write_str("<"),
            Self::Greater => f.write_str(">"),
        }
    }
}

/// A token together with the line it was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpannedTok {
    /// The token.
    pub tok: Tok,
    /// 1-indexed source line.
    pub line: usize,
}

fn keyword(word: &str) -> Option<Tok> {
    match word {
        "def" => Some(Tok::Def),
        "skip" => Some(Tok::Skip),
        "if" => Some(Tok::If),
        "else" => Some(Tok::Else),
        "while" => Some(Tok::While),
        "for" => Some(Tok::For),
        "in" => Some(Tok::In),
        "break" => Some(Tok::Break),
        "continue" => Some(Tok::Continue),
        "true" => Some(Tok::Bool(true)),
        "false" => Some(Tok::Bool(false)),
        _ => None,
    }
}

/// Tokenizes WHILE source text.
///
/// # Errors
///
/// Fails on characters outside the language's alphabet and on malformed
/// two-character operators (`:=`, `==`, `..`, `->`).
pub fn tokenize(source: &str) -> Result<Vec<SpannedTok>> {
    let mut tokens = Vec::new();
    let mut line = 1usize;
    let mut chars = source.chars().peekable();

    while let Some(c) = chars.next() {
        let tok = match c {
            '\n' => {
                line += 1;
                continue;
            }
            ' ' | '\t' | '\r' => continue,
            '#' => {
                while let Some(&next) = chars.peek() {
                    if next == '\n' {
                        break;
                    }
                    chars.next();
                }
                continue;
            }
            '+' => Tok::Plus,
            '*' => Tok::Times,
            '/' => Tok::Divide,
            ';' => Tok::Semicolon,
            '(' => Tok::LParen,
            ')' => Tok::RParen,
            '{' => Tok::LCurly,
            '}' => Tok::RCurly,
            '[' => Tok::LBrack,
            ']' => Tok::RBrack,
            '<' => Tok::Less,
            '>' => Tok::Greater,
            '-' => {
                if chars.peek() == Some(&'>') {
                    chars.next();
                    Tok::To
                } else {
                    Tok::Minus
                }
            }
            ':' => {
                if chars.peek() == Some(&'=') {
                    chars.next();
                    Tok::Assign
                } else {
                    bail!("Illegal character ':' at line {line}");
                }
            }
            '=' => {
                if chars.peek() == Some(&'=') {
                    chars.next();
                    Tok::Equals
                } else {
                    bail!("Illegal character '=' at line {line}");
                }
            }
            '.' => {
                if chars.peek() == Some(&'.') {
                    chars.next();
                    Tok::Ellipses
                } else {
                    bail!("Illegal character '.' at line {line}");
                }
            }
            c if c.is_ascii_digit() => {
                let mut value = i64::from(c as u8 - b'0');
                while let Some(&next) = chars.peek() {
                    if let Some(digit) = next.to_digit(10) {
                        chars.next();
                        value = match value
                            .checked_mul(10)
                            .and_then(|v| v.checked_add(i64::from(digit)))
                        {
                            Some(v) => v,
                            None => bail!("Number literal at line {line} is too large"),
                        };
                    } else {
                        break;
                    }
                }
                Tok::Number(value)
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut word = String::new();
                word.push(c);
                while let Some(&next) = chars.peek() {
                    if next.is_ascii_alphanumeric() || next == '_' {
                        word.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                keyword(&word).unwrap_or_else(|| Tok::Ident(Var::from(word)))
            }
            other => bail!("Illegal character '{other}' at line {line}"),
        };
        tokens.push(SpannedTok { tok, line });
    }

    Ok(tokens)
}
