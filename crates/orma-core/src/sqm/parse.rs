//! Interprets query strings into the object-query model.

mod lexer;
use lexer::Lexer;

mod parser;
use parser::Parser;

use super::SqmStatement;
use crate::{schema::Metamodel, Result};

use std::fmt;

/// Options controlling how query strings are interpreted.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseOptions {
    /// Reject extensions beyond the JPQL standard: aliased fetch joins,
    /// `limit` / `offset`, and queries without a select clause.
    pub strict_compliance: bool,
}

/// Parses an HQL string, resolving every entity, attribute, and alias
/// against `metamodel`.
pub fn parse_hql(metamodel: &Metamodel, hql: &str, options: ParseOptions) -> Result<SqmStatement> {
    let tokens = Lexer::new(hql).tokenize()?;
    Parser::new(metamodel, tokens, hql.len(), options).parse_statement()
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    /// Identifier or keyword; keywords are matched case-insensitively
    Ident(String),
    Int(i64),
    Float(f64),
    Str(String),
    NamedParam(String),
    PositionalParam(usize),
    Punct(Punct),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Punct {
    Comma,
    Dot,
    LParen,
    RParen,
    Plus,
    Minus,
    Star,
    Slash,
    Concat,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug)]
struct Spanned {
    token: Token,

    /// Byte offset of the token in the query string
    pos: usize,
}

impl Token {
    fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self, Token::Ident(ident) if ident.eq_ignore_ascii_case(keyword))
    }
}

impl From<Punct> for Token {
    fn from(value: Punct) -> Self {
        Token::Punct(value)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Ident(ident) => write!(f, "`{ident}`"),
            Token::Int(value) => write!(f, "`{value}`"),
            Token::Float(value) => write!(f, "`{value}`"),
            Token::Str(value) => write!(f, "'{value}'"),
            Token::NamedParam(name) => write!(f, "`:{name}`"),
            Token::PositionalParam(position) => write!(f, "`?{position}`"),
            Token::Punct(punct) => write!(f, "`{punct}`"),
        }
    }
}

impl fmt::Display for Punct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Punct::Comma => ",",
            Punct::Dot => ".",
            Punct::LParen => "(",
            Punct::RParen => ")",
            Punct::Plus => "+",
            Punct::Minus => "-",
            Punct::Star => "*",
            Punct::Slash => "/",
            Punct::Concat => "||",
            Punct::Eq => "=",
            Punct::Ne => "<>",
            Punct::Lt => "<",
            Punct::Le => "<=",
            Punct::Gt => ">",
            Punct::Ge => ">=",
        })
    }
}
