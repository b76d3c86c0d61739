use super::{Punct, Spanned, Token};
use crate::{Error, Result};

pub(super) struct Lexer<'a> {
    src: &'a str,

    /// Byte offset of `src` within the original input
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub(super) fn new(src: &'a str) -> Lexer<'a> {
        Lexer { src, pos: 0 }
    }

    pub(super) fn tokenize(mut self) -> Result<Vec<Spanned>> {
        let mut tokens = vec![];

        while let Some(token) = self.next()? {
            tokens.push(token);
        }

        Ok(tokens)
    }

    fn next(&mut self) -> Result<Option<Spanned>> {
        self.skip_whitespace();

        let pos = self.pos;

        let Some(ch) = self.try_next_char() else {
            return Ok(None);
        };

        let token = match ch {
            ',' => Punct::Comma.into(),
            '.' => Punct::Dot.into(),
            '(' => Punct::LParen.into(),
            ')' => Punct::RParen.into(),
            '+' => Punct::Plus.into(),
            '-' => Punct::Minus.into(),
            '*' => Punct::Star.into(),
            '/' => Punct::Slash.into(),
            '=' => Punct::Eq.into(),
            '<' => match self.peek_char() {
                Some('=') => {
                    self.consume(1);
                    Punct::Le.into()
                }
                Some('>') => {
                    self.consume(1);
                    Punct::Ne.into()
                }
                _ => Punct::Lt.into(),
            },
            '>' => match self.peek_char() {
                Some('=') => {
                    self.consume(1);
                    Punct::Ge.into()
                }
                _ => Punct::Gt.into(),
            },
            '!' if self.peek_char() == Some('=') => {
                self.consume(1);
                Punct::Ne.into()
            }
            '|' if self.peek_char() == Some('|') => {
                self.consume(1);
                Punct::Concat.into()
            }
            ':' => {
                let name = self.take_while(ident_ch);
                if name.is_empty() {
                    return Err(unexpected(pos, "expected parameter name after `:`"));
                }
                Token::NamedParam(name)
            }
            '?' => {
                let digits = self.take_while(|ch| ch.is_ascii_digit());
                if digits.is_empty() {
                    return Err(unexpected(pos, "expected parameter position after `?`"));
                }
                match digits.parse() {
                    Ok(position) => Token::PositionalParam(position),
                    Err(_) => return Err(unexpected(pos, "parameter position out of range")),
                }
            }
            '\'' => Token::Str(self.string_literal(pos)?),
            ch if ch.is_ascii_digit() => {
                let mut digits = String::from(ch);
                digits.push_str(&self.take_while(|ch| ch.is_ascii_digit()));

                if self.peek_char() == Some('.')
                    && self.peek_char_n(1).is_some_and(|ch| ch.is_ascii_digit())
                {
                    self.consume(1);
                    digits.push('.');
                    digits.push_str(&self.take_while(|ch| ch.is_ascii_digit()));

                    match digits.parse() {
                        Ok(value) => Token::Float(value),
                        Err(_) => return Err(unexpected(pos, "invalid float literal")),
                    }
                } else {
                    match digits.parse() {
                        Ok(value) => Token::Int(value),
                        Err(_) => return Err(unexpected(pos, "integer literal out of range")),
                    }
                }
            }
            ch if ch.is_alphabetic() || ch == '_' => {
                let mut ident = String::from(ch);
                ident.push_str(&self.take_while(ident_ch));
                Token::Ident(ident)
            }
            ch => return Err(unexpected(pos, &format!("unexpected character `{ch}`"))),
        };

        Ok(Some(Spanned { token, pos }))
    }

    /// Reads a single-quoted literal; `''` is an escaped quote.
    fn string_literal(&mut self, start: usize) -> Result<String> {
        let mut s = String::new();

        loop {
            match self.try_next_char() {
                Some('\'') if self.peek_char() == Some('\'') => {
                    self.consume(1);
                    s.push('\'');
                }
                Some('\'') => return Ok(s),
                Some(ch) => s.push(ch),
                None => return Err(unexpected(start, "unterminated string literal")),
            }
        }
    }

    fn try_next_char(&mut self) -> Option<char> {
        let ch = self.src.chars().next()?;
        self.consume(ch.len_utf8());
        Some(ch)
    }

    fn peek_char(&self) -> Option<char> {
        self.peek_char_n(0)
    }

    fn peek_char_n(&self, n: usize) -> Option<char> {
        self.src.chars().nth(n)
    }

    fn take_while(&mut self, predicate: impl Fn(char) -> bool) -> String {
        let mut s = String::new();
        while let Some(ch) = self.peek_char() {
            if !predicate(ch) {
                break;
            }
            self.consume(ch.len_utf8());
            s.push(ch);
        }
        s
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek_char() {
            if !ch.is_whitespace() {
                return;
            }
            self.consume(ch.len_utf8());
        }
    }

    fn consume(&mut self, amount: usize) {
        let (_, src) = self.src.split_at(amount);
        self.src = src;
        self.pos += amount;
    }
}

fn ident_ch(ch: char) -> bool {
    ch == '_' || ch.is_alphanumeric()
}

fn unexpected(pos: usize, message: &str) -> Error {
    Error::invalid_statement(format!("{message} at position {pos}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(src: &str) -> Vec<Token> {
        Lexer::new(src)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|spanned| spanned.token)
            .collect()
    }

    #[test]
    fn lexes_operators_and_params() {
        assert_eq!(
            lex("i.id <> :id and x >= ?1"),
            vec![
                Token::Ident("i".into()),
                Punct::Dot.into(),
                Token::Ident("id".into()),
                Punct::Ne.into(),
                Token::NamedParam("id".into()),
                Token::Ident("and".into()),
                Token::Ident("x".into()),
                Punct::Ge.into(),
                Token::PositionalParam(1),
            ]
        );
    }

    #[test]
    fn lexes_literals() {
        assert_eq!(
            lex("'it''s' 42 1.5"),
            vec![
                Token::Str("it's".into()),
                Token::Int(42),
                Token::Float(1.5)
            ]
        );
    }

    #[test]
    fn reports_position() {
        let err = Lexer::new("select #").tokenize().unwrap_err();
        assert!(err.is_invalid_statement());
        assert!(err.to_string().contains("position 7"), "{err}");
    }

    #[test]
    fn positional_param_out_of_range() {
        let err = Lexer::new("x = ?99999999999999999999999").tokenize().unwrap_err();
        assert!(err.is_invalid_statement());
        assert!(err.to_string().contains("position 4"), "{err}");
    }

    #[test]
    fn unterminated_string() {
        let err = Lexer::new("'abc").tokenize().unwrap_err();
        assert!(err.to_string().contains("unterminated"));
    }
}
