//! Tokenizer for the rcsfile(5) grammar.
//!
//! Whitespace (ASCII space, tab, newline, carriage return, form feed)
//! separates tokens; `@...@` strings, `:`, and `;` are each a single
//! token. Identifiers (`id`) and numbers (`num`) are runs of
//! non-whitespace, non-delimiter bytes; which one a given run is depends on
//! context the grammar driver supplies (a bare digit-and-dot run is always
//! a valid `num`, but `num` is also a valid `id`).

use crate::error::ParseError;

/// Reserved keywords, matched by exact byte equality, that terminate a
/// `newphrase` name and begin an `admin`/`delta`/`deltatext` field.
pub const KEYWORDS: &[&[u8]] = &[
    b"access", b"author", b"branch", b"branches", b"comment", b"date",
    b"desc", b"expand", b"head", b"locks", b"log", b"next", b"state",
    b"strict", b"symbols", b"text",
];

/// True if `word` is one of the grammar's reserved keywords.
#[must_use]
pub fn is_keyword(word: &[u8]) -> bool {
    KEYWORDS.contains(&word)
}

fn is_whitespace(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | 0x0c)
}

/// True for the bytes rcsfile(5) permits in an unquoted `id` token, beyond
/// plain alphanumerics: `! # % & ' ( ) * + - / < = > ? [ \ ] ^ _ ` { | } ~`.
fn is_id_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric()
        || matches!(
            b,
            b'!' | b'#'
                | b'%'
                | b'&'
                | b'\''
                | b'('
                | b')'
                | b'*'
                | b'+'
                | b'-'
                | b'.'
                | b'/'
                | b'<'
                | b'='
                | b'>'
                | b'?'
                | b'['
                | b'\\'
                | b']'
                | b'^'
                | b'_'
                | b'`'
                | b'{'
                | b'|'
                | b'}'
                | b'~'
        )
}

/// A lexical token borrowed from the input.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Token<'a> {
    /// A bare word: an `id`, a `sym`, or a `num` (grammar context decides
    /// which is expected).
    Word(&'a [u8]),
    /// The raw bytes between an opening and closing `@`, `@@`
    /// un-doubled lazily by [`crate::value::RcsStr::decode`].
    Str(&'a [u8]),
    /// `:`
    Colon,
    /// `;`
    Semi,
}

/// Scans `input` token-by-token, tracking the byte offset of the most
/// recently returned token for error reporting.
pub struct Lexer<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Lexer<'a> {
    /// Builds a lexer over `input`.
    #[must_use]
    pub fn new(input: &'a [u8]) -> Self {
        Self { input, pos: 0 }
    }

    /// Current byte offset, for error reporting.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.pos
    }

    fn skip_whitespace(&mut self) {
        while self.pos < self.input.len() && is_whitespace(self.input[self.pos]) {
            self.pos += 1;
        }
    }

    /// Reads the next token, or `None` at end of input.
    pub fn next(&mut self) -> Result<Option<Token<'a>>, ParseError> {
        self.skip_whitespace();
        if self.pos >= self.input.len() {
            return Ok(None);
        }
        let start = self.pos;
        match self.input[self.pos] {
            b';' => {
                self.pos += 1;
                Ok(Some(Token::Semi))
            }
            b':' => {
                self.pos += 1;
                Ok(Some(Token::Colon))
            }
            b'@' => {
                self.pos += 1;
                let body_start = self.pos;
                loop {
                    let at = memchr::memchr(b'@', &self.input[self.pos..]).ok_or(
                        ParseError::UnterminatedString { offset: start },
                    )?;
                    self.pos += at + 1;
                    // A doubled "@@" is an escaped literal '@' inside the
                    // string; keep scanning past it. A single '@' closes
                    // the string.
                    if self.input.get(self.pos) == Some(&b'@') {
                        self.pos += 1;
                        continue;
                    }
                    break;
                }
                Ok(Some(Token::Str(&self.input[body_start..self.pos - 1])))
            }
            b if is_id_byte(b) => {
                while self.pos < self.input.len() && is_id_byte(self.input[self.pos]) {
                    self.pos += 1;
                }
                Ok(Some(Token::Word(&self.input[start..self.pos])))
            }
            _ => Err(ParseError::InvalidNum { offset: start }),
        }
    }

    /// Reads the next token, failing on end-of-input with `expected` in
    /// the error.
    pub fn expect_next(&mut self, expected: &'static str) -> Result<Token<'a>, ParseError> {
        self.next()?
            .ok_or(ParseError::UnexpectedEof { expected })
    }

    /// Reads the next token and requires it to be `;`.
    pub fn expect_semi(&mut self) -> Result<(), ParseError> {
        match self.expect_next("';'")? {
            Token::Semi => Ok(()),
            _ => Err(ParseError::ExpectedKeyword {
                expected: ";",
                offset: self.pos,
            }),
        }
    }

    /// Reads the next token and requires it to be the bare word `keyword`.
    pub fn expect_keyword(&mut self, keyword: &'static str) -> Result<(), ParseError> {
        match self.expect_next(keyword)? {
            Token::Word(word) if word == keyword.as_bytes() => Ok(()),
            _ => Err(ParseError::ExpectedKeyword {
                expected: keyword,
                offset: self.pos,
            }),
        }
    }

    /// Peeks the next token without consuming it.
    pub fn peek(&mut self) -> Result<Option<Token<'a>>, ParseError> {
        let saved = self.pos;
        let token = self.next()?;
        self.pos = saved;
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenizes_semicolons_and_words() {
        let mut lexer = Lexer::new(b"head\t1.1;");
        assert_eq!(lexer.next().unwrap(), Some(Token::Word(b"head")));
        assert_eq!(lexer.next().unwrap(), Some(Token::Word(b"1.1")));
        assert_eq!(lexer.next().unwrap(), Some(Token::Semi));
        assert_eq!(lexer.next().unwrap(), None);
    }

    #[test]
    fn unescapes_doubled_at_by_scanning_through() {
        let mut lexer = Lexer::new(b"@a@@b@;");
        assert_eq!(lexer.next().unwrap(), Some(Token::Str(b"a@@b")));
        assert_eq!(lexer.next().unwrap(), Some(Token::Semi));
    }

    #[test]
    fn unterminated_string_errors() {
        let mut lexer = Lexer::new(b"@abc");
        assert!(lexer.next().is_err());
    }
}
