//! The `rcsfile(5)` grammar driver: turns a lexer over `&'a [u8]` into an
//! [`RcsFile`].
//!
//! Grounded in `examples/original_source/common/rcslib.c`'s
//! `rcslib_parse_admin`/`rcslib_parse_delta`/`rcslib_parse_deltatext`. One
//! deliberate deviation from the C source (documented in `DESIGN.md`): this
//! parser disambiguates "end of `newphrase*`" from "start of the next
//! `num`-led section" by checking whether the peeked word parses cleanly as
//! an [`RcsNum`] (or matches a reserved keyword exactly), rather than
//! replicating the C lexer's incidental behavior where a `parse_id` call
//! fails on a token with no trailing non-digit character glued to it.

use crate::date::RcsDate;
use crate::error::ParseError;
use crate::file::{Admin, Lock, Revision, RcsFile, Symbol};
use crate::lex::{is_keyword, Lexer, Token};
use crate::num::RcsNum;
use crate::value::{RcsId, RcsStr};

/// Implementation ceiling on revision count (`spec.md` §9 open question).
pub const MAX_REVISIONS: usize = 1 << 24;

/// Parses a complete RCS `,v` file from `input`.
///
/// `input` must end with `\n`, matching `rcslib_init`'s check on the mapped
/// file's last byte.
pub fn parse(input: &[u8]) -> Result<RcsFile<'_>, ParseError> {
    if input.is_empty() || input[input.len() - 1] != b'\n' {
        return Err(ParseError::MissingTrailingNewline);
    }

    let mut lexer = Lexer::new(input);
    let admin = parse_admin(&mut lexer)?;
    let mut delta = parse_delta_section(&mut lexer)?;
    sort_revisions(&mut delta);
    let desc = parse_desc(&mut lexer)?;
    parse_deltatext_section(&mut lexer, &mut delta)?;
    resolve_next_links(&mut delta)?;

    Ok(RcsFile { admin, delta, desc })
}

/// True when the peeked word should terminate a `newphrase*` run: it is
/// either a reserved keyword or parses cleanly as a plain `num`.
fn ends_newphrases(word: &[u8]) -> bool {
    is_keyword(word) || RcsNum::parse(word).is_ok()
}

fn parse_admin<'a>(lexer: &mut Lexer<'a>) -> Result<Admin<'a>, ParseError> {
    lexer.expect_keyword("head")?;
    let head = parse_optional_num(lexer)?;
    lexer.expect_semi()?;

    let mut branch = None;
    if let Some(Token::Word(b"branch")) = lexer.peek()? {
        lexer.next()?;
        branch = parse_optional_num(lexer)?;
        lexer.expect_semi()?;
    }

    lexer.expect_keyword("access")?;
    let mut access = Vec::new();
    loop {
        match lexer.expect_next("access id or ';'")? {
            Token::Semi => break,
            Token::Word(word) => access.push(RcsId::new(word)),
            _ => {
                return Err(ParseError::ExpectedKeyword {
                    expected: "access id",
                    offset: lexer.offset(),
                })
            }
        }
    }
    access.sort();

    lexer.expect_keyword("symbols")?;
    let mut symbols = Vec::new();
    loop {
        match lexer.expect_next("symbol or ';'")? {
            Token::Semi => break,
            Token::Word(sym) => {
                lexer.expect_next(":")
                    .and_then(|t| match t {
                        Token::Colon => Ok(()),
                        _ => Err(ParseError::ExpectedKeyword {
                            expected: ":",
                            offset: lexer.offset(),
                        }),
                    })?;
                let num = parse_num(lexer)?;
                symbols.push(Symbol {
                    sym: RcsId::new(sym),
                    num,
                });
            }
            _ => {
                return Err(ParseError::ExpectedKeyword {
                    expected: "symbol",
                    offset: lexer.offset(),
                })
            }
        }
    }
    symbols.sort_by(|a, b| a.sym.cmp(&b.sym).then_with(|| a.num.cmp(&b.num)));

    lexer.expect_keyword("locks")?;
    let mut locks = Vec::new();
    loop {
        match lexer.expect_next("lock id or ';'")? {
            Token::Semi => break,
            Token::Word(id) => {
                lexer.expect_next(":")
                    .and_then(|t| match t {
                        Token::Colon => Ok(()),
                        _ => Err(ParseError::ExpectedKeyword {
                            expected: ":",
                            offset: lexer.offset(),
                        }),
                    })?;
                let num = parse_num(lexer)?;
                locks.push(Lock {
                    id: RcsId::new(id),
                    num,
                });
            }
            _ => {
                return Err(ParseError::ExpectedKeyword {
                    expected: "lock id",
                    offset: lexer.offset(),
                })
            }
        }
    }
    locks.sort_by(|a, b| a.id.cmp(&b.id).then_with(|| a.num.cmp(&b.num)));

    let mut strict = false;
    if let Some(Token::Word(b"strict")) = lexer.peek()? {
        lexer.next()?;
        lexer.expect_semi()?;
        strict = true;
    }

    let mut comment = None;
    if let Some(Token::Word(b"comment")) = lexer.peek()? {
        lexer.next()?;
        comment = parse_optional_string(lexer)?;
        lexer.expect_semi()?;
    }

    let mut expand = None;
    if let Some(Token::Word(b"expand")) = lexer.peek()? {
        lexer.next()?;
        expand = parse_optional_string(lexer)?;
        lexer.expect_semi()?;
    }

    skip_newphrases(lexer)?;

    Ok(Admin {
        head,
        branch,
        access,
        symbols,
        locks,
        strict,
        comment,
        expand,
    })
}

fn parse_delta_section<'a>(lexer: &mut Lexer<'a>) -> Result<Vec<Revision<'a>>, ParseError> {
    let mut delta = Vec::new();
    loop {
        let Some(Token::Word(word)) = lexer.peek()? else {
            break;
        };
        if is_keyword(word) {
            break;
        }
        let Ok(num) = RcsNum::parse(word) else {
            break;
        };
        lexer.next()?;

        lexer.expect_keyword("date")?;
        let date_word = match lexer.expect_next("date")? {
            Token::Word(w) => w,
            _ => {
                return Err(ParseError::ExpectedKeyword {
                    expected: "date",
                    offset: lexer.offset(),
                })
            }
        };
        let date = RcsDate::parse(date_word)?;
        lexer.expect_semi()?;

        lexer.expect_keyword("author")?;
        let author = expect_word(lexer, "author id")?;
        lexer.expect_semi()?;

        lexer.expect_keyword("state")?;
        let state = if let Some(Token::Word(w)) = lexer.peek()? {
            lexer.next()?;
            Some(RcsId::new(w))
        } else {
            None
        };
        lexer.expect_semi()?;

        lexer.expect_keyword("branches")?;
        let mut branches = Vec::new();
        loop {
            match lexer.expect_next("branch num or ';'")? {
                Token::Semi => break,
                Token::Word(w) => branches.push(RcsNum::parse(w)?),
                _ => {
                    return Err(ParseError::ExpectedKeyword {
                        expected: "branch num",
                        offset: lexer.offset(),
                    })
                }
            }
        }

        lexer.expect_keyword("next")?;
        let next = parse_optional_num(lexer)?;
        lexer.expect_semi()?;

        skip_newphrases(lexer)?;

        delta.push(Revision {
            num,
            date,
            author: RcsId::new(author),
            state,
            branches,
            next,
            log: None,
            text: None,
            next_index: None,
            branch_indices: Vec::new(),
            deltatext_present: false,
        });

        if delta.len() > MAX_REVISIONS {
            return Err(ParseError::TooManyRevisions {
                count: delta.len(),
                max: MAX_REVISIONS,
            });
        }
    }
    Ok(delta)
}

fn parse_desc<'a>(lexer: &mut Lexer<'a>) -> Result<RcsStr<'a>, ParseError> {
    lexer.expect_keyword("desc")?;
    parse_string(lexer)
}

fn parse_deltatext_section<'a>(
    lexer: &mut Lexer<'a>,
    delta: &mut [Revision<'a>],
) -> Result<(), ParseError> {
    if delta.is_empty() {
        return Ok(());
    }
    while lexer.peek()?.is_some() {
        let num = parse_num(lexer)?;
        let index = delta
            .iter()
            .position(|rev| rev.num == num)
            .ok_or_else(|| ParseError::UnknownDeltatextRevision(num.to_string()))?;

        lexer.expect_keyword("log")?;
        let log = parse_string(lexer)?;

        skip_newphrases(lexer)?;

        lexer.expect_keyword("text")?;
        let text = parse_string(lexer)?;

        let rev = &mut delta[index];
        rev.log = Some(log);
        rev.text = Some(text);
        rev.deltatext_present = true;
    }
    Ok(())
}

/// Second pass over a sorted, deltatext-filled `delta`: verifies every
/// revision received its deltatext and resolves each `next` reference to
/// its index in `delta`, trying the immediately following slot first
/// (the common case, since `next` usually names the adjacent revision in
/// delta order) before falling back to a linear search.
fn resolve_next_links(delta: &mut [Revision<'_>]) -> Result<(), ParseError> {
    for rev in delta.iter() {
        if !rev.deltatext_present {
            return Err(ParseError::UnknownDeltatextRevision(rev.num.to_string()));
        }
    }

    for i in 0..delta.len() {
        if let Some(target) = delta[i].next.clone() {
            let found = if i + 1 < delta.len() && delta[i + 1].num == target {
                Some(i + 1)
            } else {
                delta.iter().position(|rev| rev.num == target)
            };
            let index = found.ok_or_else(|| ParseError::UnresolvedNext {
                child: delta[i].num.to_string(),
                target: target.to_string(),
            })?;
            delta[i].next_index = Some(index);
        }

        let branches = delta[i].branches.clone();
        let mut branch_indices = Vec::with_capacity(branches.len());
        for target in &branches {
            let index = delta
                .iter()
                .position(|rev| &rev.num == target)
                .ok_or_else(|| ParseError::UnresolvedNext {
                    child: delta[i].num.to_string(),
                    target: target.to_string(),
                })?;
            branch_indices.push(index);
        }
        delta[i].branch_indices = branch_indices;
    }
    Ok(())
}

/// Sorts `delta` descending by [`RcsNum`] ordering, skipping the sort when
/// the input is already in order (mirrors `rcslib_sort_revision`'s
/// adjacent-pair check).
fn sort_revisions(delta: &mut [Revision<'_>]) {
    let already_sorted = delta
        .windows(2)
        .all(|pair| pair[0].num.cmp(&pair[1].num) == std::cmp::Ordering::Less);
    if !already_sorted {
        delta.sort_by(|a, b| a.num.cmp(&b.num));
    }
}

fn parse_num(lexer: &mut Lexer<'_>) -> Result<RcsNum, ParseError> {
    match lexer.expect_next("revision number")? {
        Token::Word(word) => RcsNum::parse(word),
        _ => Err(ParseError::ExpectedKeyword {
            expected: "revision number",
            offset: lexer.offset(),
        }),
    }
}

fn parse_optional_num(lexer: &mut Lexer<'_>) -> Result<Option<RcsNum>, ParseError> {
    match lexer.peek()? {
        Some(Token::Word(word)) => match RcsNum::parse(word) {
            Ok(num) => {
                lexer.next()?;
                Ok(Some(num))
            }
            Err(_) => Ok(None),
        },
        _ => Ok(None),
    }
}

fn parse_string<'a>(lexer: &mut Lexer<'a>) -> Result<RcsStr<'a>, ParseError> {
    match lexer.expect_next("string")? {
        Token::Str(raw) => Ok(RcsStr::from_raw(raw)),
        _ => Err(ParseError::ExpectedKeyword {
            expected: "string",
            offset: lexer.offset(),
        }),
    }
}

fn parse_optional_string<'a>(lexer: &mut Lexer<'a>) -> Result<Option<RcsStr<'a>>, ParseError> {
    match lexer.peek()? {
        Some(Token::Str(_)) => Ok(Some(parse_string(lexer)?)),
        _ => Ok(None),
    }
}

fn expect_word<'a>(lexer: &mut Lexer<'a>, what: &'static str) -> Result<&'a [u8], ParseError> {
    match lexer.expect_next(what)? {
        Token::Word(word) => Ok(word),
        _ => Err(ParseError::ExpectedKeyword {
            expected: what,
            offset: lexer.offset(),
        }),
    }
}

/// Consumes zero or more `newphrase`s, stopping (without consuming) at a
/// token that [`ends_newphrases`] identifies as the next known section.
fn skip_newphrases(lexer: &mut Lexer<'_>) -> Result<(), ParseError> {
    loop {
        match lexer.peek()? {
            Some(Token::Word(word)) if !ends_newphrases(word) => {
                lexer.next()?;
                loop {
                    match lexer.expect_next("newphrase word or ';'")? {
                        Token::Semi => break,
                        Token::Word(_) | Token::Str(_) | Token::Colon => continue,
                    }
                }
            }
            _ => return Ok(()),
        }
    }
}
