//! `cvsyncd.conf` parsing: a small hand-rolled line/token lexer, grounded in
//! `examples/original_source/cvsyncd/config.c`'s directive set and
//! `examples/original_source/common/token.c`'s whitespace/comment/quote
//! conventions (`spec.md` §6 declares the file format itself out of scope;
//! this module supplies the in-scope data model those directives populate —
//! `cvsync_core::Collection`).
//!
//! Grammar: one directive per logical line, `#` starts a comment that runs
//! to end of line, fields are whitespace-separated with optional
//! double-quoting for values containing spaces. Global directives appear
//! before any `collection` block; each `collection <name> { ... }` block
//! holds its own directives and is closed with a bare `}` line.

use std::sync::Arc;

use cvsync_core::{Collection, ErrorMode, Pathname, Release};

use crate::error::ConfigError;

/// Default TCP port (`spec.md` §6).
pub const DEFAULT_PORT: u16 = 7777;

/// Default per-blocked-side session timeout, in seconds (`spec.md` §5).
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Global directives that apply to the whole daemon instance.
#[derive(Clone, Debug)]
pub struct GlobalConfig {
    /// TCP port to listen on.
    pub port: u16,
    /// Maximum simultaneous non-`ALWAYS` connections, or `None` for
    /// unlimited.
    pub maxclients: Option<u32>,
    /// Default permission mask applied to collections that don't override
    /// it.
    pub umask: u16,
    /// Session timeout, in seconds, applied to a blocked mux side.
    pub timeout_secs: u64,
    /// Default ACL file path, overridable per collection.
    pub access_file: Option<String>,
    /// Base directory collection prefixes are resolved relative to.
    pub base: Option<String>,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            maxclients: None,
            umask: 0,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            access_file: None,
            base: None,
        }
    }
}

/// A fully parsed daemon configuration: global directives plus the ordered
/// list of collections they govern.
#[derive(Clone, Debug, Default)]
pub struct DaemonConfig {
    /// Directives outside any `collection` block.
    pub global: GlobalConfig,
    /// Collections in file order; a collection's `super` may only name one
    /// defined earlier in the file.
    pub collections: Vec<Arc<Collection>>,
}

impl DaemonConfig {
    /// Looks up a collection by its advertised name.
    #[must_use]
    pub fn collection(&self, name: &[u8]) -> Option<&Arc<Collection>> {
        self.collections.iter().find(|c| c.name == name)
    }

    /// Parses a complete configuration file.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let lines = tokenize(contents);
        let mut global = GlobalConfig::default();
        let mut collections: Vec<Arc<Collection>> = Vec::new();

        let mut index = 0;
        while index < lines.len() {
            let (line_no, words) = &lines[index];
            index += 1;
            let Some((keyword, args)) = words.split_first() else {
                continue;
            };

            match keyword.as_str() {
                "port" => global.port = parse_u16(*line_no, "port", args)?,
                "maxclients" => global.maxclients = Some(parse_u32(*line_no, "maxclients", args)?),
                "umask" => global.umask = parse_u16(*line_no, "umask", args)?,
                "timeout" => global.timeout_secs = u64::from(parse_u32(*line_no, "timeout", args)?),
                "access" => global.access_file = Some(require_arg(*line_no, "access", args)?.to_string()),
                "base" => global.base = Some(require_arg(*line_no, "base", args)?.to_string()),
                "collection" => {
                    let name = require_arg(*line_no, "collection", args)?.to_string();
                    let block_end = find_block_end(&lines, index, *line_no)?;
                    let collection = parse_collection(name, &lines[index..block_end], &collections, &global)?;
                    collections.push(Arc::new(collection));
                    index = block_end + 1;
                }
                other => {
                    return Err(ConfigError::UnknownDirective {
                        line: *line_no,
                        keyword: other.to_string(),
                    })
                }
            }
        }

        Ok(Self { global, collections })
    }
}

fn find_block_end(
    lines: &[(usize, Vec<String>)],
    start: usize,
    opened_at: usize,
) -> Result<usize, ConfigError> {
    for (offset, (_, words)) in lines[start..].iter().enumerate() {
        if words.len() == 1 && words[0] == "}" {
            return Ok(start + offset);
        }
    }
    Err(ConfigError::UnterminatedBlock { line: opened_at })
}

fn parse_collection(
    name: String,
    body: &[(usize, Vec<String>)],
    already_defined: &[Arc<Collection>],
    global: &GlobalConfig,
) -> Result<Collection, ConfigError> {
    let mut release = Release::Rcs;
    let mut prefix: Option<String> = None;
    let mut rprefix: Option<String> = None;
    let mut umask = global.umask;
    let mut errormode = ErrorMode::Abort;
    let mut symfollow = true;
    let mut scan_path: Option<String> = None;
    let mut dist_path: Option<String> = None;
    let mut super_name: Option<String> = None;

    for (line_no, words) in body {
        let Some((keyword, args)) = words.split_first() else {
            continue;
        };
        match keyword.as_str() {
            "release" => {
                let value = require_arg(*line_no, "release", args)?;
                release = Release::parse(value.as_bytes()).ok_or_else(|| ConfigError::UnknownRelease {
                    line: *line_no,
                    value: value.to_string(),
                })?;
            }
            "prefix" => prefix = Some(require_arg(*line_no, "prefix", args)?.to_string()),
            "rprefix" => rprefix = Some(require_arg(*line_no, "rprefix", args)?.to_string()),
            "umask" => umask = parse_u16(*line_no, "umask", args)?,
            "errormode" => {
                let value = require_arg(*line_no, "errormode", args)?;
                errormode = match value.as_str() {
                    "abort" => ErrorMode::Abort,
                    "fixup" => ErrorMode::Fixup,
                    other => {
                        return Err(ConfigError::UnknownDirective {
                            line: *line_no,
                            keyword: format!("errormode {other}"),
                        })
                    }
                };
            }
            "nofollow" => symfollow = false,
            "scanfile" => scan_path = Some(require_arg(*line_no, "scanfile", args)?.to_string()),
            "distfile" => dist_path = Some(require_arg(*line_no, "distfile", args)?.to_string()),
            "super" => super_name = Some(require_arg(*line_no, "super", args)?.to_string()),
            "comment" => { /* free-form, not modeled */ }
            other => {
                return Err(ConfigError::UnknownDirective {
                    line: *line_no,
                    keyword: other.to_string(),
                })
            }
        }
    }

    let prefix = prefix.ok_or_else(|| ConfigError::MissingPrefix { name: name.clone() })?;
    let mut collection = Collection::new(
        name.clone().into_bytes(),
        release,
        Pathname::new(prefix.into_bytes()).map_err(|_| ConfigError::MissingPrefix { name: name.clone() })?,
        umask,
    );
    collection.errormode = errormode;
    collection.symfollow = symfollow;
    if let Some(rprefix) = rprefix {
        collection.rprefix = Pathname::new(rprefix.into_bytes()).ok();
    }
    if let Some(scan_path) = scan_path {
        collection.scan_path = Pathname::new(scan_path.into_bytes()).ok();
    }
    if let Some(dist_path) = dist_path {
        collection.dist_path = Pathname::new(dist_path.into_bytes()).ok();
    }
    if let Some(parent_name) = super_name {
        let parent = already_defined
            .iter()
            .find(|c| c.name == parent_name.as_bytes())
            .cloned()
            .ok_or_else(|| ConfigError::UnknownSuper {
                name: name.clone(),
                parent: parent_name.clone(),
            })?;
        collection.super_collection = Some(parent);
    }

    Ok(collection)
}

fn require_arg<'a>(line: usize, directive: &str, args: &'a [String]) -> Result<&'a String, ConfigError> {
    args.first().ok_or_else(|| ConfigError::MissingArgument {
        line,
        directive: directive.to_string(),
    })
}

fn parse_u16(line: usize, directive: &str, args: &[String]) -> Result<u16, ConfigError> {
    let value = require_arg(line, directive, args)?;
    parse_number(value).ok_or_else(|| ConfigError::InvalidNumber {
        line,
        directive: directive.to_string(),
        value: value.clone(),
    })
}

fn parse_u32(line: usize, directive: &str, args: &[String]) -> Result<u32, ConfigError> {
    let value = require_arg(line, directive, args)?;
    value.parse().map_err(|_| ConfigError::InvalidNumber {
        line,
        directive: directive.to_string(),
        value: value.clone(),
    })
}

/// Parses a decimal or `0`-prefixed octal number, mirroring `token.c`'s
/// number handling for `umask`-shaped directives.
fn parse_number(value: &str) -> Option<u16> {
    if let Some(octal) = value.strip_prefix('0') {
        if octal.is_empty() {
            return Some(0);
        }
        return u16::from_str_radix(octal, 8).ok();
    }
    value.parse().ok()
}

/// Tokenizes `contents` into `(line_number, words)` pairs, stripping
/// comments and quoting. A brace on its own line is preserved as a
/// single-word line so [`find_block_end`] can locate it.
fn tokenize(contents: &str) -> Vec<(usize, Vec<String>)> {
    let mut lines = Vec::new();
    for (index, raw_line) in contents.lines().enumerate() {
        let line_no = index + 1;
        let without_comment = match raw_line.find('#') {
            Some(pos) => &raw_line[..pos],
            None => raw_line,
        };
        let words = split_words(without_comment);
        if words.is_empty() {
            continue;
        }
        lines.push((line_no, words));
    }
    lines
}

fn split_words(line: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut chars = line.chars().peekable();
    let mut current = String::new();
    let mut in_quotes = false;

    while let Some(c) = chars.next() {
        match c {
            '"' => in_quotes = !in_quotes,
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    words.push(std::mem::take(&mut current));
                }
            }
            '{' | '}' if !in_quotes => {
                if !current.is_empty() {
                    words.push(std::mem::take(&mut current));
                }
                words.push(c.to_string());
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_global_directives() {
        let config = DaemonConfig::parse("port 7777\nmaxclients 10\numask 022\n").unwrap();
        assert_eq!(config.global.port, 7777);
        assert_eq!(config.global.maxclients, Some(10));
        assert_eq!(config.global.umask, 0o22);
    }

    #[test]
    fn parses_a_collection_block() {
        let config = DaemonConfig::parse(
            "collection example {\n    release rcs\n    prefix /srv/example\n    umask 022\n}\n",
        )
        .unwrap();
        assert_eq!(config.collections.len(), 1);
        let collection = &config.collections[0];
        assert_eq!(collection.name, b"example");
        assert_eq!(collection.release, Release::Rcs);
        assert_eq!(collection.prefix.as_bytes(), b"/srv/example");
    }

    #[test]
    fn super_collection_resolves_to_an_earlier_block() {
        let config = DaemonConfig::parse(
            "collection parent {\n    release rcs\n    prefix /srv\n}\ncollection child {\n    release rcs\n    prefix sub\n    super parent\n}\n",
        )
        .unwrap();
        let child = config.collection(b"child").unwrap();
        assert!(child.super_collection.is_some());
        assert_eq!(child.effective_prefix().as_bytes(), b"/srv/sub");
    }

    #[test]
    fn unknown_directive_is_rejected() {
        assert!(matches!(
            DaemonConfig::parse("bogus 1\n"),
            Err(ConfigError::UnknownDirective { .. })
        ));
    }

    #[test]
    fn missing_prefix_is_rejected() {
        let result = DaemonConfig::parse("collection x {\n    release rcs\n}\n");
        assert!(matches!(result, Err(ConfigError::MissingPrefix { .. })));
    }

    #[test]
    fn unterminated_block_is_rejected() {
        assert!(matches!(
            DaemonConfig::parse("collection x {\n    release rcs\n"),
            Err(ConfigError::UnterminatedBlock { .. })
        ));
    }

    #[test]
    fn comments_and_quoted_values_are_handled() {
        let config = DaemonConfig::parse(
            "# a comment\ncollection \"my example\" {\n    release list\n    prefix /x # trailing comment\n}\n",
        )
        .unwrap();
        assert_eq!(config.collections[0].name, b"my example");
    }
}
