//! ACL file parsing: `(verb, pattern)` lines, grounded in
//! `examples/original_source/cvsyncd/access.c`'s `access_parse`/
//! `access_parse_allow`/`access_parse_always`/`access_parse_deny`/
//! `access_parse_address`/`access_parse_hostname`/`access_parse_number`.

use crate::address::AddressMatcher;
use crate::error::AccessError;
use crate::rule::{AclRule, Verb};

/// The per-rule (and shared `,max`) count ceiling `access_parse_number`
/// enforces (`"restricted to 1000"`).
const MAX_COUNT: u32 = 1000;

/// Parses a complete ACL file: one `(verb, pattern)` entry per
/// non-blank line.
pub fn parse(contents: &str) -> Result<Vec<AclRule>, AccessError> {
    let mut rules = Vec::new();
    for (index, raw_line) in contents.lines().enumerate() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }
        let line_no = index + 1;
        rules.push(parse_line(line, line_no)?);
    }
    Ok(rules)
}

fn parse_line(line: &str, line_no: usize) -> Result<AclRule, AccessError> {
    let mut parts = line.splitn(2, char::is_whitespace);
    let verb_token = parts.next().unwrap_or_default();
    let pattern = parts
        .next()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or(AccessError::MissingPattern { line: line_no })?;

    let verb = match verb_token {
        "allow" | "permit" => Verb::Allow,
        "always" => Verb::Always,
        "deny" | "reject" => Verb::Deny,
        other => {
            return Err(AccessError::UnknownVerb {
                line: line_no,
                verb: other.to_string(),
            })
        }
    };

    match verb {
        Verb::Allow => {
            let (address_part, max) = match pattern.split_once(',') {
                Some((addr, max_text)) => {
                    let max = parse_count(max_text, line_no)?;
                    (addr, Some(max))
                }
                None => (pattern, None),
            };
            let matcher = parse_address_or_hostname(address_part, line_no)?;
            Ok(AclRule {
                verb,
                matcher,
                max,
            })
        }
        Verb::Always | Verb::Deny => {
            let matcher = parse_address_or_hostname(pattern, line_no)?;
            Ok(AclRule {
                verb,
                matcher,
                max: None,
            })
        }
    }
}

fn parse_count(text: &str, line_no: usize) -> Result<u32, AccessError> {
    let value: u32 = text.parse().map_err(|_| AccessError::InvalidMax {
        line: line_no,
        value: text.to_string(),
    })?;
    if value > MAX_COUNT {
        return Err(AccessError::InvalidMax {
            line: line_no,
            value: text.to_string(),
        });
    }
    Ok(value)
}

fn parse_address_or_hostname(
    address_part: &str,
    line_no: usize,
) -> Result<AddressMatcher, AccessError> {
    if let Some((addr, prefix_text)) = address_part.split_once('/') {
        let prefix = parse_count(prefix_text, line_no)?;
        return AddressMatcher::parse(addr, Some(prefix)).map_err(|()| {
            AccessError::InvalidPattern {
                line: line_no,
                pattern: address_part.to_string(),
            }
        });
    }

    if let Ok(matcher) = AddressMatcher::parse(address_part, None) {
        return Ok(matcher);
    }

    if looks_like_hostname(address_part) {
        return AddressMatcher::hostname(address_part).map_err(|source| {
            AccessError::InvalidHostnamePattern {
                line: line_no,
                source,
            }
        });
    }

    Err(AccessError::InvalidPattern {
        line: line_no,
        pattern: address_part.to_string(),
    })
}

/// Mirrors `access_parse_hostname`'s guard: a pattern ending in a digit or
/// containing `:` is assumed to be a malformed address rather than a
/// hostname, and rejected instead of silently treated as a glob.
fn looks_like_hostname(pattern: &str) -> bool {
    !pattern.contains(':') && !pattern.ends_with(|c: char| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_allow_with_prefix_and_max() {
        let rules = parse("allow 10.0.0.0/8,2\n").unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].verb, Verb::Allow);
        assert_eq!(rules[0].max, Some(2));
    }

    #[test]
    fn parses_always_without_max() {
        let rules = parse("always 127.0.0.1\n").unwrap();
        assert_eq!(rules[0].verb, Verb::Always);
        assert_eq!(rules[0].max, None);
    }

    #[test]
    fn parses_deny_hostname_glob() {
        let rules = parse("deny *.untrusted.example\n").unwrap();
        assert_eq!(rules[0].verb, Verb::Deny);
    }

    #[test]
    fn rejects_unknown_verb() {
        assert!(parse("block 1.2.3.4\n").is_err());
    }

    #[test]
    fn rejects_max_over_ceiling() {
        assert!(parse("allow 10.0.0.0/8,1001\n").is_err());
    }

    #[test]
    fn ignores_blank_lines() {
        let rules = parse("\nallow 1.2.3.4\n\n").unwrap();
        assert_eq!(rules.len(), 1);
    }
}
