//! Regex bridge: pattern compilation, matching, substitution splicing and
//! `split`, on top of the `regex` crate.
//!
//! Patterns are compiled once per `(pattern, flags)` pair and cached. A
//! pattern that fails to compile is cached as a failure too and simply never
//! matches.
//!
//! Only the inline flags `i`, `m`, `s` and `x` change compilation; `g` is
//! interpreted by the caller.

use regex::{Captures, Regex};
use rustc_hash::FxHashMap;

use camel_value::Value;

/// One successful match.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MatchData {
    /// `$&`
    pub matched: String,
    /// `$1..$N`; `None` for groups that did not participate.
    pub groups: Vec<Option<String>>,
    pub start: usize,
    pub end: usize,
}

impl MatchData {
    fn from_captures(caps: &Captures<'_>) -> Option<Self> {
        let whole = caps.get(0)?;
        Some(MatchData {
            matched: whole.as_str().to_string(),
            groups: caps
                .iter()
                .skip(1)
                .map(|g| g.map(|m| m.as_str().to_string()))
                .collect(),
            start: whole.start(),
            end: whole.end(),
        })
    }

    /// Captured groups as values, `Undef` for non-participating groups.
    pub fn group_values(&self) -> Vec<Value> {
        self.groups
            .iter()
            .map(|g| g.as_deref().map_or(Value::Undef, Value::from))
            .collect()
    }
}

/// The `(?flags)` prefix plus the pattern, with the few Perl escapes the
/// `regex` crate spells differently rewritten.
pub fn build_pattern(pattern: &str, flags: &str) -> String {
    let mut inline = String::new();
    for flag in ['i', 'm', 's', 'x'] {
        if flags.contains(flag) {
            inline.push(flag);
        }
    }

    let mut out = String::with_capacity(pattern.len() + 8);
    if !inline.is_empty() {
        out.push_str("(?");
        out.push_str(&inline);
        out.push(')');
    }

    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            // end of string, or before a final newline
            Some('Z') => out.push_str(r"(?:\n?\z)"),
            Some(next) => {
                out.push('\\');
                out.push(next);
            }
            None => out.push_str(r"\\"),
        }
    }
    out
}

/// Compiled-pattern cache.
#[derive(Default)]
pub struct RegexCache {
    compiled: FxHashMap<(String, String), Option<Regex>>,
}

impl RegexCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The compiled form of `pattern` under `flags`, or `None` when it does
    /// not compile.
    pub fn get(&mut self, pattern: &str, flags: &str) -> Option<Regex> {
        let key = (pattern.to_string(), compile_flags(flags));
        if let Some(cached) = self.compiled.get(&key) {
            return cached.clone();
        }
        let compiled = match Regex::new(&build_pattern(pattern, flags)) {
            Ok(re) => Some(re),
            Err(error) => {
                tracing::debug!(pattern, %error, "pattern failed to compile");
                None
            }
        };
        self.compiled.insert(key, compiled.clone());
        compiled
    }
}

fn compile_flags(flags: &str) -> String {
    flags.chars().filter(|c| "imsx".contains(*c)).collect()
}

/// First match at or after byte offset `start`.
pub fn match_at(re: &Regex, text: &str, start: usize) -> Option<MatchData> {
    if start > text.len() || !text.is_char_boundary(start) {
        return None;
    }
    re.captures_at(text, start)
        .as_ref()
        .and_then(MatchData::from_captures)
}

/// Every non-overlapping match, left to right.
pub fn match_all(re: &Regex, text: &str) -> Vec<MatchData> {
    re.captures_iter(text)
        .filter_map(|caps| MatchData::from_captures(&caps))
        .collect()
}

/// Where a scalar-context `/g` match should resume after `found`. Empty
/// matches advance by one character so the scan always makes progress.
pub fn next_position(text: &str, found: &MatchData) -> usize {
    if found.end > found.start {
        return found.end;
    }
    text[found.end..]
        .chars()
        .next()
        .map_or(found.end + 1, |c| found.end + c.len_utf8())
}

/// Replace each match's span in `text` by the corresponding replacement.
/// `matches` must be in ascending, non-overlapping order.
pub fn splice(text: &str, matches: &[MatchData], replacements: &[String]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for (m, replacement) in matches.iter().zip(replacements) {
        out.push_str(&text[last..m.start]);
        out.push_str(replacement);
        last = m.end;
    }
    out.push_str(&text[last..]);
    out
}

/// `split` on a compiled pattern.
///
/// Captured groups are returned between fields. A zero-width match at the
/// start never produces a leading empty field. With `limit > 0` at most
/// `limit` fields are produced; with `limit == 0` trailing empty fields are
/// removed.
pub fn split(re: &Regex, text: &str, limit: i64) -> Vec<Value> {
    let mut fields: Vec<Value> = Vec::new();
    let mut field_count = 0usize;
    let max_fields = usize::try_from(limit).ok().filter(|n| *n > 0);
    let mut last = 0;

    for caps in re.captures_iter(text) {
        if max_fields.is_some_and(|max| field_count + 1 >= max) {
            break;
        }
        let Some(m) = caps.get(0) else { continue };
        if m.end() == 0 {
            continue;
        }
        if m.start() == m.end() && m.start() >= text.len() {
            break;
        }
        fields.push(Value::from(&text[last..m.start()]));
        field_count += 1;
        for group in caps.iter().skip(1) {
            fields.push(group.map_or(Value::Undef, |g| Value::from(g.as_str())));
        }
        last = m.end();
    }
    fields.push(Value::from(&text[last..]));

    if limit == 0 {
        while fields
            .last()
            .is_some_and(|v| v.is_undef() || v.as_string().is_empty())
        {
            fields.pop();
        }
    }
    fields
}

/// `split ' '`: split on runs of whitespace, ignoring leading whitespace.
pub fn split_whitespace(text: &str, limit: i64) -> Vec<Value> {
    let trimmed = text.trim_start();
    match Regex::new(r"\s+") {
        Ok(re) => split(&re, trimmed, limit),
        Err(_) => trimmed.split_whitespace().map(Value::from).collect(),
    }
}
