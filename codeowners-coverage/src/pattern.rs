//! Compilation of CODEOWNERS patterns into path matchers.
//!
//! Patterns use the gitignore-flavoured glob syntax GitHub documents for
//! CODEOWNERS files:
//!
//! | pattern        | meaning                                                       |
//! |----------------|---------------------------------------------------------------|
//! | `name`         | `name` at any depth, and everything below it                  |
//! | `/name`        | `name` at the repository root only                            |
//! | `a/b`          | contains a separator, so anchored like `/a/b`                 |
//! | `dir/`         | only things below `dir` (a file called `dir` does not match)  |
//! | `*`            | zero or more characters other than `/`                        |
//! | `?`            | exactly one character other than `/`                          |
//! | `[a-z]`, `[!x]`| one character from (or not from) the set, never `/`          |
//! | `**/name`      | `name` in any directory                                       |
//! | `a/**/b`       | zero or more directories between `a` and `b`                  |
//! | `a/**`         | everything inside `a`, at any depth                           |
//! | `!pattern`     | negation: matches exactly the paths `pattern` does not        |
//! | `\x`           | the literal character `x` (e.g. `\*`, `\#`, `\!`, `\ `)       |
//!
//! Every compiled pattern is turned into a single anchored regular
//! expression. Matching is case-sensitive.

use std::{borrow::Cow, fmt, path::MAIN_SEPARATOR};

use memchr::memmem;
use regex::Regex;
use thiserror::Error;

use crate::parser;

/// The pattern could not be turned into a valid matcher.
#[derive(Debug, Error)]
#[error("invalid pattern `{pattern}`: {source}")]
pub struct PatternError {
    pub pattern: String,
    #[source]
    pub source: regex::Error,
}

/// Compile the pattern token of a raw rules-file line. Blank and comment
/// lines yield `Ok(None)`.
pub fn compile(raw_line: &str) -> Result<Option<Pattern>, PatternError> {
    match parser::pattern_token(raw_line) {
        Some(token) => Pattern::new(token).map(Some),
        None => Ok(None),
    }
}

/// A compiled CODEOWNERS pattern. Immutable once built.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
    // A literal every matching path must contain, checked before the regex.
    required_literal: Option<memmem::Finder<'static>>,
    negate: bool,
}

impl Pattern {
    /// Compile a single pattern token such as `/docs/**/*.md` or `!*.js`.
    pub fn new(pattern: &str) -> Result<Pattern, PatternError> {
        let trimmed = trim_unescaped_spaces(pattern.trim_end_matches('\r'));
        let (body, negate) = match trimmed.strip_prefix('!') {
            Some(rest) => (rest, true),
            None => (trimmed, false),
        };

        let glob = Glob::parse(body);
        let regex = Regex::new(&glob.to_regex()).map_err(|source| PatternError {
            pattern: pattern.to_owned(),
            source,
        })?;
        let required_literal = glob
            .longest_literal()
            .map(|literal| memmem::Finder::new(literal.as_bytes()).into_owned());

        Ok(Pattern {
            source: trimmed.to_owned(),
            regex,
            required_literal,
            negate,
        })
    }

    /// Whether `path` is matched, taking negation into account. Host path
    /// separators are normalized to `/` first.
    pub fn matches(&self, path: &str) -> bool {
        let path = normalize_separators(path);
        self.glob_matches(&path) != self.negate
    }

    pub fn is_negated(&self) -> bool {
        self.negate
    }

    /// The pattern as written, minus surrounding whitespace.
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// The regular expression the glob compiled to.
    pub fn regex(&self) -> &str {
        self.regex.as_str()
    }

    fn glob_matches(&self, path: &str) -> bool {
        if let Some(finder) = &self.required_literal {
            if finder.find(path.as_bytes()).is_none() {
                return false;
            }
        }
        self.regex.is_match(path)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn normalize_separators(path: &str) -> Cow<'_, str> {
    if MAIN_SEPARATOR != '/' && path.contains(MAIN_SEPARATOR) {
        Cow::Owned(path.replace(MAIN_SEPARATOR, "/"))
    } else {
        Cow::Borrowed(path)
    }
}

// Leading spaces always go; a trailing space survives only when escaped.
fn trim_unescaped_spaces(pattern: &str) -> &str {
    let mut pattern = pattern.trim_start_matches(' ');
    while let Some(rest) = pattern.strip_suffix(' ') {
        let backslashes = rest.chars().rev().take_while(|&c| c == '\\').count();
        if backslashes % 2 == 1 {
            break;
        }
        pattern = rest;
    }
    pattern
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Literal(char),
    AnyChar,
    Star,
    DoubleStar,
    Class { negated: bool, items: Vec<ClassItem> },
    Separator,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ClassItem {
    Char(char),
    Range(char, char),
}

fn tokenize(pattern: &str) -> Vec<Token> {
    let chars = pattern.chars().collect::<Vec<_>>();
    let mut tokens = Vec::with_capacity(chars.len());
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '\\' => match chars.get(i + 1) {
                Some(&c) => {
                    tokens.push(Token::Literal(c));
                    i += 2;
                }
                None => {
                    tokens.push(Token::Literal('\\'));
                    i += 1;
                }
            },
            '*' => {
                let starts_segment = matches!(tokens.last(), None | Some(Token::Separator));
                let run_start = i;
                while chars.get(i) == Some(&'*') {
                    i += 1;
                }
                let ends_segment = matches!(chars.get(i), None | Some(&'/'));

                // `**` only has its special meaning as a whole path segment;
                // any other run of stars is a plain `*`.
                if i - run_start >= 2 && starts_segment && ends_segment {
                    tokens.push(Token::DoubleStar);
                } else {
                    tokens.push(Token::Star);
                }
            }
            '?' => {
                tokens.push(Token::AnyChar);
                i += 1;
            }
            '[' => match parse_class(&chars[i + 1..]) {
                Some((class, consumed)) => {
                    tokens.push(class);
                    i += 1 + consumed;
                }
                None => {
                    tokens.push(Token::Literal('['));
                    i += 1;
                }
            },
            '/' => {
                tokens.push(Token::Separator);
                i += 1;
            }
            c => {
                tokens.push(Token::Literal(c));
                i += 1;
            }
        }
    }
    tokens
}

// Parse a bracket expression following its opening `[`. Returns the token
// and the number of characters consumed, including the closing `]`, or
// `None` if the expression is unterminated or crosses a separator.
fn parse_class(rest: &[char]) -> Option<(Token, usize)> {
    let mut j = 0;
    let negated = matches!(rest.first(), Some(&('!' | '^')));
    if negated {
        j += 1;
    }

    let mut items = Vec::new();
    loop {
        let mut c = *rest.get(j)?;
        if c == ']' && !items.is_empty() {
            return Some((Token::Class { negated, items }, j + 1));
        }
        if c == '/' {
            return None;
        }
        if c == '\\' {
            j += 1;
            c = *rest.get(j)?;
        }
        j += 1;

        match (rest.get(j), rest.get(j + 1)) {
            (Some(&'-'), Some(&end)) if end != ']' => {
                j += 2;
                let end = if end == '\\' {
                    j += 1;
                    *rest.get(j - 1)?
                } else {
                    end
                };
                items.push(ClassItem::Range(c, end));
            }
            _ => items.push(ClassItem::Char(c)),
        }
    }
}

#[derive(Debug)]
enum Segment {
    DoubleStar,
    Tokens(Vec<Token>),
}

#[derive(Debug)]
struct Glob {
    anchored: bool,
    dir_only: bool,
    segments: Vec<Segment>,
}

impl Glob {
    fn parse(pattern: &str) -> Glob {
        let mut groups: Vec<Vec<Token>> = vec![Vec::new()];
        for token in tokenize(pattern) {
            match token {
                Token::Separator => groups.push(Vec::new()),
                token => {
                    if let Some(group) = groups.last_mut() {
                        group.push(token);
                    }
                }
            }
        }

        // A leading slash anchors the pattern to the root; a trailing slash
        // restricts it to directories.
        let leading_slash = groups.len() > 1 && groups[0].is_empty();
        let trailing_slash = groups.len() > 1 && groups[groups.len() - 1].is_empty();

        let mut segments: Vec<Segment> = Vec::with_capacity(groups.len());
        for group in groups.into_iter().filter(|g| !g.is_empty()) {
            if group == [Token::DoubleStar] {
                // Consecutive `**` segments coalesce into one.
                if !matches!(segments.last(), Some(Segment::DoubleStar)) {
                    segments.push(Segment::DoubleStar);
                }
            } else {
                segments.push(Segment::Tokens(group));
            }
        }

        // A separator anywhere but the end anchors the pattern, unless it
        // belongs to a leading `**/`, which explicitly means "any directory".
        let anchored = leading_slash
            || (segments.len() > 1 && !matches!(segments[0], Segment::DoubleStar));

        Glob {
            anchored,
            dir_only: trailing_slash,
            segments,
        }
    }

    fn to_regex(&self) -> String {
        if self.segments.is_empty() {
            return r"\A.*\z".to_owned();
        }

        let mut regex = String::with_capacity(self.segments.len() * 16);
        regex.push_str(if self.anchored { r"\A/?" } else { r"\A(?:.*/)?" });

        let last = self.segments.len() - 1;
        let mut needs_separator = false;
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::DoubleStar if i == 0 && i == last => regex.push_str(".*"),
                Segment::DoubleStar if i == 0 => {
                    regex.push_str("(?:.*/)?");
                    continue;
                }
                Segment::DoubleStar if i == last => regex.push_str("/.*"),
                Segment::DoubleStar => regex.push_str("(?:/.+)?"),
                Segment::Tokens(tokens) => {
                    if needs_separator {
                        regex.push('/');
                    }
                    for token in tokens {
                        push_token(&mut regex, token);
                    }
                }
            }
            needs_separator = true;
        }

        regex.push_str(if self.dir_only { r"/.*\z" } else { r"(?:/.*)?\z" });
        regex
    }

    fn longest_literal(&self) -> Option<String> {
        let mut longest = String::new();
        for segment in &self.segments {
            let Segment::Tokens(tokens) = segment else {
                continue;
            };
            let mut current = String::new();
            for token in tokens {
                match token {
                    Token::Literal(c) => current.push(*c),
                    _ => {
                        if current.len() > longest.len() {
                            longest = std::mem::take(&mut current);
                        }
                        current.clear();
                    }
                }
            }
            if current.len() > longest.len() {
                longest = current;
            }
        }
        (!longest.is_empty()).then_some(longest)
    }
}

fn push_token(regex: &mut String, token: &Token) {
    match token {
        Token::Literal(c) => push_literal(regex, *c),
        Token::AnyChar => regex.push_str("[^/]"),
        Token::Star => regex.push_str("[^/]*"),
        Token::Class { negated, items } => {
            regex.push('[');
            if *negated {
                regex.push_str("^/");
            }
            for item in items {
                match item {
                    ClassItem::Char(c) => push_literal(regex, *c),
                    ClassItem::Range(start, end) => {
                        push_literal(regex, *start);
                        regex.push('-');
                        push_literal(regex, *end);
                    }
                }
            }
            if !*negated {
                regex.push_str("&&[^/]");
            }
            regex.push(']');
        }
        // Separators and `**` are consumed when splitting into segments.
        Token::DoubleStar | Token::Separator => {}
    }
}

fn push_literal(regex: &mut String, c: char) {
    if regex_syntax::is_meta_character(c) {
        regex.push('\\');
    }
    regex.push(c);
}
