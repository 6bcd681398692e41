//! Splitting of CODEOWNERS lines into a pattern token and owner tokens.
//!
//! The pattern token is returned verbatim, backslash escapes included, so the
//! pattern compiler can tell an escaped `*` from a wildcard. Only an
//! unescaped whitespace character terminates it. Owner tokens are opaque.

/// Split a single line into its pattern token and owners. Returns `None` for
/// blank lines and for lines whose first non-space character is `#`.
pub fn split_line(line: &str) -> Option<(&str, Vec<&str>)> {
    let line = line.trim_end_matches(['\r', '\n']);
    let mut parser = Parser::new(line);

    parser.skip_whitespace();
    match parser.peek() {
        None | Some('#') => return None,
        Some(_) => {}
    }

    let pattern = parser.parse_pattern();
    let mut owners = Vec::new();
    loop {
        parser.skip_whitespace();
        let Some(owner) = parser.parse_owner() else {
            break;
        };
        owners.push(owner);
    }

    Some((pattern, owners))
}

/// The first whitespace-delimited field of `line`, or `None` if the line is
/// blank or a comment.
pub fn pattern_token(line: &str) -> Option<&str> {
    split_line(line).map(|(pattern, _)| pattern)
}

struct Parser<'a> {
    source: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self { source, pos: 0 }
    }

    fn parse_pattern(&mut self) -> &'a str {
        let start = self.pos;
        let mut escaped = false;
        loop {
            match self.peek() {
                Some('\\') if !escaped => {
                    escaped = true;
                    self.next();
                }
                Some(c) if c.is_whitespace() && !escaped => break,
                Some(_) => {
                    self.next();
                    escaped = false;
                }
                None => break,
            }
        }
        &self.source[start..self.pos]
    }

    fn parse_owner(&mut self) -> Option<&'a str> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                break;
            }
            self.next();
        }

        if start == self.pos {
            None
        } else {
            Some(&self.source[start..self.pos])
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if !c.is_whitespace() {
                break;
            }
            self.next();
        }
    }

    fn peek(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    fn next(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_line() {
        let examples: Vec<(&str, Option<(&str, Vec<&str>)>)> = vec![
            ("", None),
            ("    \t  ", None),
            ("# a fun comment!", None),
            ("   # indented comment", None),
            ("foo", Some(("foo", vec![]))),
            (" foo ", Some(("foo", vec![]))),
            ("foo\r", Some(("foo", vec![]))),
            ("*.js\t\t@org/team_reviewers", Some(("*.js", vec!["@org/team_reviewers"]))),
            ("a/b @c/d e@f.co", Some(("a/b", vec!["@c/d", "e@f.co"]))),
            ("foo\\ bar @x", Some(("foo\\ bar", vec!["@x"]))),
            ("foo\\  @x", Some(("foo\\ ", vec!["@x"]))),
            ("\\#hash @x", Some(("\\#hash", vec!["@x"]))),
            ("!boat/* @a @b", Some(("!boat/*", vec!["@a", "@b"]))),
        ];

        for (line, expected) in examples {
            assert_eq!(split_line(line), expected, "result mismatch for `{}`", line);
        }
    }

    #[test]
    fn test_pattern_token() {
        assert_eq!(pattern_token("src/**  @a"), Some("src/**"));
        assert_eq!(pattern_token("#src"), None);
        assert_eq!(pattern_token(" "), None);
    }
}
