//! Line-level rewriting that keeps every untouched byte.

use super::LineChange;

/// One line of a file, split from its terminator (`\n`, `\r\n` or none)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Line<'a> {
    pub body: &'a str,
    pub ending: &'a str,
}

impl Line<'_> {
    /// Whether the line holds only whitespace
    pub fn is_blank(&self) -> bool {
        self.body.trim().is_empty()
    }

    /// Whether the line starts with a space or tab
    pub fn is_indented(&self) -> bool {
        self.body.starts_with([' ', '\t'])
    }
}

pub(crate) fn split_lines(content: &str) -> Vec<Line<'_>> {
    content
        .split_inclusive('\n')
        .map(|raw| {
            let body_len = raw
                .strip_suffix("\r\n")
                .or_else(|| raw.strip_suffix('\n'))
                .map_or(raw.len(), str::len);
            let (body, ending) = raw.split_at(body_len);
            Line { body, ending }
        })
        .collect()
}

/// Accumulates the rewritten file and the list of changed lines
#[derive(Debug, Default)]
pub(crate) struct Rewriter {
    out: String,
    changes: Vec<LineChange>,
}

impl Rewriter {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            out: String::with_capacity(capacity),
            changes: Vec::new(),
        }
    }

    /// Copy a line unchanged
    pub fn keep(&mut self, line: &Line<'_>) {
        self.out.push_str(line.body);
        self.out.push_str(line.ending);
    }

    /// Emit `body` in place of `line` (0-based `index`), keeping its terminator
    pub fn replace(&mut self, index: usize, line: &Line<'_>, body: String) {
        self.out.push_str(&body);
        self.out.push_str(line.ending);
        if body != line.body {
            self.changes.push(LineChange {
                line: index + 1,
                before: line.body.to_string(),
                after: Some(body),
            });
        }
    }

    /// Omit `line` (0-based `index`)
    pub fn remove(&mut self, index: usize, line: &Line<'_>) {
        self.changes.push(LineChange {
            line: index + 1,
            before: line.body.to_string(),
            after: None,
        });
    }

    pub fn finish(self) -> (String, Vec<LineChange>) {
        (self.out, self.changes)
    }
}

/// A YAML scalar as written on a line: optional quotes, the value and
/// whatever follows it (spacing and a `# comment`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Scalar<'a> {
    pub quote: Option<char>,
    pub value: &'a str,
    pub suffix: &'a str,
}

impl<'a> Scalar<'a> {
    pub fn parse(text: &'a str) -> Self {
        if let Some(quote) = text.chars().next().filter(|c| *c == '"' || *c == '\'')
            && let Some(end) = text[1..].find(quote)
        {
            return Self {
                quote: Some(quote),
                value: &text[1..1 + end],
                suffix: &text[2 + end..],
            };
        }

        let value_end = comment_start(text).unwrap_or(text.len());
        let value = text[..value_end].trim_end();
        Self {
            quote: None,
            value,
            suffix: &text[value.len()..],
        }
    }

    /// Render `value` in this scalar's quoting, followed by the original suffix
    pub fn render_with(&self, value: &str, quote: Option<char>) -> String {
        match quote {
            Some(q) => format!("{q}{value}{q}{}", self.suffix),
            None if self.suffix.starts_with('#') => format!("{value} {}", self.suffix),
            None => format!("{value}{}", self.suffix),
        }
    }
}

/// Byte offset of a ` #` comment start in an unquoted scalar
fn comment_start(text: &str) -> Option<usize> {
    if text.starts_with('#') {
        return Some(0);
    }
    text.as_bytes()
        .windows(2)
        .position(|w| (w[0] == b' ' || w[0] == b'\t') && w[1] == b'#')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_lines_keeps_terminators() {
        let lines = split_lines("a\r\nb\nc");
        assert_eq!(
            lines,
            vec![
                Line { body: "a", ending: "\r\n" },
                Line { body: "b", ending: "\n" },
                Line { body: "c", ending: "" },
            ]
        );
        assert!(split_lines("").is_empty());
    }

    #[test]
    fn test_scalar_quoted_with_comment() {
        let s = Scalar::parse(r#""ghcr.io/x/y:v1@sha256:aa"  # pinned"#);
        assert_eq!(s.quote, Some('"'));
        assert_eq!(s.value, "ghcr.io/x/y:v1@sha256:aa");
        assert_eq!(s.suffix, "  # pinned");
        assert_eq!(s.render_with("new", s.quote), "\"new\"  # pinned");
    }

    #[test]
    fn test_scalar_unquoted() {
        let s = Scalar::parse("ghcr.io/x/y:v1 # keep");
        assert_eq!(s.quote, None);
        assert_eq!(s.value, "ghcr.io/x/y:v1");
        assert_eq!(s.suffix, " # keep");

        let s = Scalar::parse("nginx:1.25   ");
        assert_eq!(s.value, "nginx:1.25");
        assert_eq!(s.suffix, "   ");

        // '#' inside a value is not a comment
        let s = Scalar::parse("registry/app#tag");
        assert_eq!(s.value, "registry/app#tag");
        assert_eq!(s.suffix, "");
    }

    #[test]
    fn test_rewriter_records_only_real_changes() {
        let lines = split_lines("x: 1\ny: 2\n");
        let mut rw = Rewriter::default();
        rw.replace(0, &lines[0], "x: 1".to_string());
        rw.replace(1, &lines[1], "y: 3".to_string());
        let (out, changes) = rw.finish();
        assert_eq!(out, "x: 1\ny: 3\n");
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].line, 2);
    }
}
