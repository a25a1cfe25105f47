//! Manifest descriptor: top-level `version:` and `releaseNotes:` fields.

use super::lines::{Line, Rewriter, Scalar, split_lines};
use super::LineChange;

const VERSION_KEY: &str = "version:";
const NOTES_KEY: &str = "releaseNotes:";

/// Field the manifest is missing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct MissingField(pub &'static str);

/// Index one past the last continuation line of the value starting at
/// `header`. Any indented line below a top-level key belongs to it: block
/// scalars (`|`, `>-`) as well as plain or quoted scalars folded over
/// several lines. Trailing blank lines stay with the following content.
fn value_end(lines: &[Line<'_>], header: usize) -> usize {
    let mut end = header + 1;
    for (i, line) in lines.iter().enumerate().skip(header + 1) {
        if line.is_blank() {
            continue;
        }
        if !line.is_indented() {
            break;
        }
        end = i + 1;
    }
    end
}

/// Rewrite `version:` to `version_number` and `releaseNotes:` to `notes`.
///
/// Only top-level keys (column 0) are touched. Both values are written
/// double-quoted; a trailing comment on the line is kept. Existing single
/// line notes starting with `notes_prefix` are left alone, so a re-run on
/// a later day does not produce a new change.
pub(crate) fn rewrite(
    content: &str,
    version_number: &str,
    notes: &str,
    notes_prefix: &str,
) -> Result<(String, Vec<LineChange>), MissingField> {
    let lines = split_lines(content);

    let find = |key: &str| lines.iter().position(|l| l.body.starts_with(key));
    let version_at = find(VERSION_KEY).ok_or(MissingField("version"))?;
    let notes_at = find(NOTES_KEY).ok_or(MissingField("releaseNotes"))?;

    let notes_rest = &lines[notes_at].body[NOTES_KEY.len()..];
    let notes_scalar = Scalar::parse(notes_rest.trim_start());
    let notes_block_end = value_end(&lines, notes_at);

    let notes_current = notes_block_end == notes_at + 1
        && !notes_prefix.is_empty()
        && notes_scalar.value.starts_with(notes_prefix);

    let mut rewriter = Rewriter::with_capacity(content.len() + 64);
    for (i, line) in lines.iter().enumerate() {
        if i == version_at {
            rewriter.replace(i, line, field(VERSION_KEY, line.body, version_number));
        } else if i == notes_at && notes_current {
            rewriter.keep(line);
        } else if i == notes_at {
            let body = if notes_block_end > notes_at + 1 {
                // The header may hold an indicator, a comment or half a quoted
                // string; none of it survives
                format!("{NOTES_KEY} \"{notes}\"")
            } else {
                field(NOTES_KEY, line.body, notes)
            };
            rewriter.replace(i, line, body);
        } else if i > notes_at && i < notes_block_end {
            rewriter.remove(i, line);
        } else {
            rewriter.keep(line);
        }
    }

    Ok(rewriter.finish())
}

/// `key: "value"` keeping the original spacing after the key and any comment
fn field(key: &str, body: &str, value: &str) -> String {
    let rest = &body[key.len()..];
    let value_start = rest.len() - rest.trim_start().len();
    let sep = if value_start == 0 { " " } else { &rest[..value_start] };
    let scalar = Scalar::parse(&rest[value_start..]);
    format!("{key}{sep}{}", scalar.render_with(value, Some('"')))
}
