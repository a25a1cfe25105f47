//! Compose descriptor: pin service images to `<image>:<version>@<digest>`.

use super::lines::{Rewriter, Scalar, split_lines};
use super::LineChange;
use regex::Regex;
use std::sync::LazyLock;

static IMAGE_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<key>\s*image:)(?P<sep>\s*)(?P<rest>.*)$").expect("image regex is valid")
});

struct ImageLine<'a> {
    index: usize,
    key: &'a str,
    sep: &'a str,
    scalar: Scalar<'a>,
}

/// Whether `value` names `image` (bare, tagged or digest-pinned)
fn references(value: &str, image: &str) -> bool {
    value
        .strip_prefix(image)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with(':') || rest.starts_with('@'))
}

/// Rewrite the `image:` lines of a compose file to `image_ref`.
///
/// When some image line already references `image`, only those lines are
/// rewritten and other services keep their images; otherwise every image
/// line is. Returns `None` when the file has no image line at all.
pub(crate) fn rewrite(content: &str, image: &str, image_ref: &str) -> Option<(String, Vec<LineChange>)> {
    let lines = split_lines(content);

    let image_lines: Vec<ImageLine<'_>> = lines
        .iter()
        .enumerate()
        .filter_map(|(index, line)| {
            let caps = IMAGE_LINE_RE.captures(line.body)?;
            Some(ImageLine {
                index,
                key: caps.name("key")?.as_str(),
                sep: caps.name("sep")?.as_str(),
                scalar: Scalar::parse(caps.name("rest")?.as_str()),
            })
        })
        .collect();

    if image_lines.is_empty() {
        return None;
    }

    let own_only = image_lines.iter().any(|l| references(l.scalar.value, image));

    let mut rewriter = Rewriter::with_capacity(content.len() + 64);
    let mut targets = image_lines
        .iter()
        .filter(|l| !own_only || references(l.scalar.value, image))
        .peekable();

    for (i, line) in lines.iter().enumerate() {
        match targets.next_if(|t| t.index == i) {
            Some(target) => {
                let sep = if target.sep.is_empty() { " " } else { target.sep };
                let value = target.scalar.render_with(image_ref, target.scalar.quote);
                rewriter.replace(i, line, format!("{}{sep}{value}", target.key));
            }
            None => rewriter.keep(line),
        }
    }

    Some(rewriter.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    const IMAGE: &str = "ghcr.io/x/y";
    const NEW: &str = "ghcr.io/x/y:v2026.1.24@sha256:deadbeef";

    #[test]
    fn test_rewrites_own_image_preserving_indentation() {
        let input = "services:\n  app:\n    image: ghcr.io/x/y:v2026.1.0@sha256:0ld\n    restart: on-failure\n";
        let (out, changes) = rewrite(input, IMAGE, NEW).unwrap();
        assert_eq!(
            out,
            "services:\n  app:\n    image: ghcr.io/x/y:v2026.1.24@sha256:deadbeef\n    restart: on-failure\n"
        );
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].line, 3);
    }

    #[test]
    fn test_sidecars_untouched_when_own_image_present() {
        let input = "services:\n  app_proxy:\n    image: getumbrel/app-proxy:1.0\n  web:\n    image: ghcr.io/x/y:old\n  db:\n    image: postgres:16 # pinned by upstream\n";
        let (out, changes) = rewrite(input, IMAGE, NEW).unwrap();
        assert!(out.contains("image: getumbrel/app-proxy:1.0\n"));
        assert!(out.contains("image: postgres:16 # pinned by upstream\n"));
        assert!(out.contains(&format!("image: {NEW}\n")));
        assert_eq!(changes.len(), 1);
    }

    #[test]
    fn test_all_lines_rewritten_when_own_image_absent() {
        let input = "services:\n  web:\n    image: placeholder:latest\n  worker:\n    image: placeholder:latest\n";
        let (out, changes) = rewrite(input, IMAGE, NEW).unwrap();
        assert_eq!(changes.len(), 2);
        assert_eq!(out.matches(NEW).count(), 2);
    }

    #[test]
    fn test_quote_and_comment_preserved() {
        let input = "  web:\n    image: 'ghcr.io/x/y:v1'   # release image\r\n";
        let (out, _) = rewrite(input, IMAGE, NEW).unwrap();
        assert_eq!(out, format!("  web:\n    image: '{NEW}'   # release image\r\n"));
    }

    #[test]
    fn test_prefix_of_other_image_is_not_a_reference() {
        assert!(references("ghcr.io/x/y", IMAGE));
        assert!(references("ghcr.io/x/y:v1", IMAGE));
        assert!(references("ghcr.io/x/y@sha256:aa", IMAGE));
        assert!(!references("ghcr.io/x/yz:v1", IMAGE));
    }

    #[test]
    fn test_image_pull_policy_is_not_an_image_line() {
        let input = "    imagePullPolicy: always\n";
        assert!(rewrite(input, IMAGE, NEW).is_none());
    }

    #[test]
    fn test_idempotent() {
        let input = "services:\n  web:\n    image: ghcr.io/x/y:v1\n";
        let (once, _) = rewrite(input, IMAGE, NEW).unwrap();
        let (twice, changes) = rewrite(&once, IMAGE, NEW).unwrap();
        assert_eq!(once, twice);
        assert!(changes.is_empty());
    }
}
