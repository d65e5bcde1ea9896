//! Phase 2: Tag line classification
//!
//! A pure function over one line of text: decides whether the line
//! opens a single-line tag (`=`), starts a multi-line tag (`+`), ends
//! one (`-`), or is a legacy oldstyle tag, and extracts the tag name,
//! the optional dot-delimited locale suffix, and the offset at which
//! data begins within the line.

/// How a line participates in the tagged format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Not a tag line: blank, comment, payload, or malformed.
    None,
    /// `=<tag>:` single-line tag.
    Single,
    /// `+<tag>:` multi-line start tag.
    Start,
    /// `-<tag>:` multi-line end tag.
    End,
    /// Oldstyle `NAME: data` single-line tag.
    OldSingle,
    /// Oldstyle `NAME:` multi-line tag.
    OldMulti,
}

/// Classification result for one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagLine {
    pub kind: LineKind,
    /// Tag name without type character or locale suffix.
    pub name: String,
    /// Locale suffix spelling (`de`, `de_DE`, ...), empty when absent.
    pub locale: String,
    /// Byte offset within the line where data begins.
    pub data_offset: usize,
}

impl TagLine {
    fn none() -> Self {
        Self {
            kind: LineKind::None,
            name: String::new(),
            locale: String::new(),
            data_offset: 0,
        }
    }
}

/// Characters terminating a tag name.
const SEPARATORS: &[char] = &[':', '.', ' ', '\t'];

/// Classify one line of a tagged stream.
///
/// Pure function of `(line, oldstyle)`: calling it twice on the same
/// input yields identical results. Comment and blank detection happens
/// before type dispatch, so `#` wins even on lines that would otherwise
/// parse as a tag.
pub fn classify(line: &str, oldstyle: bool) -> TagLine {
    if line.is_empty() || line.starts_with('#') {
        return TagLine::none();
    }

    let bytes = line.as_bytes();
    let (kind, marker) = match bytes[0] {
        b'=' => (LineKind::Single, 1),
        b'+' => (LineKind::Start, 1),
        b'-' => (LineKind::End, 1),
        first if oldstyle && first.is_ascii_uppercase() => match line.find(':') {
            Some(colon) => {
                let kind = match bytes.get(colon + 1) {
                    Some(&b' ') | Some(&b'\t') => LineKind::OldSingle,
                    _ => LineKind::OldMulti,
                };
                (kind, 0)
            }
            None => return TagLine::none(),
        },
        _ => return TagLine::none(),
    };

    let sep = match line[marker..].find(SEPARATORS) {
        Some(rel) => marker + rel,
        None => return TagLine::none(),
    };
    // Tag names must be non-empty: a separator earlier than position 2
    // is always invalid.
    if sep < 2 {
        return TagLine::none();
    }
    let name = line[marker..sep].to_string();

    if bytes[sep] == b'.' {
        let colon = match line[sep + 1..].find(':') {
            Some(rel) => sep + 1 + rel,
            None => return TagLine::none(),
        };
        if colon == sep + 1 {
            // `.` with nothing between it and the terminating `:`.
            return TagLine::none();
        }
        TagLine {
            kind,
            name,
            locale: line[sep + 1..colon].to_string(),
            data_offset: colon + 1,
        }
    } else {
        TagLine {
            kind,
            name,
            locale: String::new(),
            data_offset: sep + 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_line_tag() {
        let t = classify("=Ver: 1.0", false);
        assert_eq!(t.kind, LineKind::Single);
        assert_eq!(t.name, "Ver");
        assert!(t.locale.is_empty());
        assert_eq!(t.data_offset, 5);
    }

    #[test]
    fn test_start_and_end_tags() {
        assert_eq!(classify("+Des:", false).kind, LineKind::Start);
        assert_eq!(classify("-Des:", false).kind, LineKind::End);
    }

    #[test]
    fn test_locale_suffix() {
        let t = classify("=Sum.de_DE: Ein Widget", false);
        assert_eq!(t.kind, LineKind::Single);
        assert_eq!(t.name, "Sum");
        assert_eq!(t.locale, "de_DE");
        assert_eq!(t.data_offset, 11);
    }

    #[test]
    fn test_comment_wins_over_tag_syntax() {
        assert_eq!(classify("#=Ver: 1.0", false).kind, LineKind::None);
        assert_eq!(classify("", false).kind, LineKind::None);
    }

    #[test]
    fn test_payload_lines_are_none() {
        assert_eq!(classify("just some body text", false).kind, LineKind::None);
        assert_eq!(classify("  indented", false).kind, LineKind::None);
    }

    #[test]
    fn test_separator_too_early_is_invalid() {
        assert_eq!(classify("=:", false).kind, LineKind::None);
        assert_eq!(classify("=.x:", false).kind, LineKind::None);
    }

    #[test]
    fn test_empty_locale_is_invalid() {
        assert_eq!(classify("=Sum.:", false).kind, LineKind::None);
    }

    #[test]
    fn test_locale_without_terminating_colon_is_invalid() {
        assert_eq!(classify("=Sum.de", false).kind, LineKind::None);
    }

    #[test]
    fn test_missing_separator_is_invalid() {
        assert_eq!(classify("=Ver", false).kind, LineKind::None);
    }

    #[test]
    fn test_oldstyle_single_and_multi() {
        let single = classify("PACKAGE: foo", true);
        assert_eq!(single.kind, LineKind::OldSingle);
        assert_eq!(single.name, "PACKAGE");
        assert_eq!(single.data_offset, 8);

        let multi = classify("Obsoletes:", true);
        assert_eq!(multi.kind, LineKind::OldMulti);
        assert_eq!(multi.name, "Obsoletes");
    }

    #[test]
    fn test_oldstyle_disabled_by_default() {
        assert_eq!(classify("PACKAGE: foo", false).kind, LineKind::None);
    }

    #[test]
    fn test_idempotent() {
        let line = "+Des.de: erste Zeile";
        assert_eq!(classify(line, false), classify(line, false));
    }
}
