//! Phase 4b: Tag sets
//!
//! A named collection of declared tags, driving the parser through one
//! logical record at a time. The set maps encountered tag names (after
//! locale-stripping fallback) onto its members and delegates the
//! accept-or-reject decision to them; a repeating start tag both closes
//! the current record and, buffered, opens the next one without
//! re-reading the stream.

use std::collections::HashMap;
use std::io::BufRead;

use log::warn;

use crate::classify::LineKind;
use crate::error::{ParseError, Result};
use crate::parser::TaggedParser;
use crate::scanner::LineScanner;
use crate::tag::{AssignStatus, Tag, TagDefinition};

/// An insertion-ordered set of declared tags with unique names.
#[derive(Debug)]
pub struct TagSet {
    name: String,
    tags: Vec<Tag>,
    index: HashMap<String, usize>,
    /// An occurrence consumed from the stream but belonging to the
    /// next record is buffered in the parser cursor; this flag says so.
    buffered: bool,
}

impl TagSet {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            tags: Vec::new(),
            index: HashMap::new(),
            buffered: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declare a tag. Names are unique within a set.
    pub fn insert(&mut self, def: TagDefinition) -> Result<()> {
        if self.index.contains_key(&def.name) {
            return Err(ParseError::DuplicateTag(def.name));
        }
        self.index.insert(def.name.clone(), self.tags.len());
        self.tags.push(Tag::new(def));
        Ok(())
    }

    /// Configure the preferred locale on every member tag.
    pub fn set_preferred_locale(&mut self, spelling: &str) {
        for tag in &mut self.tags {
            tag.set_preferred_locale(spelling);
        }
    }

    /// Configure the default locale on every member tag.
    pub fn set_default_locale(&mut self, main: &str) {
        for tag in &mut self.tags {
            tag.set_default_locale(main);
        }
    }

    /// Member lookup by declared spelling.
    pub fn tag(&self, declared: &str) -> Option<&Tag> {
        self.index.get(declared).map(|&i| &self.tags[i])
    }

    /// Members in declaration order, stable for printing and
    /// debugging.
    pub fn iter(&self) -> impl Iterator<Item = &Tag> {
        self.tags.iter()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Whether a tag occurrence for the next record is already
    /// buffered in the parser cursor.
    pub fn has_buffered(&self) -> bool {
        self.buffered
    }

    /// Forget captured data and any buffered occurrence, e.g. before
    /// reusing the set on a fresh stream.
    pub fn clear(&mut self) {
        for tag in &mut self.tags {
            tag.clear();
        }
        self.buffered = false;
    }

    /// Populate one whole record from the stream.
    ///
    /// Clears all member state, then repeatedly locates the next tag
    /// occurrence (or reuses the buffered one), maps it onto a member,
    /// and lets that member accept or reject it. Returns
    /// [`AssignStatus::AcceptedFull`] when the record is complete —
    /// either a repeating start tag closed it (the occurrence stays
    /// buffered for the next call) or the stream ended cleanly — and
    /// any `Rejected` status as soon as the record turns out
    /// malformed; the caller decides whether to skip or abort. The
    /// offending line number and tag name are available from the
    /// parser cursor.
    pub fn assign_set<R: BufRead>(
        &mut self,
        parser: &mut TaggedParser,
        scanner: &mut LineScanner<R>,
    ) -> Result<AssignStatus> {
        for tag in &mut self.tags {
            tag.clear();
        }
        loop {
            if self.buffered {
                self.buffered = false;
            } else {
                let kind = parser.lookup_tag(scanner, "", "")?;
                if kind == LineKind::None {
                    return Ok(if scanner.at_eof() {
                        AssignStatus::AcceptedFull
                    } else {
                        AssignStatus::RejectedNoMatch
                    });
                }
            }

            let (tag_name, locale, line) = {
                let cursor = parser.cursor();
                (cursor.tag.clone(), cursor.locale.clone(), cursor.line)
            };
            let Some(member) = self.find_member(&tag_name, &locale) else {
                warn!(
                    "set {:?}: unknown tag {:?} at line {}",
                    self.name, tag_name, line
                );
                return Ok(AssignStatus::RejectedNoMatch);
            };

            match self.tags[member].assign(parser, scanner)? {
                AssignStatus::Accepted => {}
                AssignStatus::AcceptedFull => {
                    self.buffered = true;
                    return Ok(AssignStatus::AcceptedFull);
                }
                rejected => {
                    warn!(
                        "set {:?}: tag {:?} at line {} rejected: {:?}",
                        self.name, tag_name, line, rejected
                    );
                    return Ok(rejected);
                }
            }
        }
    }

    /// Map an encountered tag name onto a member, trying progressively
    /// shorter forms so schema tags can be declared locale-aware or
    /// not: `name.locale`, `name.`, `name` (locale-less occurrences:
    /// `name`, then `name.`).
    fn find_member(&self, tag: &str, locale: &str) -> Option<usize> {
        if locale.is_empty() {
            if let Some(&i) = self.index.get(tag) {
                return Some(i);
            }
            return self.index.get(&format!("{}.", tag)).copied();
        }
        if let Some(&i) = self.index.get(&format!("{}.{}", tag, locale)) {
            return Some(i);
        }
        if let Some(&i) = self.index.get(&format!("{}.", tag)) {
            return Some(i);
        }
        self.index.get(tag).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ParseOptions;
    use crate::tag::{LocalePolicy, TagKind};
    use std::io::Cursor;

    fn widget_set() -> TagSet {
        let mut set = TagSet::new("widgets");
        set.insert(TagDefinition::multi("Pkg")).unwrap();
        set.insert(TagDefinition::single("Ver")).unwrap();
        set.insert(TagDefinition::single("Sum.").with_locale_policy(LocalePolicy::Allow))
            .unwrap();
        set
    }

    #[test]
    fn test_duplicate_declaration_is_an_error() {
        let mut set = widget_set();
        assert!(matches!(
            set.insert(TagDefinition::single("Ver")),
            Err(ParseError::DuplicateTag(_))
        ));
    }

    #[test]
    fn test_name_fallback_forms() {
        let set = widget_set();
        // "Sum" with a locale resolves through the "Sum." declaration.
        assert!(set.find_member("Sum", "de").is_some());
        assert!(set.find_member("Sum", "").is_some());
        assert!(set.find_member("Ver", "").is_some());
        assert!(set.find_member("Nope", "").is_none());
    }

    #[test]
    fn test_assign_whole_record() {
        let input = "+Pkg:\nwidget 1.0 noarch\n-Pkg:\n=Ver: 1.0\n=Sum.de: Ein Widget\n";
        let mut set = widget_set();
        let mut parser = TaggedParser::new(ParseOptions::default());
        let mut scanner = LineScanner::new(Cursor::new(input));
        let status = set.assign_set(&mut parser, &mut scanner).unwrap();
        assert_eq!(status, AssignStatus::AcceptedFull);
        assert!(!set.has_buffered());
        assert_eq!(set.tag("Ver").unwrap().text(), Some("1.0"));
        assert_eq!(set.tag("Sum.").unwrap().text_for("de"), Some("Ein Widget"));
        assert_eq!(set.tag("Pkg").unwrap().definition().kind, TagKind::Multi);
    }

    #[test]
    fn test_unknown_tag_rejects_record() {
        let input = "=Zzz: mystery\n";
        let mut set = widget_set();
        let mut parser = TaggedParser::new(ParseOptions::default());
        let mut scanner = LineScanner::new(Cursor::new(input));
        assert_eq!(
            set.assign_set(&mut parser, &mut scanner).unwrap(),
            AssignStatus::RejectedNoMatch
        );
        assert_eq!(parser.cursor().tag, "Zzz");
    }

    #[test]
    fn test_record_boundary_reuses_buffered_tag() {
        let input = "+Pkg:\nalpha\n-Pkg:\n=Ver: 1.0\n+Pkg:\nbeta\n-Pkg:\n=Ver: 2.0\n";
        let mut set = widget_set();
        let mut parser = TaggedParser::new(ParseOptions::default());
        let mut scanner = LineScanner::new(Cursor::new(input));

        assert_eq!(
            set.assign_set(&mut parser, &mut scanner).unwrap(),
            AssignStatus::AcceptedFull
        );
        assert!(set.has_buffered());
        assert_eq!(set.tag("Ver").unwrap().text(), Some("1.0"));

        // The second record starts from the buffered "+Pkg:" without
        // re-reading it.
        assert_eq!(
            set.assign_set(&mut parser, &mut scanner).unwrap(),
            AssignStatus::AcceptedFull
        );
        assert!(!set.has_buffered());
        assert_eq!(set.tag("Ver").unwrap().text(), Some("2.0"));
        assert!(scanner.at_eof());
    }

    #[test]
    fn test_empty_input_is_clean_eof() {
        let mut set = widget_set();
        let mut parser = TaggedParser::new(ParseOptions::default());
        let mut scanner = LineScanner::new(Cursor::new(""));
        assert_eq!(
            set.assign_set(&mut parser, &mut scanner).unwrap(),
            AssignStatus::AcceptedFull
        );
        assert!(set.tag("Ver").unwrap().text().is_none());
    }
}
