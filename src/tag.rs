//! Phase 4a: Schema tags and the assignment protocol
//!
//! A [`Tag`] pairs one declared tag definition with its runtime state
//! for the record currently being parsed: per-locale payload positions,
//! immediately captured scalars for single-line tags, and the locale
//! preference ratchet. The assignment algorithm is a single function
//! dispatching over plain enums; there is no virtual dispatch over tag
//! "kinds".

use std::collections::HashMap;
use std::io::BufRead;

use log::debug;

use crate::classify::LineKind;
use crate::error::Result;
use crate::locale::Locale;
use crate::parser::TaggedParser;
use crate::retrieve::ByteRange;
use crate::scanner::LineScanner;

/// Single-line versus bracketed multi-line payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    Single,
    Multi,
}

/// What locale suffixes a tag tolerates on its occurrences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalePolicy {
    /// Declared without locale awareness.
    None,
    /// Locale suffixes accepted but not required.
    Allow,
    /// Occurrences without a locale are rejected.
    Force,
    /// Occurrences with a locale are rejected.
    Reject,
}

/// How repeated occurrences within one record are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptPolicy {
    /// Each locale slot accepts exactly one occurrence.
    Once,
    /// Locale preference ratchet: unlocalized, then the preferred main
    /// locale, then main plus sub-locale; everything else is silently
    /// discarded.
    PreferredLocale,
    /// Like `PreferredLocale`, but matched against the configured
    /// default locale and never capturing unlocalized occurrences.
    LocaleOnly,
}

/// How the end tag of a multi-line occurrence is spelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndTagRule {
    /// Base name, with `.<locale>` appended when the start tag carried
    /// a locale (`+Des.de:` closes with `-Des.de:`).
    Normal,
    /// Legacy spelling: the whole `name.locale` string reversed, first
    /// character capitalized (`+Des.de:` closes with `-Ed.seD:`). Kept
    /// byte-for-byte for file-format compatibility.
    ReversedWithLocalePrefix,
}

/// Outcome of assigning one tag occurrence, and of assigning a whole
/// set. These are status codes, not errors: the caller makes the
/// continue-or-abort decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignStatus {
    /// Occurrence consumed; keep going within the current record.
    Accepted,
    /// A repeating start tag closed the record; the occurrence belongs
    /// to the next record and stays buffered.
    AcceptedFull,
    /// Tag name unknown to the set.
    RejectedNoMatch,
    /// This locale slot already holds data.
    RejectedFull,
    /// The closing marker of a multi-line tag never appeared; the
    /// stream position is unreliable past this point.
    RejectedNoEndTag,
    /// Locale required but missing.
    RejectedNoLocale,
    /// Locale present but not tolerated.
    RejectedLocale,
}

/// One expected tag: name, shape, and acceptance rules.
#[derive(Debug, Clone)]
pub struct TagDefinition {
    /// Declared spelling. May be bare (`Ver`), locale-aware (`Sum.`),
    /// or fully localized (`Des.de`); the part before the first `.` is
    /// the base name used for end-tag spellings.
    pub name: String,
    pub kind: TagKind,
    pub locale_policy: LocalePolicy,
    pub accept: AcceptPolicy,
    pub end_rule: EndTagRule,
}

impl TagDefinition {
    pub fn single(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: TagKind::Single,
            locale_policy: LocalePolicy::None,
            accept: AcceptPolicy::Once,
            end_rule: EndTagRule::Normal,
        }
    }

    pub fn multi(name: &str) -> Self {
        Self {
            kind: TagKind::Multi,
            ..Self::single(name)
        }
    }

    pub fn with_locale_policy(mut self, policy: LocalePolicy) -> Self {
        self.locale_policy = policy;
        self
    }

    pub fn with_accept(mut self, accept: AcceptPolicy) -> Self {
        self.accept = accept;
        self
    }

    pub fn with_end_rule(mut self, rule: EndTagRule) -> Self {
        self.end_rule = rule;
        self
    }
}

/// Captured state of one locale slot.
#[derive(Debug, Clone)]
struct Slot {
    range: ByteRange,
    text: Option<String>,
}

/// A declared tag plus its assignment state for the current record.
#[derive(Debug, Clone)]
pub struct Tag {
    def: TagDefinition,
    base: String,
    preferred: Locale,
    default_main: String,
    /// Locale spelling (empty string = no locale) to captured payload.
    slots: HashMap<String, Slot>,
    /// Last accepted main/sub locale, driving the preference ratchet.
    last_accepted: Option<Locale>,
}

impl Tag {
    pub fn new(def: TagDefinition) -> Self {
        let base = match def.name.split_once('.') {
            Some((base, _)) => base.to_string(),
            None => def.name.clone(),
        };
        Self {
            def,
            base,
            preferred: Locale::default(),
            default_main: String::new(),
            slots: HashMap::new(),
            last_accepted: None,
        }
    }

    pub fn definition(&self) -> &TagDefinition {
        &self.def
    }

    /// Declared spelling, the lookup key within a set.
    pub fn name(&self) -> &str {
        &self.def.name
    }

    /// Declared name up to the first `.`.
    pub fn base_name(&self) -> &str {
        &self.base
    }

    /// Configure the preferred locale for ratcheted tags. Must happen
    /// before parsing begins, or ratcheted occurrences are rejected
    /// unconditionally.
    pub fn set_preferred_locale(&mut self, spelling: &str) {
        self.preferred = Locale::parse(spelling);
    }

    /// Configure the default locale main part targeted by
    /// [`AcceptPolicy::LocaleOnly`]. Capture is first-match-wins and
    /// therefore order-dependent; a later, equally valid occurrence is
    /// discarded. This matches the source format's historic behavior.
    pub fn set_default_locale(&mut self, main: &str) {
        self.default_main = main.to_string();
    }

    /// Drop all captured data and the ratchet state, keeping the
    /// configuration. Called between records.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.last_accepted = None;
    }

    /// Captured payload range for the unlocalized slot.
    pub fn range(&self) -> Option<ByteRange> {
        self.range_for("")
    }

    /// Captured payload range for a locale spelling.
    pub fn range_for(&self, locale: &str) -> Option<ByteRange> {
        self.slots.get(locale).map(|slot| slot.range)
    }

    /// Immediately captured scalar for the unlocalized slot.
    pub fn text(&self) -> Option<&str> {
        self.text_for("")
    }

    /// Immediately captured scalar for a locale spelling.
    pub fn text_for(&self, locale: &str) -> Option<&str> {
        self.slots.get(locale).and_then(|slot| slot.text.as_deref())
    }

    /// Locale spellings captured so far, sorted for stable output.
    pub fn locales(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.slots.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// The ratchet's last accepted locale, if any occurrence was
    /// captured by a preference policy.
    pub fn last_accepted(&self) -> Option<&Locale> {
        self.last_accepted.as_ref()
    }

    /// Decide whether the occurrence currently held by the parser
    /// cursor belongs to this tag's record state, consuming a
    /// multi-line body from the stream where needed.
    pub fn assign<R: BufRead>(
        &mut self,
        parser: &mut TaggedParser,
        scanner: &mut LineScanner<R>,
    ) -> Result<AssignStatus> {
        let kind = parser.cursor().kind;
        let spelling = parser.cursor().locale.clone();
        let occurrence = Locale::parse(&spelling);

        // Locale policy gate.
        match self.def.locale_policy {
            LocalePolicy::Force if spelling.is_empty() => {
                return Ok(AssignStatus::RejectedNoLocale)
            }
            LocalePolicy::Reject if !spelling.is_empty() => {
                return Ok(AssignStatus::RejectedLocale)
            }
            _ => {}
        }

        // Locale preference ratchet, ahead of the re-occurrence gate.
        if self.def.accept != AcceptPolicy::Once {
            if !self.ratchet_configured() {
                return Ok(AssignStatus::RejectedLocale);
            }
            let wanted = match self.ratchet_level(&occurrence) {
                Some(level) if level > self.captured_level() => true,
                _ => false,
            };
            if !wanted {
                // Silent discard. A multi-line body is still consumed
                // so the stream position stays consistent.
                if self.def.kind == TagKind::Multi && !self.scan_end_tag(parser, scanner, &spelling)? {
                    return Ok(AssignStatus::RejectedNoEndTag);
                }
                debug!(
                    "discarding {:?} occurrence with locale {:?}",
                    self.def.name, spelling
                );
                return Ok(AssignStatus::Accepted);
            }
            // Capture, overwriting whatever an earlier occurrence left.
            if self.def.kind == TagKind::Multi && !self.scan_end_tag(parser, scanner, &spelling)? {
                return Ok(AssignStatus::RejectedNoEndTag);
            }
            self.store(String::new(), parser);
            self.last_accepted = Some(occurrence);
            return Ok(AssignStatus::Accepted);
        }

        // Re-occurrence gate: this exact locale slot already captured.
        if self.slots.contains_key(&spelling) {
            return Ok(match kind {
                LineKind::Start | LineKind::OldMulti => AssignStatus::AcceptedFull,
                _ => AssignStatus::RejectedFull,
            });
        }

        if self.def.kind == TagKind::Multi && !self.scan_end_tag(parser, scanner, &spelling)? {
            return Ok(AssignStatus::RejectedNoEndTag);
        }
        self.store(spelling, parser);
        Ok(AssignStatus::Accepted)
    }

    fn store(&mut self, slot_key: String, parser: &TaggedParser) {
        let text = match self.def.kind {
            TagKind::Single => parser.same_line_data().map(str::to_string),
            TagKind::Multi => None,
        };
        self.slots.insert(
            slot_key,
            Slot {
                range: parser.cursor().data_range(),
                text,
            },
        );
    }

    fn scan_end_tag<R: BufRead>(
        &self,
        parser: &mut TaggedParser,
        scanner: &mut LineScanner<R>,
        locale: &str,
    ) -> Result<bool> {
        let spelling = self.end_tag_spelling(locale);
        let (name, end_locale) = match spelling.split_once('.') {
            Some((name, locale)) => (name.to_string(), locale.to_string()),
            None => (spelling, String::new()),
        };
        Ok(parser.lookup_end_tag(scanner, &name, &end_locale)? == LineKind::End)
    }

    /// Expected end-tag spelling for an occurrence with `locale`.
    fn end_tag_spelling(&self, locale: &str) -> String {
        let forward = if locale.is_empty() {
            self.base.clone()
        } else {
            format!("{}.{}", self.base, locale)
        };
        match self.def.end_rule {
            EndTagRule::Normal => forward,
            EndTagRule::ReversedWithLocalePrefix => {
                capitalize_first(forward.chars().rev().collect())
            }
        }
    }

    fn ratchet_configured(&self) -> bool {
        match self.def.accept {
            AcceptPolicy::Once => true,
            AcceptPolicy::PreferredLocale => !self.preferred.main().is_empty(),
            AcceptPolicy::LocaleOnly => !self.default_main.is_empty(),
        }
    }

    /// Ratchet level an occurrence would capture at, `None` when it is
    /// to be discarded.
    fn ratchet_level(&self, occurrence: &Locale) -> Option<i8> {
        let target_main = match self.def.accept {
            AcceptPolicy::LocaleOnly => self.default_main.as_str(),
            _ => self.preferred.main(),
        };
        if occurrence.is_empty() {
            // Only the preferred-locale policy falls back to
            // unlocalized data.
            return match self.def.accept {
                AcceptPolicy::PreferredLocale => Some(0),
                _ => None,
            };
        }
        if occurrence.main() != target_main {
            return None;
        }
        if occurrence.sub().is_empty() {
            return Some(1);
        }
        if !self.preferred.sub().is_empty() && occurrence.sub() == self.preferred.sub() {
            return Some(2);
        }
        None
    }

    /// Level of the capture currently held, `-1` before any capture.
    /// Strictly increasing: an equally good later occurrence loses.
    fn captured_level(&self) -> i8 {
        match &self.last_accepted {
            None => -1,
            Some(locale) if locale.is_empty() => 0,
            Some(locale) if locale.sub().is_empty() => 1,
            Some(_) => 2,
        }
    }
}

fn capitalize_first(s: String) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => s,
    }
}
