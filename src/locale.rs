//! Locale suffix handling.
//!
//! Tag locales are spelled `<lang>` or `<lang>_<COUNTRY...>`; splitting
//! on the first `_` separates the main locale from the sub-locale.

use std::fmt;

/// A parsed locale suffix.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Locale {
    main: String,
    sub: String,
}

impl Locale {
    /// Split a locale spelling at the first `_`. An empty spelling
    /// parses to the empty ("no locale") value.
    pub fn parse(spelling: &str) -> Self {
        match spelling.split_once('_') {
            Some((main, sub)) => Self {
                main: main.to_string(),
                sub: sub.to_string(),
            },
            None => Self {
                main: spelling.to_string(),
                sub: String::new(),
            },
        }
    }

    pub fn main(&self) -> &str {
        &self.main
    }

    pub fn sub(&self) -> &str {
        &self.sub
    }

    /// True for the "no locale" value.
    pub fn is_empty(&self) -> bool {
        self.main.is_empty() && self.sub.is_empty()
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.sub.is_empty() {
            write!(f, "{}", self.main)
        } else {
            write!(f, "{}_{}", self.main, self.sub)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_on_first_underscore() {
        let locale = Locale::parse("de_DE");
        assert_eq!(locale.main(), "de");
        assert_eq!(locale.sub(), "DE");
    }

    #[test]
    fn test_further_underscores_stay_in_sub() {
        let locale = Locale::parse("sr_RS_latin");
        assert_eq!(locale.main(), "sr");
        assert_eq!(locale.sub(), "RS_latin");
    }

    #[test]
    fn test_main_only() {
        let locale = Locale::parse("fr");
        assert_eq!(locale.main(), "fr");
        assert!(locale.sub().is_empty());
        assert!(!locale.is_empty());
    }

    #[test]
    fn test_empty_round_trip() {
        assert!(Locale::parse("").is_empty());
        assert_eq!(Locale::parse("de_DE").to_string(), "de_DE");
        assert_eq!(Locale::parse("de").to_string(), "de");
    }
}
