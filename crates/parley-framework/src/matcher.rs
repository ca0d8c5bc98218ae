//! Trigger evaluation for idle conversations.
//!
//! A [`Matcher`] is the compiled form of a descriptor's trigger criteria: an
//! optional set of accepted [`EventType`]s and an optional pattern. Patterns
//! are always compiled case-insensitively and applied exactly as authored,
//! so `^mood$` only matches the whole text while `(help me)` matches
//! anywhere in it.
//!
//! ```rust
//! use parley_core::{ConversationKey, Event, EventType};
//! use parley_framework::{MatchLimits, Matcher};
//!
//! let matcher = Matcher::compile(
//!     &[EventType::Message],
//!     Some(r"^([a-z ]{2})(\d+)([a-z ]{2})$"),
//!     &MatchLimits::default(),
//! )
//! .unwrap();
//!
//! let event = Event::text_event(EventType::Message, ConversationKey::channel("C1"), "AB12xy");
//! let captures = matcher.matches(&event).unwrap();
//! assert_eq!(captures.get(2), Some("12"));
//! ```

use std::collections::HashSet;

use regex::{Regex, RegexBuilder};
use tracing::warn;

use parley_core::{Event, EventType};

/// Upper bounds applied to pattern matching.
///
/// Matching with the `regex` crate is linear in the input, so these limits
/// bound both compile-time program size and per-event work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchLimits {
    /// Texts longer than this many bytes are never pattern-matched.
    pub max_text_bytes: usize,
    /// Maximum compiled size of a single pattern, in bytes.
    pub regex_size_limit: usize,
}

impl Default for MatchLimits {
    fn default() -> Self {
        Self {
            max_text_bytes: 4096,
            regex_size_limit: 1 << 20,
        }
    }
}

// ============================================================================
// Captures
// ============================================================================

/// Capture groups extracted by a successful match.
///
/// Index 0 is the whole match; 1..n are the parenthesized groups in order.
/// Groups that did not participate in the match are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Captures {
    groups: Vec<Option<String>>,
}

impl Captures {
    /// Returns an empty capture set.
    ///
    /// Handlers invoked through an armed conversation, or matched on event
    /// type alone, receive this.
    pub fn empty() -> Self {
        Self::default()
    }

    fn from_regex(caps: &regex::Captures<'_>) -> Self {
        Self {
            groups: caps
                .iter()
                .map(|m| m.map(|m| m.as_str().to_string()))
                .collect(),
        }
    }

    /// Returns group `index`, if it exists and participated.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.groups.get(index).and_then(|g| g.as_deref())
    }

    /// Returns the whole match (group 0).
    pub fn whole(&self) -> Option<&str> {
        self.get(0)
    }

    /// Returns the number of groups, including group 0.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Returns `true` if nothing was captured.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Iterates over all groups in index order.
    pub fn iter(&self) -> impl Iterator<Item = Option<&str>> {
        self.groups.iter().map(|g| g.as_deref())
    }
}

// ============================================================================
// Matcher
// ============================================================================

/// The compiled trigger of one handler.
#[derive(Debug, Clone)]
pub struct Matcher {
    event_types: HashSet<EventType>,
    pattern: Option<Regex>,
    max_text_bytes: usize,
}

impl Matcher {
    /// Compiles trigger criteria.
    ///
    /// An empty `event_types` slice accepts every event type; a `None`
    /// pattern accepts any (or no) text.
    pub fn compile(
        event_types: &[EventType],
        pattern: Option<&str>,
        limits: &MatchLimits,
    ) -> Result<Self, regex::Error> {
        let pattern = pattern
            .map(|p| {
                RegexBuilder::new(p)
                    .case_insensitive(true)
                    .size_limit(limits.regex_size_limit)
                    .build()
            })
            .transpose()?;

        Ok(Self {
            event_types: event_types.iter().copied().collect(),
            pattern,
            max_text_bytes: limits.max_text_bytes,
        })
    }

    /// Returns `true` if this matcher accepts events of type `ty`.
    pub fn accepts_type(&self, ty: EventType) -> bool {
        self.event_types.is_empty() || self.event_types.contains(&ty)
    }

    /// Returns the pattern source, if any.
    pub fn pattern(&self) -> Option<&str> {
        self.pattern.as_ref().map(Regex::as_str)
    }

    /// Evaluates this matcher against `event`.
    ///
    /// Returns the capture groups on success; a type-only matcher returns an
    /// empty set.
    pub fn matches(&self, event: &Event) -> Option<Captures> {
        if !self.accepts_type(event.event_type()) {
            return None;
        }

        let Some(pattern) = &self.pattern else {
            return Some(Captures::empty());
        };

        let text = event.text()?;
        if text.len() > self.max_text_bytes {
            warn!(
                key = %event.key(),
                len = text.len(),
                limit = self.max_text_bytes,
                "Text exceeds match limit, skipping pattern"
            );
            return None;
        }

        pattern.captures(text).map(|caps| Captures::from_regex(&caps))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::ConversationKey;

    fn event(ty: EventType, text: Option<&str>) -> Event {
        let builder = Event::builder(ty, ConversationKey::new("C1", "U1"));
        match text {
            Some(text) => builder.text(text).build(),
            None => builder.build(),
        }
    }

    fn compile(types: &[EventType], pattern: Option<&str>) -> Matcher {
        Matcher::compile(types, pattern, &MatchLimits::default()).unwrap()
    }

    #[test]
    fn test_type_filter() {
        let matcher = compile(&[EventType::DirectMention, EventType::DirectMessage], None);

        assert!(matcher.matches(&event(EventType::DirectMessage, Some("hi"))).is_some());
        assert!(matcher.matches(&event(EventType::Message, Some("hi"))).is_none());
    }

    #[test]
    fn test_empty_types_accept_any() {
        let matcher = compile(&[], None);
        let caps = matcher.matches(&event(EventType::PinAdded, None)).unwrap();
        assert!(caps.is_empty());
    }

    #[test]
    fn test_pattern_is_case_insensitive_and_unanchored() {
        let matcher = compile(&[], Some("(help me)"));
        let caps = matcher
            .matches(&event(EventType::Message, Some("Please HELP ME now")))
            .unwrap();

        assert_eq!(caps.whole(), Some("HELP ME"));
        assert_eq!(caps.get(1), Some("HELP ME"));
    }

    #[test]
    fn test_anchored_pattern_requires_full_text() {
        let matcher = compile(&[], Some("^mood$"));

        assert!(matcher.matches(&event(EventType::Message, Some("Mood"))).is_some());
        assert!(matcher.matches(&event(EventType::Message, Some("bad mood"))).is_none());
    }

    #[test]
    fn test_pattern_requires_text() {
        let matcher = compile(&[], Some(".*"));
        assert!(matcher.matches(&event(EventType::FileShared, None)).is_none());
    }

    #[test]
    fn test_capture_groups_in_order() {
        let matcher = compile(&[EventType::Message], Some(r"^([a-z ]{2})(\d+)([a-z ]{2})$"));
        let caps = matcher
            .matches(&event(EventType::Message, Some("ab12xy")))
            .unwrap();

        let groups: Vec<_> = caps.iter().collect();
        assert_eq!(
            groups,
            vec![Some("ab12xy"), Some("ab"), Some("12"), Some("xy")]
        );
    }

    #[test]
    fn test_non_participating_group_is_none() {
        let matcher = compile(&[], Some("(a)|(b)"));
        let caps = matcher.matches(&event(EventType::Message, Some("b"))).unwrap();

        assert_eq!(caps.len(), 3);
        assert_eq!(caps.get(1), None);
        assert_eq!(caps.get(2), Some("b"));
    }

    #[test]
    fn test_malformed_pattern_fails_to_compile() {
        assert!(Matcher::compile(&[], Some("(unclosed"), &MatchLimits::default()).is_err());
    }

    #[test]
    fn test_oversized_text_is_not_matched() {
        let limits = MatchLimits {
            max_text_bytes: 8,
            ..MatchLimits::default()
        };
        let matcher = Matcher::compile(&[], Some("help"), &limits).unwrap();

        assert!(matcher.matches(&event(EventType::Message, Some("help"))).is_some());
        assert!(
            matcher
                .matches(&event(EventType::Message, Some("please help me")))
                .is_none()
        );
    }
}
