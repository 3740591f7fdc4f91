//! Route identities and their scroll categories.
//!
//! A route identity is an opaque key for one logical screen. The classifier
//! decides, from fixed pattern lists, whether arriving at a route should
//! move the listening target and trigger restoration.

use crate::config::{ConfigError, RouteRules};
use regex::RegexSet;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque key identifying one navigable screen
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RouteId(String);

impl RouteId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Build the identity the application treats as one place: the path,
    /// plus the query string when there is one.
    pub fn from_path_and_query(path: &str, query: &str) -> Self {
        let query = query.trim_start_matches('?');
        if query.is_empty() {
            Self(path.to_string())
        } else {
            Self(format!("{path}?{query}"))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RouteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RouteId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RouteId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for RouteId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// How a route participates in scroll tracking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteCategory {
    /// Normal page: its root offset is recorded and restored
    Scrollable,
    /// Layer stacked over another page; leaves the page beneath untouched
    Overlay,
    /// Page with its own fixed-layout scroller; never scrolls the root
    NonScrolling,
}

impl RouteCategory {
    /// Whether arriving here moves the scroll listener's target
    pub fn owns_viewport(self) -> bool {
        matches!(self, RouteCategory::Scrollable)
    }
}

/// Maps route identities to categories using two pattern sets.
///
/// Classification is pure: the same identity always yields the same
/// category. A route matching both sets is an overlay.
#[derive(Debug, Clone)]
pub struct RouteClassifier {
    overlay: RegexSet,
    non_scrolling: RegexSet,
}

impl RouteClassifier {
    pub fn new(rules: &RouteRules) -> Result<Self, ConfigError> {
        let compile = |patterns: &[String]| {
            RegexSet::new(patterns)
                .map_err(|e| ConfigError::ValidationError(format!("invalid route pattern: {e}")))
        };

        Ok(Self {
            overlay: compile(&rules.overlay)?,
            non_scrolling: compile(&rules.non_scrolling)?,
        })
    }

    pub fn classify(&self, route: &RouteId) -> RouteCategory {
        if self.overlay.is_match(route.as_str()) {
            RouteCategory::Overlay
        } else if self.non_scrolling.is_match(route.as_str()) {
            RouteCategory::NonScrolling
        } else {
            RouteCategory::Scrollable
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn rules(overlay: &[&str], non_scrolling: &[&str]) -> RouteRules {
        RouteRules {
            overlay: overlay.iter().map(|s| s.to_string()).collect(),
            non_scrolling: non_scrolling.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_route_id_from_path_and_query() {
        assert_eq!(RouteId::from_path_and_query("/search", "").as_str(), "/search");
        assert_eq!(
            RouteId::from_path_and_query("/search", "q=fire").as_str(),
            "/search?q=fire"
        );
        assert_eq!(
            RouteId::from_path_and_query("/search", "?q=fire").as_str(),
            "/search?q=fire"
        );
        assert_ne!(
            RouteId::from_path_and_query("/search", "q=a"),
            RouteId::from_path_and_query("/search", "q=b")
        );
    }

    #[test]
    fn test_default_classification() {
        let classifier = RouteClassifier::new(&RouteRules::default()).unwrap();

        assert_eq!(classifier.classify(&"/".into()), RouteCategory::Scrollable);
        assert_eq!(classifier.classify(&"/feed".into()), RouteCategory::Scrollable);
        assert_eq!(classifier.classify(&"/profile".into()), RouteCategory::Scrollable);
        assert_eq!(classifier.classify(&"/settings".into()), RouteCategory::Overlay);
        assert_eq!(classifier.classify(&"/settings/privacy".into()), RouteCategory::Overlay);
        assert_eq!(classifier.classify(&"/post/42".into()), RouteCategory::Overlay);
        assert_eq!(classifier.classify(&"/watch".into()), RouteCategory::NonScrolling);
        assert_eq!(classifier.classify(&"/watch?v=9".into()), RouteCategory::NonScrolling);
        assert_eq!(classifier.classify(&"/messages/7".into()), RouteCategory::NonScrolling);
        // list page stays scrollable, only a conversation is fixed-layout
        assert_eq!(classifier.classify(&"/messages".into()), RouteCategory::Scrollable);
        // prefix must end at a segment boundary
        assert_eq!(classifier.classify(&"/watchlist".into()), RouteCategory::Scrollable);
    }

    #[test]
    fn test_overlay_wins_over_non_scrolling() {
        let classifier = RouteClassifier::new(&rules(&["^/sheet"], &["^/sheet"])).unwrap();
        assert_eq!(classifier.classify(&"/sheet".into()), RouteCategory::Overlay);
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let result = RouteClassifier::new(&rules(&["[oops"], &[]));
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_owns_viewport() {
        assert!(RouteCategory::Scrollable.owns_viewport());
        assert!(!RouteCategory::Overlay.owns_viewport());
        assert!(!RouteCategory::NonScrolling.owns_viewport());
    }

    proptest! {
        #[test]
        fn prop_classification_is_stable(path in "/[a-z0-9/?=&-]{0,24}") {
            let classifier = RouteClassifier::new(&RouteRules::default()).unwrap();
            let route = RouteId::new(path.clone());
            let first = classifier.classify(&route);
            prop_assert_eq!(first, classifier.classify(&route));
            prop_assert_eq!(first, classifier.classify(&RouteId::new(path)));
        }

        #[test]
        fn prop_unmatched_routes_default_to_scrollable(tail in "[a-z0-9]{1,12}") {
            let classifier = RouteClassifier::new(&rules(&["^/modal/"], &["^/player/"])).unwrap();
            let route = RouteId::new(format!("/page/{tail}"));
            prop_assert_eq!(classifier.classify(&route), RouteCategory::Scrollable);
        }
    }
}
