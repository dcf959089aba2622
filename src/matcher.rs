use std::fmt;
use std::str::FromStr;

use regex::Regex;
use serde::Serialize;

/// How the stage argument is compared against resource identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Unanchored regular expression.
    #[default]
    Pattern,
    /// Plain substring; metacharacters have no special meaning.
    Literal,
}

impl FromStr for MatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pattern" | "regex" => Ok(MatchMode::Pattern),
            "literal" => Ok(MatchMode::Literal),
            other => Err(format!(
                "unknown match mode '{other}' (expected 'pattern' or 'literal')"
            )),
        }
    }
}

impl fmt::Display for MatchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchMode::Pattern => f.write_str("pattern"),
            MatchMode::Literal => f.write_str("literal"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum StageMatcher {
    Pattern(Regex),
    Literal(String),
}

impl StageMatcher {
    pub fn new(stage: &str, mode: MatchMode) -> Result<Self, regex::Error> {
        match mode {
            MatchMode::Pattern => Ok(StageMatcher::Pattern(Regex::new(stage)?)),
            MatchMode::Literal => Ok(StageMatcher::Literal(stage.to_string())),
        }
    }

    pub fn is_match(&self, resource_id: &str) -> bool {
        match self {
            StageMatcher::Pattern(re) => re.is_match(resource_id),
            StageMatcher::Literal(stage) => resource_id.contains(stage.as_str()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            StageMatcher::Pattern(re) => re.as_str(),
            StageMatcher::Literal(stage) => stage,
        }
    }

    pub fn mode(&self) -> MatchMode {
        match self {
            StageMatcher::Pattern(_) => MatchMode::Pattern,
            StageMatcher::Literal(_) => MatchMode::Literal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_is_unanchored() {
        let matcher = StageMatcher::new("staging", MatchMode::Pattern).unwrap();
        assert!(matcher.is_match("asg-staging-1"));
        assert!(!matcher.is_match("asg-prod-1"));
    }

    #[test]
    fn test_pattern_metacharacters_are_live() {
        let matcher = StageMatcher::new("st.ge", MatchMode::Pattern).unwrap();
        assert!(matcher.is_match("asg-stage-1"));
        assert!(matcher.is_match("asg-stXge-1"));
    }

    #[test]
    fn test_literal_ignores_metacharacters() {
        let matcher = StageMatcher::new("st.ge", MatchMode::Literal).unwrap();
        assert!(!matcher.is_match("asg-stage-1"));
        assert!(matcher.is_match("asg-st.ge-1"));
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(StageMatcher::new("stag(ing", MatchMode::Pattern).is_err());
        assert!(StageMatcher::new("stag(ing", MatchMode::Literal).is_ok());
    }

    #[test]
    fn test_match_mode_from_str() {
        assert_eq!("pattern".parse::<MatchMode>().unwrap(), MatchMode::Pattern);
        assert_eq!("Regex".parse::<MatchMode>().unwrap(), MatchMode::Pattern);
        assert_eq!("literal".parse::<MatchMode>().unwrap(), MatchMode::Literal);
        assert!("glob".parse::<MatchMode>().is_err());
    }

    #[test]
    fn test_mode_and_source_round_trip() {
        let matcher = StageMatcher::new("^asg-", MatchMode::Pattern).unwrap();
        assert_eq!(matcher.mode(), MatchMode::Pattern);
        assert_eq!(matcher.as_str(), "^asg-");
        assert_eq!(MatchMode::Literal.to_string(), "literal");
    }
}
