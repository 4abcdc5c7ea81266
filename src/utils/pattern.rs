use crate::error::{PomupError, Result};
use regex::Regex;

/// Case-insensitive glob matcher for `--filter`. A pattern without `*` or `?`
/// matches as a substring.
pub struct PatternMatcher {
    regex: Regex,
}

impl PatternMatcher {
    pub fn new(pattern: &str) -> Result<Self> {
        let trimmed = pattern.trim();
        if trimmed.is_empty() {
            return Err(PomupError::ProjectValidation(
                "Filter pattern cannot be empty".to_string(),
            ));
        }

        let adjusted = if trimmed.contains(['*', '?']) {
            trimmed.to_string()
        } else {
            format!("*{trimmed}*")
        };

        let regex = Self::compile_glob(&adjusted)?;
        Ok(Self { regex })
    }

    pub fn matches(&self, value: &str) -> bool {
        self.regex.is_match(value)
    }

    fn compile_glob(pattern: &str) -> Result<Regex> {
        let mut regex = String::from("(?i)^");
        for ch in pattern.chars() {
            match ch {
                '*' => regex.push_str(".*"),
                '?' => regex.push('.'),
                _ => regex.push_str(&regex::escape(&ch.to_string())),
            }
        }
        regex.push('$');

        Regex::new(&regex).map_err(|e| {
            PomupError::ProjectValidation(format!("Invalid filter pattern '{pattern}': {e}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_matches_as_substring() {
        let matcher = PatternMatcher::new("jackson").unwrap();
        assert!(matcher.matches("com.fasterxml.jackson.core:jackson-databind"));
        assert!(matcher.matches("COM.FASTERXML.JACKSON.CORE:x"));
        assert!(!matcher.matches("org.slf4j:slf4j-api"));
    }

    #[test]
    fn globs_anchor_the_whole_key() {
        let matcher = PatternMatcher::new("org.slf4j:*").unwrap();
        assert!(matcher.matches("org.slf4j:slf4j-api"));
        assert!(!matcher.matches("orgxslf4j:slf4j-api"));
        assert!(!matcher.matches("ch.qos.logback:logback-classic"));

        let single = PatternMatcher::new("junit:juni?").unwrap();
        assert!(single.matches("junit:junit"));
    }

    #[test]
    fn rejects_blank_pattern() {
        assert!(PatternMatcher::new("   ").is_err());
    }
}
