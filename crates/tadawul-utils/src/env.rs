//! Environment variable helpers
//!
//! Configuration loaders read several variables at once and report every
//! missing one together instead of failing on the first.

use std::collections::HashMap;

/// Reads variables from a source and records which required ones are absent
pub struct EnvReader {
    source: Box<dyn Fn(&str) -> Option<String>>,
    missing: Vec<String>,
}

impl EnvReader {
    /// Read from the process environment
    pub fn from_process() -> Self {
        Self::with_source(|key| std::env::var(key).ok())
    }

    /// Read from a fixed map, mainly for tests
    pub fn from_map(vars: HashMap<String, String>) -> Self {
        Self::with_source(move |key| vars.get(key).cloned())
    }

    fn with_source(source: impl Fn(&str) -> Option<String> + 'static) -> Self {
        Self {
            source: Box::new(source),
            missing: Vec::new(),
        }
    }

    /// Value of an optional variable; blank values count as unset
    pub fn optional(&self, key: &str) -> Option<String> {
        (self.source)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    /// Value of a required variable, or an empty string after recording it as missing
    pub fn required(&mut self, key: &str) -> String {
        match self.optional(key) {
            Some(value) => value,
            None => {
                self.missing.push(key.to_string());
                String::new()
            }
        }
    }

    /// Whether a variable is set to `true` (case-insensitive)
    pub fn flag(&self, key: &str) -> bool {
        self.optional(key)
            .is_some_and(|v| v.eq_ignore_ascii_case("true"))
    }

    /// Names of required variables that were not set, in the order they were asked for
    pub fn missing(&self) -> &[String] {
        &self.missing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reader(pairs: &[(&str, &str)]) -> EnvReader {
        EnvReader::from_map(
            pairs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_required_collects_all_missing() {
        let mut env = reader(&[("A", "1")]);
        assert_eq!(env.required("A"), "1");
        assert_eq!(env.required("B"), "");
        assert_eq!(env.required("C"), "");
        assert_eq!(env.missing(), ["B".to_string(), "C".to_string()]);
    }

    #[test]
    fn test_blank_counts_as_unset() {
        let mut env = reader(&[("A", "   ")]);
        assert!(env.optional("A").is_none());
        env.required("A");
        assert_eq!(env.missing().len(), 1);
    }

    #[test]
    fn test_flag() {
        let env = reader(&[("MOCK_DATA", "TRUE"), ("OTHER", "yes")]);
        assert!(env.flag("MOCK_DATA"));
        assert!(!env.flag("OTHER"));
        assert!(!env.flag("UNSET"));
    }
}
