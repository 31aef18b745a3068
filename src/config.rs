//! Parser configuration
//!
//! Limits that guard a [Parser](crate::parser::Parser) against runaway input. The defaults put
//! no limit on anything; [ParserConfig::guarded] is a preset for untrusted input.
//!
//! Configurations deserialize with serde, with missing fields taking their defaults, so they can
//! be embedded in an application's own configuration file.

use serde::{Deserialize, Serialize};

/// Limits applied while parsing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Maximum number of tokens a single parse may consume.
    pub max_tokens: Option<usize>,
    /// Maximum context depth a focus may reach.
    pub max_depth: Option<usize>,
}

impl ParserConfig {
    /// No limits.
    pub fn unbounded() -> Self {
        ParserConfig::default()
    }

    /// Limits suited to input from untrusted sources.
    pub fn guarded() -> Self {
        ParserConfig {
            max_tokens: Some(1 << 20),
            max_depth: Some(4096),
        }
    }

    /// Looks up a preset by name.
    pub fn preset(name: &str) -> Option<Self> {
        match name {
            "unbounded" => Some(ParserConfig::unbounded()),
            "guarded" => Some(ParserConfig::guarded()),
            _ => None,
        }
    }

    pub fn with_max_tokens(mut self, limit: usize) -> Self {
        self.max_tokens = Some(limit);
        self
    }

    pub fn with_max_depth(mut self, limit: usize) -> Self {
        self.max_depth = Some(limit);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_unbounded() {
        let config = ParserConfig::default();
        assert_eq!(config, ParserConfig::unbounded());
        assert!(config.max_tokens.is_none());
        assert!(config.max_depth.is_none());
    }

    #[test]
    fn test_presets() {
        assert_eq!(ParserConfig::preset("guarded"), Some(ParserConfig::guarded()));
        assert_eq!(ParserConfig::preset("unbounded"), Some(ParserConfig::unbounded()));
        assert_eq!(ParserConfig::preset("strict"), None);
    }

    #[test]
    fn test_builders() {
        let config = ParserConfig::unbounded()
            .with_max_tokens(10)
            .with_max_depth(3);
        assert_eq!(config.max_tokens, Some(10));
        assert_eq!(config.max_depth, Some(3));
    }
}
