//! Codec configuration.

use serde::{Deserialize, Serialize};

use crate::error::CodecError;
use crate::schema::DuplicatePolicy;

/// Settings for one [`Codec`](crate::Codec). Missing JSON keys take their defaults.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CodecSettings {
    /// Scenario used when a message carries no scenario property.
    pub default_scenario: String,
    pub encode_error_as_warning: bool,
    pub decode_error_as_warning: bool,
    /// Hoist component members into the enclosing message instead of nesting them.
    pub inline_components: bool,
    pub duplicate_policy: DuplicatePolicy,
}

impl Default for CodecSettings {
    fn default() -> Self {
        Self {
            default_scenario: "base".to_string(),
            encode_error_as_warning: false,
            decode_error_as_warning: false,
            inline_components: false,
            duplicate_policy: DuplicatePolicy::LastWins,
        }
    }
}

impl CodecSettings {
    pub fn from_json_str(json: &str) -> Result<Self, CodecError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load from env, falling back to defaults for anything unset or unparsable:
    /// `ORCHESTRA_DEFAULT_SCENARIO`, `ORCHESTRA_ENCODE_ERROR_AS_WARNING`,
    /// `ORCHESTRA_DECODE_ERROR_AS_WARNING`, `ORCHESTRA_INLINE_COMPONENTS`,
    /// `ORCHESTRA_DUPLICATE_POLICY=last_wins|first_wins`.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let flag = |name: &str, default: bool| {
            lookup(name)
                .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
                .unwrap_or(default)
        };
        Self {
            default_scenario: lookup("ORCHESTRA_DEFAULT_SCENARIO")
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.default_scenario),
            encode_error_as_warning: flag("ORCHESTRA_ENCODE_ERROR_AS_WARNING", defaults.encode_error_as_warning),
            decode_error_as_warning: flag("ORCHESTRA_DECODE_ERROR_AS_WARNING", defaults.decode_error_as_warning),
            inline_components: flag("ORCHESTRA_INLINE_COMPONENTS", defaults.inline_components),
            duplicate_policy: lookup("ORCHESTRA_DUPLICATE_POLICY")
                .and_then(|v| match v.trim().to_ascii_lowercase().as_str() {
                    "last_wins" => Some(DuplicatePolicy::LastWins),
                    "first_wins" => Some(DuplicatePolicy::FirstWins),
                    _ => None,
                })
                .unwrap_or(defaults.duplicate_policy),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn json_fills_missing_keys_with_defaults() {
        let settings =
            CodecSettings::from_json_str(r#"{"inlineComponents": true, "duplicatePolicy": "first_wins"}"#).unwrap();
        assert!(settings.inline_components);
        assert_eq!(settings.duplicate_policy, DuplicatePolicy::FirstWins);
        assert_eq!(settings.default_scenario, "base");
        assert!(!settings.decode_error_as_warning);
    }

    #[test]
    fn env_lookup_overrides_defaults() {
        let env: HashMap<&str, &str> = [
            ("ORCHESTRA_DEFAULT_SCENARIO", "traded"),
            ("ORCHESTRA_DECODE_ERROR_AS_WARNING", "TRUE"),
            ("ORCHESTRA_INLINE_COMPONENTS", "1"),
            ("ORCHESTRA_DUPLICATE_POLICY", "bogus"),
        ]
        .into_iter()
        .collect();
        let settings = CodecSettings::from_lookup(|name| env.get(name).map(|v| v.to_string()));
        assert_eq!(settings.default_scenario, "traded");
        assert!(settings.decode_error_as_warning);
        assert!(!settings.encode_error_as_warning);
        assert!(settings.inline_components);
        assert_eq!(settings.duplicate_policy, DuplicatePolicy::LastWins);
    }

    #[test]
    fn empty_env_gives_defaults() {
        assert_eq!(CodecSettings::from_lookup(|_| None), CodecSettings::default());
    }
}
