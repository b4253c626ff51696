use std::env;

use serde::{Deserialize, Serialize};
use sheetcalc_core::Locale;

use crate::context::DEFAULT_MAX_NAME_DEPTH;
use crate::error::{CalcError, CalcResult};

/// Recalculation engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Locale tag used for text coercion and formatting
    pub locale: String,
    /// How deep defined names may refer to other names
    pub max_name_depth: usize,
    /// Fail formulas calling unknown functions instead of evaluating to `#NAME?`
    pub reject_unknown_functions: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            locale: "en-US".to_string(),
            max_name_depth: DEFAULT_MAX_NAME_DEPTH,
            reject_unknown_functions: false,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> CalcResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> CalcResult<Self> {
        let mut config = Self::default();

        if let Some(locale) = lookup("SHEETCALC_LOCALE") {
            config.locale = locale;
        }
        if let Some(depth) = lookup("SHEETCALC_MAX_NAME_DEPTH") {
            config.max_name_depth = depth.trim().parse().map_err(|_| {
                CalcError::InvalidConfig(format!("SHEETCALC_MAX_NAME_DEPTH={depth}"))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> CalcResult<()> {
        self.locale()?;
        Ok(())
    }

    /// The configured locale, unknown tags are an error
    pub fn locale(&self) -> CalcResult<Locale> {
        Ok(self.locale.parse::<Locale>()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = EngineConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.locale().unwrap().tag, "en-US");
        assert_eq!(config.max_name_depth, 64);
    }

    #[test]
    fn test_overrides() {
        let config = EngineConfig::from_lookup(lookup(&[
            ("SHEETCALC_LOCALE", "cs-CZ"),
            ("SHEETCALC_MAX_NAME_DEPTH", "8"),
        ]))
        .unwrap();
        assert_eq!(config.locale().unwrap().tag, "cs-CZ");
        assert_eq!(config.max_name_depth, 8);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            EngineConfig::from_lookup(lookup(&[("SHEETCALC_MAX_NAME_DEPTH", "deep")])),
            Err(CalcError::InvalidConfig(_))
        ));
        assert!(matches!(
            EngineConfig::from_lookup(lookup(&[("SHEETCALC_LOCALE", "xx-YY")])),
            Err(CalcError::Core(_))
        ));
    }

    #[test]
    fn test_deserialize_partial() {
        let config: EngineConfig = serde_json::from_str(r#"{"locale":"de-DE"}"#).unwrap();
        assert_eq!(config.locale, "de-DE");
        assert!(!config.reject_unknown_functions);
    }
}
