//! Fixture files read by the CLI.
//!
//! A fixture holds a fleet snapshot, optional access scope rules and,
//! optionally, resolved roles per principal. JSON is read from `.json`
//! files; anything else is read as YAML.

use crate::domain::SimpleAccessScopeRules;
use crate::sac::authorizer::StaticDirectory;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Fixture {
    #[serde(flatten)]
    pub directory: StaticDirectory,
    /// Rules evaluated by `eas`
    pub rules: Option<SimpleAccessScopeRules>,
}

impl Fixture {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read fixture {}", path.display()))?;
        Self::parse(&content, path)
    }

    fn parse(content: &str, path: &Path) -> Result<Self> {
        let is_json = path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            serde_json::from_str(content)
                .with_context(|| format!("Invalid JSON fixture {}", path.display()))
        } else {
            serde_yaml::from_str(content)
                .with_context(|| format!("Invalid YAML fixture {}", path.display()))
        }
    }
}
