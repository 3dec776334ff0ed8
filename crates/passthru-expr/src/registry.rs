//! Pattern registry - the table of log patterns extraction runs on
//!
//! Built once from YAML and then only queried. A malformed entry fails the
//! build; nothing is validated lazily.

use std::collections::HashMap;
use std::path::Path;

use regex::{Captures, Regex};
use serde::Deserialize;
use tracing::debug;

use crate::command::CommandType;
use crate::error::{ExprError, ExprResult};

/// Patterns shipped with the crate
const DEFAULT_PATTERNS: &str = include_str!("../patterns/default.yaml");

/// Marker embedded in a pattern listing its field capture groups
const GROUPS_MARKER: &str = r"\*GROUPS_\(([^\)]+)\)\*";

/// Registry file layout
#[derive(Debug, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    name: Option<String>,
    patterns: Vec<PatternEntry>,
}

#[derive(Debug, Deserialize)]
struct PatternEntry {
    name: String,
    pattern: String,
}

/// One compiled pattern and the groups that carry its fields
#[derive(Debug, Clone)]
pub struct PatternDefinition {
    tag: CommandType,
    pattern: String,
    regex: Regex,
    capture_groups: Vec<usize>,
}

/// A single match of a pattern inside a larger text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternMatch {
    pub start: usize,
    pub end: usize,
    pub values: Vec<String>,
}

impl PatternDefinition {
    /// Compile a raw pattern carrying a `*GROUPS_(..)*` marker
    pub fn parse(tag: CommandType, raw: &str) -> ExprResult<Self> {
        let marker = Regex::new(GROUPS_MARKER)?;
        let groups = marker
            .captures(raw)
            .and_then(|caps| caps.get(1))
            .ok_or_else(|| ExprError::InvalidGroups {
                name: tag.to_string(),
                reason: "missing *GROUPS_(..)* marker".to_string(),
            })?;

        let capture_groups = groups
            .as_str()
            .split(',')
            .map(|g| g.trim().parse::<usize>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ExprError::InvalidGroups {
                name: tag.to_string(),
                reason: format!("'{}': {}", groups.as_str(), e),
            })?;

        let pattern = marker.replace_all(raw, "").into_owned();
        let regex = Regex::new(&pattern)?;

        let available = regex.captures_len();
        if let Some(bad) = capture_groups.iter().find(|&&g| g >= available) {
            return Err(ExprError::InvalidGroups {
                name: tag.to_string(),
                reason: format!("group {} out of range, pattern has {}", bad, available - 1),
            });
        }

        Ok(Self {
            tag,
            pattern,
            regex,
            capture_groups,
        })
    }

    pub fn tag(&self) -> CommandType {
        self.tag
    }

    /// Regex source without the groups marker
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn capture_groups(&self) -> &[usize] {
        &self.capture_groups
    }

    /// Only group 0 declared: the whole match is the single value
    pub fn uses_whole_match(&self) -> bool {
        self.capture_groups == [0]
    }

    /// Values of the first match, one per declared group
    pub fn evaluate(&self, text: &str) -> Option<Vec<String>> {
        self.regex.captures(text).map(|caps| self.values(&caps))
    }

    /// Every match with its position
    pub fn find_all(&self, text: &str) -> Vec<PatternMatch> {
        self.regex
            .captures_iter(text)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                Some(PatternMatch {
                    start: whole.start(),
                    end: whole.end(),
                    values: self.values(&caps),
                })
            })
            .collect()
    }

    /// Start offsets of every match
    pub fn match_starts(&self, text: &str) -> Vec<usize> {
        self.regex.find_iter(text).map(|m| m.start()).collect()
    }

    fn values(&self, caps: &Captures<'_>) -> Vec<String> {
        if self.uses_whole_match() {
            let whole = caps.get(0).map(|m| m.as_str().trim()).unwrap_or_default();
            return vec![whole.to_string()];
        }
        self.capture_groups
            .iter()
            .map(|&g| {
                caps.get(g)
                    .map(|m| m.as_str().trim().to_string())
                    .unwrap_or_default()
            })
            .collect()
    }
}

/// Immutable lookup table from command type to pattern
#[derive(Debug, Clone)]
pub struct PatternRegistry {
    name: Option<String>,
    definitions: HashMap<CommandType, PatternDefinition>,
}

impl PatternRegistry {
    /// Registry built from the bundled default patterns
    pub fn builtin() -> ExprResult<Self> {
        Self::from_yaml(DEFAULT_PATTERNS)
    }

    /// Build from YAML text
    pub fn from_yaml(yaml: &str) -> ExprResult<Self> {
        let file: RegistryFile = serde_yaml::from_str(yaml)?;
        let definitions = file
            .patterns
            .iter()
            .map(|entry| {
                let tag = CommandType::from_registry_name(&entry.name)
                    .ok_or_else(|| ExprError::UnknownPattern(entry.name.clone()))?;
                PatternDefinition::parse(tag, &entry.pattern)
            })
            .collect::<ExprResult<Vec<_>>>()?;

        let mut registry = Self::from_definitions(definitions)?;
        registry.name = file.name;
        Ok(registry)
    }

    /// Build from a YAML file
    pub fn from_file(path: impl AsRef<Path>) -> ExprResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Build from compiled definitions; every registered type must be present once
    pub fn from_definitions(
        definitions: impl IntoIterator<Item = PatternDefinition>,
    ) -> ExprResult<Self> {
        let mut map = HashMap::new();
        for definition in definitions {
            let tag = definition.tag();
            if map.insert(tag, definition).is_some() {
                return Err(ExprError::DuplicatePattern(tag));
            }
        }

        if let Some(missing) = CommandType::REGISTERED
            .iter()
            .find(|tag| !map.contains_key(*tag))
        {
            return Err(ExprError::MissingPattern(*missing));
        }

        debug!(patterns = map.len(), "Built pattern registry");
        Ok(Self {
            name: None,
            definitions: map,
        })
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn lookup(&self, tag: CommandType) -> Option<&PatternDefinition> {
        self.definitions.get(&tag)
    }

    pub(crate) fn require(&self, tag: CommandType) -> ExprResult<&PatternDefinition> {
        self.lookup(tag).ok_or(ExprError::MissingPattern(tag))
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Definitions in registration order
    pub fn definitions(&self) -> impl Iterator<Item = &PatternDefinition> {
        CommandType::REGISTERED
            .iter()
            .filter_map(|tag| self.definitions.get(tag))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry_is_complete() {
        let registry = PatternRegistry::builtin().unwrap();
        assert_eq!(registry.len(), CommandType::REGISTERED.len());
        assert_eq!(registry.name(), Some("PassThru shim log"));
        let connect = registry.lookup(CommandType::Connect).unwrap();
        assert_eq!(connect.capture_groups(), &[0, 1, 2, 3, 4, 5]);
        assert!(!connect.pattern().contains("GROUPS"));
    }

    #[test]
    fn test_parse_groups() {
        let def = PatternDefinition::parse(CommandType::Close, r"PTClose\((\d+)\)*GROUPS_(0,1)*").unwrap();
        assert_eq!(
            def.evaluate("1.0s ++ PTClose(3)"),
            Some(vec!["PTClose(3)".to_string(), "3".to_string()])
        );
    }

    #[test]
    fn test_whole_match_only() {
        let def = PatternDefinition::parse(CommandType::Close, r"PTClose\(\d+\)*GROUPS_(0)*").unwrap();
        assert!(def.uses_whole_match());
        assert_eq!(def.evaluate(" PTClose(1) "), Some(vec!["PTClose(1)".to_string()]));
    }

    #[test]
    fn test_unparseable_groups_fail() {
        let err = PatternDefinition::parse(CommandType::Close, r"PTClose\((\d+)\)*GROUPS_(0,x)*")
            .unwrap_err();
        assert!(matches!(err, ExprError::InvalidGroups { .. }));

        let err = PatternDefinition::parse(CommandType::Close, r"PTClose\((\d+)\)").unwrap_err();
        assert!(matches!(err, ExprError::InvalidGroups { .. }));

        let err = PatternDefinition::parse(CommandType::Close, r"PTClose\((\d+)\)*GROUPS_(2)*")
            .unwrap_err();
        assert!(matches!(err, ExprError::InvalidGroups { .. }));
    }

    #[test]
    fn test_unknown_name_fails() {
        let yaml = r#"
patterns:
  - name: PassThru Flash Regex
    pattern: 'PTFlash*GROUPS_(0)*'
"#;
        let err = PatternRegistry::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, ExprError::UnknownPattern(_)));
    }

    #[test]
    fn test_incomplete_registry_fails() {
        let yaml = r#"
patterns:
  - name: PassThru Close Regex
    pattern: 'PTClose\((\d+)\)*GROUPS_(0,1)*'
"#;
        let err = PatternRegistry::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, ExprError::MissingPattern(_)));
    }
}
