use crate::config::CurationConfig;
use crate::ledger::LinkStatus;
use crate::url::CanonicalUrl;
use crate::ConfigError;
use regex::Regex;

/// Keep/skip rules applied to pending ledger entries
///
/// Patterns are regular expressions matched anywhere in the canonical URL.
/// When both lists match, skip wins.
#[derive(Debug, Clone, Default)]
pub struct CurationPolicy {
    keep: Vec<Regex>,
    skip: Vec<Regex>,
}

/// Counts reported after applying a policy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CurationSummary {
    pub kept: usize,
    pub skipped: usize,
    /// Pending entries no rule matched
    pub untouched: usize,
}

impl CurationPolicy {
    /// Compiles keep and skip pattern lists
    pub fn new(keep: &[String], skip: &[String]) -> Result<Self, ConfigError> {
        Ok(Self {
            keep: compile(keep)?,
            skip: compile(skip)?,
        })
    }

    /// Builds the policy from the `[curation]` config section
    pub fn from_config(config: &CurationConfig) -> Result<Self, ConfigError> {
        Self::new(&config.keep, &config.skip)
    }

    pub fn is_empty(&self) -> bool {
        self.keep.is_empty() && self.skip.is_empty()
    }

    /// Returns the status the rules assign to `url`, if any
    pub fn decide(&self, url: &CanonicalUrl) -> Option<LinkStatus> {
        let url = url.as_str();
        if self.skip.iter().any(|re| re.is_match(url)) {
            Some(LinkStatus::Skip)
        } else if self.keep.iter().any(|re| re.is_match(url)) {
            Some(LinkStatus::Keep)
        } else {
            None
        }
    }
}

fn compile(patterns: &[String]) -> Result<Vec<Regex>, ConfigError> {
    patterns
        .iter()
        .map(|pattern| {
            Regex::new(pattern).map_err(|source| ConfigError::InvalidPattern {
                pattern: pattern.clone(),
                source,
            })
        })
        .collect()
}
