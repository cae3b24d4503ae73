//! Engine configuration.
//!
//! Every field has a default, so an empty YAML document is a valid config.
//!
//! ```yaml
//! max-page-nodes: 1000
//! missing-edge: skip
//! overflow: windows
//! max-root-distance: 1000000
//! parallel-aggregation: false
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Largest collection shown as a single page.
pub const DEFAULT_MAX_PAGE_NODES: usize = 1000;

/// Hop budget when resolving an instance's ultimate root.
///
/// A well-formed oracle settles in far fewer hops; hitting the budget means the
/// root pointers loop.
pub const DEFAULT_MAX_ROOT_DISTANCE: usize = 1_000_000;

/// What to do when the oracle names a next hop the referrer has no reference to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissingEdgePolicy {
    /// Omit the hop, record it on the chain, and keep walking.
    #[default]
    Skip,
    /// Stop with `Error::Inconsistent`.
    Fail,
}

/// How a collection larger than `max-page-nodes` is presented.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OverflowMode {
    /// First page plus a count of the items left out.
    Truncate,
    /// A sample page plus index-addressed windows covering everything.
    #[default]
    Windows,
}

/// Configuration for a [`crate::RootAnalyzer`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Largest collection shown as a single page.
    pub max_page_nodes: usize,

    /// Handling of hops missing from the reference scan.
    pub missing_edge: MissingEdgePolicy,

    /// Presentation of collections above `max_page_nodes`.
    pub overflow: OverflowMode,

    /// Hop budget when resolving an instance's ultimate root.
    pub max_root_distance: usize,

    /// Resolve roots on the rayon thread pool during aggregation.
    pub parallel_aggregation: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_page_nodes: DEFAULT_MAX_PAGE_NODES,
            missing_edge: MissingEdgePolicy::default(),
            overflow: OverflowMode::default(),
            max_root_distance: DEFAULT_MAX_ROOT_DISTANCE,
            parallel_aggregation: false,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a YAML configuration.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the YAML is malformed or fails validation.
    pub fn from_yaml(content: &str) -> Result<Self> {
        // serde_yaml reads an empty document as null rather than an empty map
        let config: Self = if content.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str(content).map_err(|e| Error::Config(e.to_string()))?
        };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the file can't be read, or `Error::Config` if its
    /// content is invalid.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Save configuration to a YAML file.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if serialization fails, or `Error::Io` if the file
    /// can't be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            serde_yaml::to_string(self).map_err(|e| Error::Config(format!("YAML error: {e}")))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check that the configuration can drive an analysis.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` for a zero page size or hop budget.
    pub fn validate(&self) -> Result<()> {
        if self.max_page_nodes == 0 {
            return Err(Error::Config(
                "max-page-nodes must be at least 1".to_string(),
            ));
        }
        if self.max_root_distance == 0 {
            return Err(Error::Config(
                "max-root-distance must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
