//! Region configuration and validation.

use std::error::Error;
use std::fmt;

use femesh_core::MeshError;

/// Errors detected by [`RegionConfig::validate`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// A change-log limit of zero would collapse every log on its first
    /// record.
    ZeroChangeLimit {
        /// Which log the limit applies to.
        log: &'static str,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroChangeLimit { log } => {
                write!(f, "{log} change limit must be at least 1 or unlimited")
            }
        }
    }
}

impl Error for ConfigError {}

impl From<ConfigError> for MeshError {
    fn from(err: ConfigError) -> Self {
        MeshError::invalid_argument(err.to_string())
    }
}

/// Tunables of a root region. Slaves and point sets inherit their
/// master's configuration.
///
/// The change limits bound how many objects a change log enumerates
/// before it stops tracking them individually and reports "every object
/// of this kind changed". Clients then rescan instead of walking a huge
/// per-object list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegionConfig {
    /// Field change limit. Default: unlimited.
    pub max_field_changes: Option<usize>,
    /// Node change limit. Default: 50.
    pub max_node_changes: Option<usize>,
    /// Element change limit. Default: 50.
    pub max_element_changes: Option<usize>,
}

impl RegionConfig {
    /// Default node change limit.
    pub const DEFAULT_MAX_NODE_CHANGES: usize = 50;

    /// Default element change limit.
    pub const DEFAULT_MAX_ELEMENT_CHANGES: usize = 50;

    /// Configuration whose logs enumerate every change.
    pub fn unlimited() -> Self {
        Self {
            max_field_changes: None,
            max_node_changes: None,
            max_element_changes: None,
        }
    }

    /// Check the configuration for values the region cannot honour.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (log, limit) in [
            ("field", self.max_field_changes),
            ("node", self.max_node_changes),
            ("element", self.max_element_changes),
        ] {
            if limit == Some(0) {
                return Err(ConfigError::ZeroChangeLimit { log });
            }
        }
        Ok(())
    }
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            max_field_changes: None,
            max_node_changes: Some(Self::DEFAULT_MAX_NODE_CHANGES),
            max_element_changes: Some(Self::DEFAULT_MAX_ELEMENT_CHANGES),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(RegionConfig::default().validate().is_ok());
        assert!(RegionConfig::unlimited().validate().is_ok());
    }

    #[test]
    fn zero_limit_rejected() {
        let config = RegionConfig {
            max_node_changes: Some(0),
            ..RegionConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroChangeLimit { log: "node" })
        );
        let err: MeshError = config.validate().unwrap_err().into();
        assert!(matches!(err, MeshError::InvalidArgument { .. }));
    }
}
