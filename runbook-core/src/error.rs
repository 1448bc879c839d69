//! Config-error value shared by the document parser, schema loader, and
//! (in `runbook-config`) the plan validator. Per spec §7 stratum 1, config
//! errors are data, never fatal to construction, and are keyed to the
//! offending block where one exists.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    /// Raw (non-normalized) id of the block this error is about, if any.
    pub block_id: Option<String>,
    pub message: String,
}

impl ConfigError {
    pub fn new(block_id: impl Into<Option<String>>, message: impl Into<String>) -> Self {
        Self {
            block_id: block_id.into(),
            message: message.into(),
        }
    }

    pub fn global(message: impl Into<String>) -> Self {
        Self {
            block_id: None,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.block_id {
            Some(id) => write!(f, "{id}: {}", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}
