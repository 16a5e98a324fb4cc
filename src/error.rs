// Error types for the WAN route audit

use thiserror::Error;

/// Main error type for the audit
#[derive(Error, Debug)]
pub enum AuditError {
    #[error("No routing table entries found for device {device_id}")]
    Unparseable { device_id: String },

    #[error("Failed to read capture: {0}")]
    Capture(String),

    #[error("Inventory error: {0}")]
    Inventory(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

/// Result type alias using AuditError
pub type AuditResult<T> = Result<T, AuditError>;

impl AuditError {
    /// Convert error to an operator-facing message
    pub fn user_message(&self) -> String {
        match self {
            AuditError::Unparseable { device_id } => {
                format!(
                    "Route output for {} could not be parsed. Check that 'show ip route' (or 'show route' on ASA) was captured.",
                    device_id
                )
            }
            AuditError::Capture(_) => {
                "Session capture could not be read. Check the file path and that it is a plain text log.".to_string()
            }
            AuditError::Inventory(_) => {
                "Device inventory is incomplete. Every device needs a name, country and site.".to_string()
            }
            AuditError::Config(_) => {
                "Configuration error. Check your config file or command-line arguments.".to_string()
            }
            AuditError::Io(_) => "File system error. Check permissions and disk space.".to_string(),
            AuditError::Serialization(_) => {
                "Report could not be serialized. This might be a bug, please report it.".to_string()
            }
            AuditError::TomlParse(_) => "Config file is not valid TOML.".to_string(),
        }
    }

    /// Check if the error only excludes a single device from the run
    pub fn is_device_local(&self) -> bool {
        matches!(self, AuditError::Unparseable { .. } | AuditError::Capture(_))
    }
}
