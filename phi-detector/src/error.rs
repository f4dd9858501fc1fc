use thiserror::Error;

pub type Result<T, E = Error> = core::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid failure detector config: {field} {reason}")]
    InvalidConfig {
        field: &'static str,
        reason: &'static str,
    },
    #[error("load failure detector config error: {0}")]
    Config(#[from] config::ConfigError),
}

impl Error {
    pub(crate) fn invalid_config(field: &'static str, reason: &'static str) -> Self {
        Error::InvalidConfig { field, reason }
    }

    /// Name of the offending parameter when this is a configuration validation error.
    pub fn invalid_field(&self) -> Option<&'static str> {
        match self {
            Error::InvalidConfig { field, .. } => Some(field),
            Error::Config(_) => None,
        }
    }
}
