use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("{field} is required")]
    MissingField { field: &'static str },
    #[error("{field} must be at most {max} characters (got {actual})")]
    FieldTooLong { field: &'static str, max: usize, actual: usize },
    #[error("`{0}` is not a valid email address")]
    InvalidEmail(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("{0} was not found")]
    NotFound(String),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("schema initialization failure: {0}")]
    Initialization(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl ApplicationError {
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Domain(_) => "validation",
            Self::NotFound(_) => "not_found",
            Self::Persistence(_) => "storage",
            Self::Initialization(_) => "schema_init",
            Self::Configuration(_) => "config_validation",
        }
    }

    /// Startup failures stop the process; everything else is reported and the
    /// command ends normally.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Initialization(_) | Self::Configuration(_))
    }
}
