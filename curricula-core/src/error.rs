use thiserror::Error;

/// Errors raised by link operations and the supporting program/template lifecycle.
///
/// Every non-database variant corresponds to a stable wire code, see [`LinkError::code`].
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("program not found")]
    ProgramNotFound,

    #[error("template not found")]
    TemplateNotFound,

    #[error("link not found")]
    NotFound,

    #[error("field `{field}` must be a number")]
    InvalidNumber { field: &'static str },

    #[error("field `{field}` must be a boolean")]
    InvalidBoolean { field: &'static str },

    #[error("invalid status: {0}")]
    InvalidStatus(String),

    #[error("no updatable fields in request")]
    NoFields,

    #[error("invalid order: {0}")]
    InvalidOrder(String),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("database connection lock poisoned")]
    Poisoned,
}

impl LinkError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::ProgramNotFound => "program_not_found",
            Self::TemplateNotFound => "template_not_found",
            Self::NotFound => "not_found",
            Self::InvalidNumber { .. } => "invalid_number",
            Self::InvalidBoolean { .. } => "invalid_boolean",
            Self::InvalidStatus(_) => "invalid_status",
            Self::NoFields => "no_fields",
            Self::InvalidOrder(_) => "invalid_order",
            Self::Database(_) | Self::Poisoned => "internal",
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidNumber { .. }
                | Self::InvalidBoolean { .. }
                | Self::InvalidStatus(_)
                | Self::NoFields
                | Self::InvalidOrder(_)
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ProgramNotFound | Self::TemplateNotFound | Self::NotFound
        )
    }
}

pub type LinkResult<T> = Result<T, LinkError>;
