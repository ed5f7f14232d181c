use thiserror::Error;

/// A task row that breaks the data model. Rows that fail are kept out of
/// every derived view.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing field `{0}`")]
    MissingField(&'static str),
    #[error("field `title` is empty")]
    EmptyTitle,
    #[error("field `{field}` is not a calendar date: {value:?}")]
    InvalidDate { field: &'static str, value: String },
    #[error("field `{field}` is not a time of day: {value:?}")]
    InvalidTime { field: &'static str, value: String },
    #[error("field `priority` must be Low, Medium or High, got {value:?}")]
    InvalidPriority { value: String },
}

impl ValidationError {
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::MissingField(field) => field,
            ValidationError::EmptyTitle => "title",
            ValidationError::InvalidDate { field, .. } => field,
            ValidationError::InvalidTime { field, .. } => field,
            ValidationError::InvalidPriority { .. } => "priority",
        }
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("store returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("not signed in or session expired")]
    Unauthorized,
    #[error("{0} not found")]
    NotFound(String),
    #[error("unexpected response: {0}")]
    Decode(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing config value `{0}`")]
    Missing(&'static str),
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("could not write config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("invalid log filter: {0}")]
    Logging(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("invalid task: {0}")]
    Validation(#[from] ValidationError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
