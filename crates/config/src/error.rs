use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// One or more required variables are unset or blank.
    #[error("missing required environment variables: {}", .names.join(", "))]
    Missing { names: Vec<&'static str> },

    /// A variable is set but its value cannot be used.
    #[error("{name} {reason} (got {value:?})")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("{name} is not a valid URL: {source}")]
    InvalidUrl {
        name: &'static str,
        #[source]
        source: url::ParseError,
    },
}

impl Error {
    #[must_use]
    pub fn invalid(name: &'static str, value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            name,
            value: value.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
