//! Error types shared by the pipeline stages.
//!
//! Each stage fails with its own variant of [`PipelineError`]. The
//! summarization stage never surfaces its internal transient/fatal split here;
//! it only reports [`PipelineError::Summarization`].

use crate::publish::ApiError;
use thiserror::Error;

/// Failure of a single pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// One or more required environment variables are unset or empty.
    #[error("required environment variables are not set: {}", .0.join(", "))]
    MissingEnv(Vec<String>),

    #[error("configuration error: {0}")]
    Config(String),

    /// The remote page answered with something other than 200, or could not be reached.
    #[error("request to {url} failed: {reason}")]
    Fetch { url: String, reason: String },

    /// Expected markup was missing from the listing page.
    #[error("could not locate article link: {0}")]
    Parse(String),

    #[error("summarization failed")]
    Summarization,

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Publish(#[from] ApiError),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// The model's JSON did not match the expected summary shape.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("model response is not a valid summary object: {0}")]
    Malformed(String),

    /// The first required field (in declaration order) that was absent.
    #[error("model response is missing required field `{0}`")]
    MissingField(&'static str),
}

impl From<serde_json::Error> for SchemaError {
    fn from(err: serde_json::Error) -> Self {
        SchemaError::Malformed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_env_lists_every_name() {
        let err = PipelineError::MissingEnv(vec!["PRESS_CODE".into(), "BASE_URL".into()]);
        assert_eq!(
            err.to_string(),
            "required environment variables are not set: PRESS_CODE, BASE_URL"
        );
    }

    #[test]
    fn test_schema_error_names_field() {
        let err = PipelineError::from(SchemaError::MissingField("meaning"));
        assert!(err.to_string().contains("`meaning`"));
    }
}
