use thiserror::Error;

/// Errors raised by model assembly and decoding.
///
/// Every variant is fatal for the decode call that produced it; nothing is
/// retried and no partial output is returned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PloidyError {
    #[error(
        "no {table} reference row for coverage={coverage}, fetal_fraction={fetal_fraction}, state={state}"
    )]
    MissingReference {
        table: String,
        coverage: f64,
        fetal_fraction: f64,
        state: u8,
    },

    #[error(
        "duplicate {table} reference row for coverage={coverage}, fetal_fraction={fetal_fraction}, state={state}"
    )]
    DuplicateReference {
        table: String,
        coverage: f64,
        fetal_fraction: f64,
        state: u8,
    },

    #[error("invalid parameter: {message}")]
    InvalidParameter { message: String },

    #[error("malformed row {index}: {message}")]
    MalformedRow { index: usize, message: String },

    #[error("classifier error: {message}")]
    Classifier { message: String },
}

pub type Result<T> = std::result::Result<T, PloidyError>;

impl PloidyError {
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            message: message.into(),
        }
    }

    pub fn malformed_row(index: usize, message: impl Into<String>) -> Self {
        Self::MalformedRow {
            index,
            message: message.into(),
        }
    }

    pub fn classifier(message: impl Into<String>) -> Self {
        Self::Classifier {
            message: message.into(),
        }
    }
}
