use crate::AbstractType;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while building or running a table operation.
///
/// Validation variants are produced before any statement reaches the driver, `Execution`
/// wraps whatever the driver reported.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid input `{input}`, expected {expected}")]
    InvalidInput { input: String, expected: String },

    #[error("Table `{0}` does not exist in the database")]
    UnknownTable(String),

    #[error("Column `{column}` is not a valid column of table `{table}`")]
    UnknownColumn { table: String, column: String },

    #[error("Unsupported column type `{0}`")]
    UnsupportedType(String),

    #[error("Cannot convert `{value}` into {expected:?} for column `{column}`")]
    TypeCoercion {
        column: String,
        value: String,
        expected: AbstractType,
    },

    #[error("Cannot parse the definition of table `{table}`: {message}")]
    SchemaParse { table: String, message: String },

    #[error("Table `{table}` declares more than one primary key: {columns:?}")]
    AmbiguousPrimaryKey { table: String, columns: Vec<String> },

    #[error("Column `{column}` is required to insert into table `{table}`")]
    MissingRequiredColumn { table: String, column: String },

    #[error(
        "{operation} on table `{table}` requires a where clause, otherwise pass all_rows = true"
    )]
    MissingWhereClause {
        table: String,
        operation: &'static str,
    },

    #[error("Cannot join table `{table}` with `{target}`: {reason}")]
    JoinResolution {
        table: String,
        target: String,
        reason: String,
    },

    #[error("{0:#}")]
    Execution(anyhow::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn invalid_input(input: impl Into<String>, expected: impl Into<String>) -> Self {
        Error::InvalidInput {
            input: input.into(),
            expected: expected.into(),
        }
    }
    pub fn unknown_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        Error::UnknownColumn {
            table: table.into(),
            column: column.into(),
        }
    }
    /// Whether the error was raised by input validation, before any statement was sent.
    pub fn is_validation(&self) -> bool {
        !matches!(self, Error::Execution(..))
    }
}

impl From<anyhow::Error> for Error {
    fn from(value: anyhow::Error) -> Self {
        Error::Execution(value)
    }
}
