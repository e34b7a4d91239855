use polars::prelude::PolarsError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, NovexonError>;

#[derive(Debug, Error)]
pub enum NovexonError {
    #[error("table `{table}` is missing required columns: {}", columns.join(", "))]
    MissingColumns {
        table: String,
        columns: Vec<String>,
    },
    #[error("invalid value `{value}` in column `{column}`")]
    InvalidValue { column: String, value: String },
    #[error("no annotated `{metric}` values to fit a reference ECDF for sample `{sample_name}`, partition `{partition}`")]
    EmptyReference {
        sample_name: String,
        partition: String,
        metric: String,
    },
    #[error("{event_type} event `{exon_id}` has no partner exon coordinates")]
    MissingPartner { exon_id: String, event_type: String },
    #[error(transparent)]
    Polars(#[from] PolarsError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl NovexonError {
    pub fn invalid(column: &str, value: &str) -> Self {
        NovexonError::InvalidValue {
            column: column.to_string(),
            value: value.to_string(),
        }
    }
}
