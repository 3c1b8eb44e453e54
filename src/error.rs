use thiserror::Error;

/// Outcomes surfaced by the store's public operations.
///
/// The boundary that exposes the store (an HTTP handler, the CLI) maps these
/// onto responses: `NotLoaded` is the service-unavailable class, `InvalidId`
/// and `InvalidDate` are client errors, `NotFound` is its own outcome, and
/// the remaining variants describe merge/persist failures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No dataset could be loaded; queries cannot be answered.
    #[error("employee database not loaded")]
    NotLoaded,

    /// The queried employee id was empty or malformed.
    #[error("invalid employee id `{0}`")]
    InvalidId(String),

    /// The queried date could not be parsed in any accepted format.
    #[error("invalid date `{0}`")]
    InvalidDate(String),

    /// No stored key matched any id candidate, or the DOB filter was empty.
    #[error("no matching record")]
    NotFound,

    /// Two distinct stored keys matched one query. Data-integrity condition:
    /// the dataset holds both the padded and the unpadded form of one id.
    #[error("employee id `{query}` matches distinct records `{first}` and `{second}`")]
    AmbiguousId {
        query: String,
        first: String,
        second: String,
    },

    /// The uploaded table has no recognizable employee-id column.
    #[error("upload has no employee id column")]
    MissingKeyColumn,

    /// The uploaded file is neither CSV nor XLSX.
    #[error("unsupported upload format `{0}`")]
    UnsupportedFormat(String),

    #[error("merge failed: {0}")]
    Merge(#[source] anyhow::Error),

    /// Snapshot persistence failed in both the Parquet and the CSV form.
    #[error("snapshot write failed: {0}")]
    Persist(#[source] anyhow::Error),

    #[error("reset failed: {0}")]
    Reset(#[source] anyhow::Error),
}
