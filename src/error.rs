use thiserror::Error;

/// Errors surfaced by the reporting core.
///
/// Contract violations (bad inputs, lifecycle misuse) are always returned as
/// errors and must not be swallowed by the calling loop.  Numerical-quality
/// problems (empty series, non-finite weights) are *not* errors: aggregation
/// degrades to NaN with a logged warning so a training run survives an
/// isolated bad statistic.
#[derive(Debug, Error)]
pub enum ReportError {
    /// A registered measurement had more than one element.
    #[error("value must reduce to a single scalar, got {0} elements")]
    NotScalar(usize),

    /// A caller tried to register under a key the reporter writes itself.
    #[error("`{0}` is a reserved stat key")]
    ReservedKey(String),

    /// One key's series mixed plain and weighted samples.
    #[error("cannot aggregate mixed reported-value kinds for one key")]
    MixedValueKinds,

    /// Mutation was attempted on a stream that was already finalized.
    #[error("epoch stream is already finished")]
    StreamFinished,

    /// The reporter's epoch moved while a stream was being observed.
    #[error("epoch changed during observation: reporter at {reporter}, stream at {stream}")]
    EpochMismatch { reporter: usize, stream: usize },

    /// A query defaulted to the latest epoch but nothing has been finalized.
    #[error("no finished epochs recorded yet")]
    NoFinishedEpochs,

    /// A query named an (epoch, stream, key) cell that was never finalized.
    #[error("no stats recorded for epoch {epoch}, stream `{stream}`, key `{key}`")]
    StatNotFound {
        epoch: usize,
        stream: String,
        key: String,
    },

    /// A query named a stream that was never finalized for the epoch.
    #[error("no stats recorded for epoch {epoch}, stream `{stream}`")]
    StreamNotFound { epoch: usize, stream: String },

    /// Filesystem failure while writing plots or state.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// PNG encoding failure while writing plots.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// JSON (de)serialization failure in state save/load.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
