pub mod error;
pub mod plot;
pub mod report;
pub mod value;

// Convenience re-exports
pub use error::ReportError;
pub use report::reporter::{EpochTable, FinalizedValue, Reporter, ReporterState, SortMode, StreamStats};
pub use report::sink::{Level, LogSink, TracingSink};
pub use report::stream::EpochStream;
pub use report::timespan::format_timespan;
pub use value::{aggregate, to_reported_value, ReportedValue, Sample};
