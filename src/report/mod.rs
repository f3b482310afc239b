pub mod reporter;
pub mod sink;
pub mod stream;
pub mod timespan;

pub use reporter::{EpochTable, FinalizedValue, Reporter, ReporterState, SortMode, StreamStats};
pub use sink::{Level, LogSink, TracingSink};
pub use stream::EpochStream;
pub use timespan::format_timespan;
