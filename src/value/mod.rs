pub mod aggregate;
pub mod reported;

pub use aggregate::aggregate;
pub use reported::{to_reported_value, ReportedValue, Sample};
