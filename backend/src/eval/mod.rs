pub mod metrics;

pub use metrics::{report, tally};
