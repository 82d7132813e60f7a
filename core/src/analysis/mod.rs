pub mod extractor;
pub mod prompt;

pub use extractor::{AnomalySummary, DerivedStatistics, ThresholdBand};
