pub mod dataset;

pub use dataset::{DataOrigin, DataSet};
