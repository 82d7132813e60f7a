//! Core of the geophysics survey tools: synthetic generators, CSV ingestion,
//! anomaly statistics and interpretation prompts for six survey kinds.
//!
//! Each tool plugs into the same pipeline through [`prelude::SurveyTool`];
//! [`view::ToolView`] holds the per-tool state the simulator drives.

pub mod analysis;
pub mod ingest;
pub mod math;
pub mod model;
pub mod prelude;
pub mod telemetry;
pub mod tools;
pub mod view;

pub use model::{DataOrigin, DataSet};
pub use prelude::{SurveyError, SurveyResult, SurveyTool, ToolKind, UploadKind};
pub use view::{Action, Pending, ToolView};
