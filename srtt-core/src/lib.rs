pub mod block;
pub mod error;
pub mod position;
pub mod trial;

pub use block::{BlockStatistics, BlockType};
pub use error::{ConfigError, ExperimentError, RecordError};
pub use position::{KeyMap, Position};
pub use trial::{Attempt, TrialKey, TrialRecord, TrialState};
