pub mod block;
pub mod config;
pub mod context;
pub mod recorder;
pub mod replay;
pub mod sequence;
pub mod session;
pub mod simulate;
pub mod trial;
pub use block::{BlockController, SessionOutcome, SessionStatus};
pub use config::{SessionConfig, TimeoutPolicy};
pub use context::{InputContext, InputEvent, NullRender, RenderContext, TrialProgress};
pub use recorder::{ExportRow, SessionRecorder, SessionSummary, TypeSummary};
pub use sequence::{BlockSequence, StructuredPattern};
pub use session::Session;
pub use simulate::{ParticipantProfile, SimulatedParticipant, SimulatedScreen, simulated_pair};
pub use trial::{Resolution, TrialOutcome, TrialRunner};
