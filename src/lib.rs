//! Focus Engine - streaming signal fusion for live attention scoring
//!
//! The engine turns a stream of per-frame landmark snapshots and object
//! detections into a running focus score through a per-session pipeline:
//! blink tracking → expression calibration → hand activity → signal fusion →
//! session aggregation.
//!
//! ## Modules
//!
//! - **Trackers**: `blink`, `expression`, `hands` keep per-session temporal state
//! - **Fusion**: `fusion` derives tired/fidgety signals and the focus score
//! - **Sessions**: `session` runs one ordered worker per client over a `pipeline::FocusProcessor`
//! - **Wire**: `protocol` parses client messages and serializes results

pub mod aggregator;
pub mod blink;
pub mod clock;
pub mod config;
pub mod error;
pub mod expression;
pub mod feedback;
pub mod fusion;
pub mod hands;
pub mod logging;
pub mod pipeline;
pub mod protocol;
pub mod providers;
pub mod session;
pub mod types;
pub mod window;

pub use config::EngineConfig;
pub use error::EngineError;
pub use feedback::FeedbackReport;
pub use pipeline::{analyze_frame, FocusProcessor};
pub use protocol::{parse_message, FocusResultMessage, IngestOutcome};
pub use providers::{LandmarkProvider, NoopDetector, ObjectDetector, PrecomputedFrames};
pub use session::{Providers, Session, SessionRegistry, SubmitOutcome};
pub use types::{FocusResult, LandmarkSnapshot, SessionSummary};

/// Engine version reported by the CLI
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for emitted payloads
pub const PRODUCER_NAME: &str = "focus-engine";
