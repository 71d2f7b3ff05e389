//! GPS run tracking: fix gating, per-axis Kalman smoothing, distance accumulation,
//! fixed-distance splits and session lifecycle.

pub mod config;
pub mod error;
pub mod filters;
pub mod fix;
pub mod gate;
pub mod geodesy;
pub mod live_status;
pub mod pace;
pub mod segmentation;
pub mod sensors;
pub mod session;
pub mod splits;
pub mod storage;
pub mod track;

pub use config::TrackerConfig;
pub use error::{TrackerError, TrackerResult};
pub use fix::{Displacement, FilteredFix, RawFix};
pub use segmentation::{Segment, SegmentationEngine};
pub use session::{FixReport, FixStatus, SessionController, SessionState, StopReport};
pub use storage::{FinishedSession, JsonFileStore, MemoryStore, SessionStore};
