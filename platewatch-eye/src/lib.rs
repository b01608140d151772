//! platewatch-eye: detection-to-record pipeline
//!
//! Turns per-frame vehicle and plate detections from external models into
//! stable, deduplicated sighting records. Detector, OCR engine and color
//! classifier are collaborators behind traits in [`models`]; records are
//! written through `platewatch-storage`.

pub mod camera;
pub mod committer;
pub mod config;
pub mod correction;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod models;
pub mod pipeline;
pub mod plate;
pub mod processing;
pub mod stream;

pub use camera::{CameraManager, CameraStatus, FrameSource, ImageSequenceSource};
pub use committer::{CommitOutcome, RecordCommitter};
pub use config::PipelineConfig;
pub use correction::OverrideOutcome;
pub use error::VisionError;
pub use frame::Frame;
pub use models::{Collaborators, ReplayCollaborators, ReplayScript};
pub use pipeline::{
    CollaboratorFailure, CollaboratorStage, DisplayState, FrameReport, LiveDetection,
    PlatePipeline, VehicleMeasurement,
};
pub use stream::{CameraStream, StreamSummary};
