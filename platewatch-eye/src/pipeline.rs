//! Per-camera detection-to-record pipeline
//!
//! [`PlatePipeline`] turns a stream of frames into committed sighting
//! records. Every camera gets its own instance; nothing mutable is shared
//! between instances except the detection store behind the committer.
//!
//! Per sampled frame: detect, measure vehicles and classify their color,
//! read plates inside the trigger zone, push the accepted reading into the
//! stabilization buffer, and commit the majority plate once the cooldown
//! has elapsed. Operator corrections go through the same state lock, so a
//! correction never races an automated commit of the same camera.

use crate::committer::{CommitOutcome, RecordCommitter};
use crate::config::PipelineConfig;
use crate::correction::{apply_override, OverrideOutcome};
use crate::error::VisionError;
use crate::frame::Frame;
use crate::geometry::estimate_distance_and_size;
use crate::models::{Collaborators, PlateCrop, VehicleCrop};
use crate::processing::{
    assemble_reading, emit_reading, is_sampled, preprocess_plate, CooldownState,
    StabilizationBuffer, StabilizationEntry, StabilizedReading,
};
use chrono::{Local, NaiveDateTime};
use parking_lot::RwLock;
use platewatch_core::{BoundingBox, Detection, DetectionClass, Scope};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Color label before any vehicle has been classified
pub const UNKNOWN_COLOR: &str = "Unknown";

/// Most recent vehicle measurements, carried into the next plate reading
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleMeasurement {
    pub color: String,
    pub distance_m: f64,
    pub height_m: f64,
}

impl Default for VehicleMeasurement {
    fn default() -> Self {
        Self {
            color: UNKNOWN_COLOR.to_string(),
            distance_m: 0.0,
            height_m: 0.0,
        }
    }
}

impl VehicleMeasurement {
    pub fn is_color_known(&self) -> bool {
        self.color != UNKNOWN_COLOR
    }
}

/// A box to draw on the live view
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiveDetection {
    pub region: BoundingBox,
    pub class: DetectionClass,
    /// Vehicle color or emitted plate text
    pub label: String,
    pub distance_m: f64,
}

/// Last committed values, for the operator view
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DisplayState {
    pub plate: Option<String>,
    pub color: Option<String>,
    pub distance_m: f64,
    pub height_m: f64,
    /// Set when the plate shown came from an operator correction
    pub manual: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CollaboratorStage {
    Detector,
    Ocr,
    ColorClassifier,
}

/// A collaborator call that failed while processing a frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollaboratorFailure {
    pub stage: CollaboratorStage,
    pub message: String,
}

/// What the pipeline did with one frame
#[derive(Debug, Clone, Default)]
pub struct FrameReport {
    pub frame_index: u64,
    /// Full inference ran on this frame
    pub sampled: bool,
    pub trigger_line: i32,
    /// Live detections after this frame (reused from the last sampled frame)
    pub detections: Vec<LiveDetection>,
    /// Number of plate crops handed to OCR
    pub ocr_calls: usize,
    /// Reading pushed into the stabilization buffer
    pub reading: Option<StabilizationEntry>,
    pub stabilized: Option<StabilizedReading>,
    /// A stabilized plate was held back by the cooldown
    pub suppressed: bool,
    pub commit: Option<CommitOutcome>,
    pub failures: Vec<CollaboratorFailure>,
}

impl FrameReport {
    pub fn detector_failed(&self) -> bool {
        self.failures
            .iter()
            .any(|f| f.stage == CollaboratorStage::Detector)
    }
}

struct PipelineState {
    live: Vec<LiveDetection>,
    measurement: VehicleMeasurement,
    buffer: StabilizationBuffer,
    cooldown: CooldownState,
    display: DisplayState,
}

impl PipelineState {
    fn new(buffer_capacity: usize) -> Self {
        Self {
            live: Vec::new(),
            measurement: VehicleMeasurement::default(),
            buffer: StabilizationBuffer::new(buffer_capacity),
            cooldown: CooldownState::new(),
            display: DisplayState::default(),
        }
    }
}

/// Detection-to-record pipeline of one camera
pub struct PlatePipeline {
    config: RwLock<PipelineConfig>,
    collaborators: Collaborators,
    committer: RecordCommitter,
    state: Mutex<PipelineState>,
}

impl PlatePipeline {
    pub fn new(
        config: PipelineConfig,
        collaborators: Collaborators,
        committer: RecordCommitter,
    ) -> Result<Self, VisionError> {
        config.validate().map_err(VisionError::Config)?;
        let state = PipelineState::new(config.buffer_capacity);
        Ok(Self {
            config: RwLock::new(config),
            collaborators,
            committer,
            state: Mutex::new(state),
        })
    }

    pub fn scope(&self) -> &Scope {
        self.committer.scope()
    }

    pub fn config(&self) -> PipelineConfig {
        self.config.read().clone()
    }

    /// Swap the configuration at runtime. The buffer is re-bounded to the
    /// new capacity, keeping its newest entries.
    pub async fn reconfigure(&self, config: PipelineConfig) -> Result<(), VisionError> {
        config.validate().map_err(VisionError::Config)?;
        let mut state = self.state.lock().await;
        state.buffer.set_capacity(config.buffer_capacity);
        info!("Reconfigured pipeline for {}", self.scope().camera_source);
        *self.config.write() = config;
        Ok(())
    }

    pub async fn display(&self) -> DisplayState {
        self.state.lock().await.display.clone()
    }

    pub async fn live_detections(&self) -> Vec<LiveDetection> {
        self.state.lock().await.live.clone()
    }

    pub async fn measurement(&self) -> VehicleMeasurement {
        self.state.lock().await.measurement.clone()
    }

    /// Plate texts currently buffered, oldest first
    pub async fn buffered_plates(&self) -> Vec<String> {
        self.state
            .lock()
            .await
            .buffer
            .entries()
            .map(|e| e.plate_text.clone())
            .collect()
    }

    pub async fn last_committed_key(&self) -> Option<String> {
        self.state.lock().await.cooldown.last_committed_key.clone()
    }

    /// Drop all in-memory state (buffer, cooldown, live view)
    pub async fn reset(&self) {
        let capacity = self.config.read().buffer_capacity;
        *self.state.lock().await = PipelineState::new(capacity);
        debug!("Pipeline state reset for {}", self.scope().camera_source);
    }

    pub async fn process_frame(&self, frame: Frame) -> FrameReport {
        self.process_frame_at(frame, Local::now().naive_local()).await
    }

    /// Process one frame as if observed at `now`
    pub async fn process_frame_at(&self, mut frame: Frame, now: NaiveDateTime) -> FrameReport {
        let config = self.config();
        if let Some(size) = config.frame_size {
            frame.resize_to(size);
        }

        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        let zone = config.trigger_zone(frame.height());
        let mut report = FrameReport {
            frame_index: frame.index,
            sampled: is_sampled(frame.index, config.sample_stride),
            trigger_line: zone.line_y,
            ..Default::default()
        };

        if !report.sampled {
            report.detections = state.live.clone();
            return report;
        }

        let detections = match self
            .collaborators
            .detector
            .detect(&frame, config.confidence_threshold)
        {
            Ok(detections) => detections,
            Err(e) => {
                warn!("Detector failed on frame {}: {}", frame.index, e);
                report.failures.push(CollaboratorFailure {
                    stage: CollaboratorStage::Detector,
                    message: e.to_string(),
                });
                state.live.clear();
                return report;
            }
        };
        debug!("Frame {}: {} detections", frame.index, detections.len());

        let mut live = Vec::with_capacity(detections.len());
        let mut current: Option<(String, f32)> = None;

        for detection in &detections {
            match detection.class {
                DetectionClass::Vehicle => {
                    self.measure_vehicle(&frame, detection, &config, state, &mut report);
                    live.push(LiveDetection {
                        region: detection.region,
                        class: DetectionClass::Vehicle,
                        label: state.measurement.color.clone(),
                        distance_m: state.measurement.distance_m,
                    });
                }
                DetectionClass::Plate => {
                    if !zone.admits(&detection.region) {
                        debug!(
                            "Plate at y={} outside trigger zone around {}",
                            detection.region.center_y(),
                            zone.line_y
                        );
                        continue;
                    }
                    if let Some((text, confidence)) =
                        self.read_plate(&frame, detection, &config, &mut report)
                    {
                        live.push(LiveDetection {
                            region: detection.region,
                            class: DetectionClass::Plate,
                            label: text.clone(),
                            distance_m: 0.0,
                        });
                        current = Some((text, confidence));
                    }
                }
            }
        }
        state.live = live;
        report.detections = state.live.clone();

        let Some((plate_text, confidence)) = current else {
            return report;
        };

        let entry = StabilizationEntry {
            plate_text,
            confidence: confidence as f64,
            color: state.measurement.color.clone(),
            distance_m: state.measurement.distance_m,
            height_m: state.measurement.height_m,
        };
        debug!("Accepted reading {} ({:.2})", entry.plate_text, entry.confidence);
        state.buffer.push(entry.clone());
        report.reading = Some(entry);

        let Some(stabilized) = state.buffer.stabilized(config.majority_count) else {
            return report;
        };

        if !state.cooldown.ready(now, config.cooldown_seconds) {
            debug!(
                "Stabilized {} suppressed by cooldown on {}",
                stabilized.plate_text,
                self.scope().camera_source
            );
            report.suppressed = true;
            report.stabilized = Some(stabilized);
            return report;
        }

        info!(
            "Stabilized {} with {} of {} votes",
            stabilized.plate_text,
            stabilized.votes,
            state.buffer.len()
        );
        let metrics = &stabilized.metrics;
        let outcome = self
            .committer
            .commit(
                now,
                &stabilized.plate_text,
                metrics.confidence,
                &metrics.color,
                metrics.distance_m,
                metrics.height_m,
                "",
                Some(&frame.image),
            )
            .await;

        state.cooldown.mark_committed(now, stabilized.plate_text.clone());
        state.buffer.clear();
        state.display = DisplayState {
            plate: Some(stabilized.plate_text.clone()),
            color: Some(metrics.color.clone()),
            distance_m: outcome.record.distance_m,
            height_m: outcome.record.height_m,
            manual: false,
        };

        report.commit = Some(outcome);
        report.stabilized = Some(stabilized);
        report
    }

    fn measure_vehicle(
        &self,
        frame: &Frame,
        detection: &Detection,
        config: &PipelineConfig,
        state: &mut PipelineState,
        report: &mut FrameReport,
    ) {
        let region = detection.region;
        let geometry = estimate_distance_and_size(
            region.width() as f64,
            region.height() as f64,
            config.known_width_m,
            config.focal_length_px,
        );
        state.measurement.distance_m = geometry.distance_m;
        state.measurement.height_m = geometry.height_m;

        if region.width() <= config.min_color_box_width_px {
            return;
        }
        let Some(image) = frame.crop(&region) else {
            return;
        };
        let crop = VehicleCrop {
            frame_index: frame.index,
            region,
            image,
        };
        match self
            .collaborators
            .classifier
            .classify(&crop, config.confidence_threshold)
        {
            Ok(color) => state.measurement.color = color,
            Err(e) => {
                warn!("Color classification failed on frame {}: {}", frame.index, e);
                report.failures.push(CollaboratorFailure {
                    stage: CollaboratorStage::ColorClassifier,
                    message: e.to_string(),
                });
            }
        }
    }

    fn read_plate(
        &self,
        frame: &Frame,
        detection: &Detection,
        config: &PipelineConfig,
        report: &mut FrameReport,
    ) -> Option<(String, f32)> {
        let crop = frame.crop(&detection.region)?;
        let crop = PlateCrop {
            frame_index: frame.index,
            region: detection.region,
            image: preprocess_plate(&crop),
        };

        report.ocr_calls += 1;
        let fragments = match self
            .collaborators
            .ocr
            .read(&crop, &config.allowed_characters)
        {
            Ok(fragments) => fragments,
            Err(e) => {
                warn!("OCR failed on frame {}: {}", frame.index, e);
                report.failures.push(CollaboratorFailure {
                    stage: CollaboratorStage::Ocr,
                    message: e.to_string(),
                });
                return None;
            }
        };

        let reading = assemble_reading(
            &fragments,
            config.fragment_min_confidence,
            config.reading_min_confidence,
        )?;
        Some((emit_reading(&reading.raw_text), reading.confidence))
    }

    /// Supersede the last committed record with an operator-supplied plate
    pub async fn manual_override(&self, corrected_plate: &str) -> Result<OverrideOutcome, VisionError> {
        self.manual_override_at(corrected_plate, Local::now().naive_local())
            .await
    }

    pub async fn manual_override_at(
        &self,
        corrected_plate: &str,
        now: NaiveDateTime,
    ) -> Result<OverrideOutcome, VisionError> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        let outcome = apply_override(
            &self.committer,
            &mut state.cooldown,
            &state.measurement,
            corrected_plate,
            now,
        )
        .await?;

        state.display = DisplayState {
            plate: Some(outcome.record.plate_number.clone()),
            color: state.display.color.clone(),
            distance_m: state.display.distance_m,
            height_m: state.display.height_m,
            manual: true,
        };
        Ok(outcome)
    }
}
