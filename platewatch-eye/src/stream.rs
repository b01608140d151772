//! Per-camera stream runner
//!
//! Connects a [`CameraManager`] to a [`PlatePipeline`]: frames are
//! processed strictly one at a time, in arrival order.

use crate::camera::CameraManager;
use crate::error::VisionError;
use crate::pipeline::{FrameReport, PlatePipeline};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

const RECV_TIMEOUT: Duration = Duration::from_millis(100);

/// Counters of one stream run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StreamSummary {
    pub frames: u64,
    pub sampled: u64,
    pub readings: u64,
    pub commits: u64,
    pub suppressed: u64,
    pub failures: u64,
}

impl StreamSummary {
    fn record(&mut self, report: &FrameReport) {
        self.frames += 1;
        self.sampled += report.sampled as u64;
        self.readings += report.reading.is_some() as u64;
        self.commits += report.commit.is_some() as u64;
        self.suppressed += report.suppressed as u64;
        self.failures += report.failures.len() as u64;
    }
}

pub struct CameraStream {
    camera: Arc<CameraManager>,
    pipeline: Arc<PlatePipeline>,
    reports: Option<mpsc::UnboundedSender<FrameReport>>,
    is_running: Arc<RwLock<bool>>,
    handle: Mutex<Option<JoinHandle<StreamSummary>>>,
}

impl CameraStream {
    pub fn new(camera: Arc<CameraManager>, pipeline: Arc<PlatePipeline>) -> Self {
        Self {
            camera,
            pipeline,
            reports: None,
            is_running: Arc::new(RwLock::new(false)),
            handle: Mutex::new(None),
        }
    }

    /// Forward every frame report to `tx`
    pub fn with_reports(mut self, tx: mpsc::UnboundedSender<FrameReport>) -> Self {
        self.reports = Some(tx);
        self
    }

    pub fn camera(&self) -> &Arc<CameraManager> {
        &self.camera
    }

    pub fn pipeline(&self) -> &Arc<PlatePipeline> {
        &self.pipeline
    }

    pub fn is_running(&self) -> bool {
        *self.is_running.read()
    }

    /// Start acquisition and the processing loop
    pub fn start(&self) -> Result<(), VisionError> {
        {
            let mut is_running = self.is_running.write();
            if *is_running {
                return Err(VisionError::Processing("Stream already running".to_string()));
            }
            *is_running = true;
        }

        let mut frames = match self.camera.start_stream() {
            Ok(rx) => rx,
            Err(e) => {
                *self.is_running.write() = false;
                return Err(e);
            }
        };

        let pipeline = self.pipeline.clone();
        let reports = self.reports.clone();
        let is_running = self.is_running.clone();
        let camera_source = pipeline.scope().camera_source.clone();

        let handle = tokio::spawn(async move {
            let mut summary = StreamSummary::default();
            loop {
                if !*is_running.read() {
                    break;
                }
                match tokio::time::timeout(RECV_TIMEOUT, frames.recv()).await {
                    Ok(Some(frame)) => {
                        let report = pipeline.process_frame(frame).await;
                        summary.record(&report);
                        if let Some(tx) = &reports {
                            let _ = tx.send(report);
                        }
                    }
                    Ok(None) => {
                        debug!("Frame channel closed for {}", camera_source);
                        break;
                    }
                    Err(_) => {
                        // Timeout, check is_running again
                        continue;
                    }
                }
            }
            *is_running.write() = false;
            info!(
                "Stream {} finished: {} frames, {} commits",
                camera_source, summary.frames, summary.commits
            );
            summary
        });
        *self.handle.lock() = Some(handle);

        info!("Stream started for {}", self.pipeline.scope().camera_source);
        Ok(())
    }

    /// Wait for the stream to end on its own (end of source or failure)
    pub async fn wait(&self) -> Result<StreamSummary, VisionError> {
        let handle = self.handle.lock().take();
        match handle {
            Some(handle) => handle
                .await
                .map_err(|e| VisionError::Processing(format!("Stream task failed: {}", e))),
            None => Ok(StreamSummary::default()),
        }
    }

    /// Signal acquisition and processing to stop without waiting
    pub fn request_stop(&self) {
        *self.is_running.write() = false;
        self.camera.stop();
    }

    /// Stop acquisition and processing, discarding in-memory pipeline state
    pub async fn stop(&self) -> Result<StreamSummary, VisionError> {
        self.request_stop();
        let summary = self.wait().await?;
        self.pipeline.reset().await;
        Ok(summary)
    }
}
