//! Frame acquisition
//!
//! A [`FrameSource`] supplies decoded images in order. [`CameraManager`]
//! drives a source on its own task and hands numbered [`Frame`]s to the
//! consumer through a bounded channel, publishing connection status on a
//! `watch` channel.

use crate::error::VisionError;
use crate::frame::Frame;
use image::RgbImage;
use parking_lot::{Mutex, RwLock};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

const FRAME_BUFFER_SIZE: usize = 30;
const MAX_CONSECUTIVE_ERRORS: u32 = 10;

/// Ordered supplier of images
pub trait FrameSource: Send {
    /// Connect to the source. Failure is a connection error.
    fn open(&mut self) -> Result<(), VisionError>;

    /// Next image, `Ok(None)` at end of stream. An error means no frame
    /// this tick; the stream continues.
    fn next_image(&mut self) -> Result<Option<RgbImage>, VisionError>;

    fn describe(&self) -> String;
}

/// Image files of one directory, read in lexical order
pub struct ImageSequenceSource {
    dir: PathBuf,
    files: Vec<PathBuf>,
    position: usize,
}

impl ImageSequenceSource {
    const EXTENSIONS: &'static [&'static str] = &["jpg", "jpeg", "png", "bmp"];

    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            files: Vec::new(),
            position: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    fn is_image(path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|e| Self::EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
            .unwrap_or(false)
    }
}

impl FrameSource for ImageSequenceSource {
    fn open(&mut self) -> Result<(), VisionError> {
        let entries = std::fs::read_dir(&self.dir).map_err(|e| {
            VisionError::Camera(format!("Failed to open frame directory {:?}: {}", self.dir, e))
        })?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file() && Self::is_image(path))
            .collect();
        files.sort();

        if files.is_empty() {
            return Err(VisionError::Camera(format!(
                "No image frames found in {:?}",
                self.dir
            )));
        }
        info!("Opened {} frames from {:?}", files.len(), self.dir);
        self.files = files;
        self.position = 0;
        Ok(())
    }

    fn next_image(&mut self) -> Result<Option<RgbImage>, VisionError> {
        let Some(path) = self.files.get(self.position).cloned() else {
            return Ok(None);
        };
        self.position += 1;
        let image = image::open(&path)
            .map_err(|e| VisionError::Camera(format!("Failed to decode {:?}: {}", path, e)))?;
        Ok(Some(image.to_rgb8()))
    }

    fn describe(&self) -> String {
        self.dir.display().to_string()
    }
}

/// Connection status of a camera
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CameraStatus {
    Idle,
    Connecting,
    Streaming,
    Failed(String),
    Stopped,
}

/// Runs one frame source on a background task
pub struct CameraManager {
    name: String,
    source: Arc<Mutex<Option<Box<dyn FrameSource>>>>,
    frame_interval: Option<Duration>,
    is_running: Arc<RwLock<bool>>,
    status_tx: Arc<watch::Sender<CameraStatus>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl CameraManager {
    pub fn new(source: Box<dyn FrameSource>) -> Self {
        let (status_tx, _) = watch::channel(CameraStatus::Idle);
        Self {
            name: source.describe(),
            source: Arc::new(Mutex::new(Some(source))),
            frame_interval: None,
            is_running: Arc::new(RwLock::new(false)),
            status_tx: Arc::new(status_tx),
            handle: Mutex::new(None),
        }
    }

    /// Pace reads to at most `fps` frames per second
    pub fn with_frame_rate(mut self, fps: f64) -> Self {
        if fps > 0.0 && fps.is_finite() {
            self.frame_interval = Some(Duration::from_secs_f64(1.0 / fps));
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> watch::Receiver<CameraStatus> {
        self.status_tx.subscribe()
    }

    pub fn current_status(&self) -> CameraStatus {
        self.status_tx.borrow().clone()
    }

    pub fn is_running(&self) -> bool {
        *self.is_running.read()
    }

    /// Start acquisition. Frames are numbered from 1.
    ///
    /// The source is opened on the acquisition task; a connection failure
    /// is published once as [`CameraStatus::Failed`] and closes the channel.
    pub fn start_stream(&self) -> Result<mpsc::Receiver<Frame>, VisionError> {
        {
            let mut is_running = self.is_running.write();
            if *is_running {
                return Err(VisionError::Camera("Camera stream already running".to_string()));
            }
            *is_running = true;
        }

        let Some(source) = self.source.lock().take() else {
            *self.is_running.write() = false;
            return Err(VisionError::Camera(format!(
                "Frame source {} already consumed",
                self.name
            )));
        };

        let (tx, rx) = mpsc::channel(FRAME_BUFFER_SIZE);
        let is_running = self.is_running.clone();
        let status = self.status_tx.clone();
        let frame_interval = self.frame_interval;
        let name = self.name.clone();

        status.send_replace(CameraStatus::Connecting);
        let handle = tokio::spawn(async move {
            let mut source = match on_source_worker(source, |s| s.open()).await {
                Ok((source, Ok(()))) => source,
                Ok((_, Err(e))) | Err(e) => {
                    error!("Camera {} failed to connect: {}", name, e);
                    status.send_replace(CameraStatus::Failed(e.to_string()));
                    *is_running.write() = false;
                    return;
                }
            };
            status.send_replace(CameraStatus::Streaming);
            info!("Camera {} streaming", name);

            let mut index: u64 = 0;
            let mut consecutive_errors: u32 = 0;
            loop {
                if !*is_running.read() {
                    break;
                }
                let start = std::time::Instant::now();

                let next = match on_source_worker(source, |s| s.next_image()).await {
                    Ok((s, next)) => {
                        source = s;
                        next
                    }
                    Err(e) => {
                        error!("Camera {} acquisition worker failed: {}", name, e);
                        status.send_replace(CameraStatus::Failed(e.to_string()));
                        *is_running.write() = false;
                        return;
                    }
                };
                match next {
                    Ok(Some(image)) => {
                        consecutive_errors = 0;
                        index += 1;
                        if tx.send(Frame::new(index, image)).await.is_err() {
                            warn!("Frame receiver dropped, stopping camera {}", name);
                            break;
                        }
                    }
                    Ok(None) => {
                        info!("Camera {} reached end of stream after {} frames", name, index);
                        break;
                    }
                    Err(e) => {
                        consecutive_errors += 1;
                        warn!("Camera {} read error ({}): {}", name, consecutive_errors, e);
                        if consecutive_errors > MAX_CONSECUTIVE_ERRORS {
                            error!("Too many camera read errors on {}, stopping stream", name);
                            status.send_replace(CameraStatus::Failed(format!(
                                "{} consecutive read errors",
                                consecutive_errors
                            )));
                            *is_running.write() = false;
                            return;
                        }
                        let backoff_ms = (10u64 << consecutive_errors.min(5)).min(500);
                        tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                        continue;
                    }
                }

                if let Some(interval) = frame_interval {
                    let elapsed = start.elapsed();
                    if elapsed < interval {
                        tokio::time::sleep(interval - elapsed).await;
                    }
                }
            }

            *is_running.write() = false;
            status.send_replace(CameraStatus::Stopped);
            info!("Camera {} stream stopped", name);
        });
        *self.handle.lock() = Some(handle);

        Ok(rx)
    }

    /// Signal the acquisition task to stop
    pub fn stop(&self) {
        *self.is_running.write() = false;
        if let Some(handle) = self.handle.lock().take() {
            handle.abort();
        }
        if !matches!(*self.status_tx.borrow(), CameraStatus::Failed(_) | CameraStatus::Idle) {
            self.status_tx.send_replace(CameraStatus::Stopped);
        }
        info!("Camera {} stopped", self.name);
    }
}

/// Run a source call on the blocking pool, handing the source back
async fn on_source_worker<T, F>(
    mut source: Box<dyn FrameSource>,
    call: F,
) -> Result<(Box<dyn FrameSource>, Result<T, VisionError>), VisionError>
where
    T: Send + 'static,
    F: FnOnce(&mut Box<dyn FrameSource>) -> Result<T, VisionError> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let result = call(&mut source);
        (source, result)
    })
    .await
    .map_err(|e| VisionError::Camera(format!("Acquisition worker failed: {}", e)))
}

impl Drop for CameraManager {
    fn drop(&mut self) {
        *self.is_running.write() = false;
        if let Some(handle) = self.handle.lock().take() {
            handle.abort();
        }
    }
}
