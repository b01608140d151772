//! Tests for frame acquisition and the stream runner

use image::{Rgb, RgbImage};
use platewatch_core::{BoundingBox, Detection, DetectionClass, OcrFragment, Scope};
use platewatch_eye::models::replay::{ScriptedDetection, ScriptedFrame};
use platewatch_eye::{
    CameraManager, CameraStatus, CameraStream, Collaborators, FrameSource, ImageSequenceSource,
    PipelineConfig, PlatePipeline, RecordCommitter, ReplayCollaborators, ReplayScript,
    VisionError,
};
use platewatch_storage::{BackupLog, DetectionStore, MemoryStore};
use std::path::Path;
use std::sync::{mpsc as std_mpsc, Arc};
use std::time::Duration;
use tokio::sync::mpsc;

fn write_frames(dir: &Path, count: usize, size: u32) {
    for i in 1..=count {
        let image = RgbImage::from_pixel(size, size, Rgb([40, 40, 40]));
        image.save(dir.join(format!("frame_{:03}.png", i))).unwrap();
    }
}

#[test]
fn test_image_sequence_lexical_order() {
    let dir = tempfile::tempdir().unwrap();
    write_frames(dir.path(), 3, 8);
    std::fs::write(dir.path().join("notes.txt"), "not a frame").unwrap();

    let mut source = ImageSequenceSource::new(dir.path());
    source.open().unwrap();
    assert_eq!(source.len(), 3);
    let mut count = 0;
    while let Some(image) = source.next_image().unwrap() {
        assert_eq!(image.dimensions(), (8, 8));
        count += 1;
    }
    assert_eq!(count, 3);
}

#[test]
fn test_empty_directory_is_connection_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut source = ImageSequenceSource::new(dir.path());
    assert!(source.open().is_err());

    let mut missing = ImageSequenceSource::new(dir.path().join("nope"));
    assert!(missing.open().is_err());
}

#[tokio::test]
async fn test_stream_numbers_frames_and_skips_bad_reads() {
    let dir = tempfile::tempdir().unwrap();
    write_frames(dir.path(), 3, 8);
    // sorts between frame_002 and frame_003
    std::fs::write(dir.path().join("frame_002b.png"), b"garbage").unwrap();

    let camera = CameraManager::new(Box::new(ImageSequenceSource::new(dir.path())));
    let mut rx = camera.start_stream().unwrap();
    assert!(camera.start_stream().is_err());

    let mut indices = Vec::new();
    while let Some(frame) = rx.recv().await {
        indices.push(frame.index);
    }
    assert_eq!(indices, vec![1, 2, 3]);
    assert_eq!(camera.current_status(), CameraStatus::Stopped);
    assert!(!camera.is_running());
}

#[tokio::test]
async fn test_stream_connection_failure_published() {
    let dir = tempfile::tempdir().unwrap();
    let camera = CameraManager::new(Box::new(ImageSequenceSource::new(dir.path())));
    let status = camera.status();
    let mut rx = camera.start_stream().unwrap();

    assert!(rx.recv().await.is_none());
    assert!(matches!(*status.borrow(), CameraStatus::Failed(_)));
}

/// Source whose first read waits for the test to release it
struct HeldSource {
    release: std_mpsc::Receiver<()>,
    served: bool,
}

impl FrameSource for HeldSource {
    fn open(&mut self) -> Result<(), VisionError> {
        Ok(())
    }

    fn next_image(&mut self) -> Result<Option<RgbImage>, VisionError> {
        if self.served {
            return Ok(None);
        }
        self.served = true;
        match self.release.recv_timeout(Duration::from_secs(2)) {
            Ok(()) => Ok(Some(RgbImage::new(4, 4))),
            Err(_) => Err(VisionError::Camera("read held too long".to_string())),
        }
    }

    fn describe(&self) -> String {
        "held".to_string()
    }
}

#[tokio::test]
async fn test_slow_reads_do_not_block_the_runtime() {
    let (release, held) = std_mpsc::channel();
    let camera = CameraManager::new(Box::new(HeldSource {
        release: held,
        served: false,
    }));
    let mut rx = camera.start_stream().unwrap();

    // the read is parked; this task must still get to run and release it
    tokio::time::sleep(Duration::from_millis(20)).await;
    release.send(()).unwrap();

    let frame = tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(frame.index, 1);
    assert!(rx.recv().await.is_none());
    assert_eq!(camera.current_status(), CameraStatus::Stopped);
}

fn replay_script() -> ReplayScript {
    // 200px frames: trigger line at 150
    let vehicle = ScriptedDetection {
        detection: Detection::new(BoundingBox::new(10, 60, 100, 120), DetectionClass::Vehicle, 0.9),
        color: Some("Red".to_string()),
        ocr: Vec::new(),
    };
    let plate = ScriptedDetection {
        detection: Detection::new(BoundingBox::new(30, 140, 80, 160), DetectionClass::Plate, 0.8),
        color: None,
        ocr: vec![OcrFragment::new("WWA1234", 0.7, 1.0)],
    };
    ReplayScript {
        default: Some(ScriptedFrame {
            detections: vec![vehicle, plate],
            detector_error: None,
        }),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_camera_stream_commits_replayed_plate() {
    let frames = tempfile::tempdir().unwrap();
    write_frames(frames.path(), 5, 200);
    let backup_dir = tempfile::tempdir().unwrap();

    let store = Arc::new(MemoryStore::new());
    let scope = Scope::new("user-1", "lobby-cam");
    let committer = RecordCommitter::new(
        scope.clone(),
        store.clone(),
        Arc::new(BackupLog::open(backup_dir.path()).unwrap()),
        None,
    );
    let config = PipelineConfig {
        sample_stride: 1,
        frame_size: None,
        ..Default::default()
    };
    let pipeline = Arc::new(
        PlatePipeline::new(
            config,
            Collaborators::replay(ReplayCollaborators::new(replay_script())),
            committer,
        )
        .unwrap(),
    );

    let camera = Arc::new(CameraManager::new(Box::new(ImageSequenceSource::new(frames.path()))));
    let (tx, mut reports) = mpsc::unbounded_channel();
    let stream = CameraStream::new(camera, pipeline.clone()).with_reports(tx);
    stream.start().unwrap();

    let summary = stream.wait().await.unwrap();
    assert_eq!(summary.frames, 5);
    assert_eq!(summary.sampled, 5);
    assert_eq!(summary.readings, 5);
    assert_eq!(summary.commits, 1);

    let mut received = 0;
    while reports.try_recv().is_ok() {
        received += 1;
    }
    assert_eq!(received, 5);

    let record = store.get(&scope, "WWA1234").await.unwrap().unwrap();
    assert_eq!(record.color, "Red");
    assert_eq!(record.distance_m, 10.0);
    assert_eq!(pipeline.display().await.plate.as_deref(), Some("WWA1234"));
}

#[tokio::test]
async fn test_stop_discards_state() {
    let frames = tempfile::tempdir().unwrap();
    write_frames(frames.path(), 3, 200);
    let backup_dir = tempfile::tempdir().unwrap();

    let committer = RecordCommitter::new(
        Scope::new("user-1", "gate"),
        Arc::new(MemoryStore::new()),
        Arc::new(BackupLog::open(backup_dir.path()).unwrap()),
        None,
    );
    let config = PipelineConfig {
        sample_stride: 1,
        frame_size: None,
        ..Default::default()
    };
    let pipeline = Arc::new(
        PlatePipeline::new(
            config,
            Collaborators::replay(ReplayCollaborators::new(replay_script())),
            committer,
        )
        .unwrap(),
    );
    let camera = Arc::new(CameraManager::new(Box::new(ImageSequenceSource::new(frames.path()))));
    let stream = CameraStream::new(camera.clone(), pipeline.clone());
    stream.start().unwrap();

    stream.stop().await.unwrap();
    assert!(!stream.is_running());
    assert!(pipeline.buffered_plates().await.is_empty());
    assert!(pipeline.live_detections().await.is_empty());
    assert_eq!(camera.current_status(), CameraStatus::Stopped);
}
