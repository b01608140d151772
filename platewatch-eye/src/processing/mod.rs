//! Per-frame processing stages of the pipeline

pub mod cooldown;
pub mod gate;
pub mod ocr;
pub mod stabilizer;

pub use cooldown::CooldownState;
pub use gate::{is_sampled, TriggerZone};
pub use ocr::{assemble_reading, emit_reading, preprocess_plate, PlateReading};
pub use stabilizer::{StabilizationBuffer, StabilizationEntry, StabilizedReading};
