//! Append-only CSV backup log
//!
//! Every committed or manually corrected sighting is appended as one row,
//! independently of the remote store, so the log is the durability fallback
//! when persistence is unreachable.

use parking_lot::Mutex;
use platewatch_core::Result;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

pub const BACKUP_FILE_NAME: &str = "car_plate_records.csv";

pub const BACKUP_HEADERS: [&str; 7] = [
    "Timestamp",
    "Plate Number",
    "Confidence",
    "Color",
    "Distance (m)",
    "Height (m)",
    "Note",
];

/// One backup row, fields in file order
#[derive(Debug, Clone, PartialEq)]
pub struct BackupRow {
    pub timestamp: String,
    pub plate: String,
    pub confidence: String,
    pub color: String,
    pub distance_m: String,
    pub height_m: String,
    pub note: String,
}

impl BackupRow {
    /// Row for an automated commit; numbers are written with two decimals.
    pub fn committed(
        timestamp: impl Into<String>,
        plate: impl Into<String>,
        confidence: f64,
        color: impl Into<String>,
        distance_m: f64,
        height_m: f64,
        note: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: timestamp.into(),
            plate: plate.into(),
            confidence: format!("{:.2}", confidence),
            color: color.into(),
            distance_m: format!("{:.2}", distance_m),
            height_m: format!("{:.2}", height_m),
            note: note.into(),
        }
    }

    /// Row for an operator correction
    pub fn manual(
        timestamp: impl Into<String>,
        plate: impl Into<String>,
        color: impl Into<String>,
        distance_m: f64,
        height_m: f64,
    ) -> Self {
        Self {
            timestamp: timestamp.into(),
            plate: plate.into(),
            confidence: "MANUAL_CORRECTION".to_string(),
            color: color.into(),
            distance_m: format!("{:.2}", distance_m),
            height_m: format!("{:.2}", height_m),
            note: "Previous_Record_Overridden".to_string(),
        }
    }

    pub fn fields(&self) -> [&str; 7] {
        [
            &self.timestamp,
            &self.plate,
            &self.confidence,
            &self.color,
            &self.distance_m,
            &self.height_m,
            &self.note,
        ]
    }

    fn to_line(&self) -> String {
        let mut line = self
            .fields()
            .iter()
            .map(|f| escape_csv(f))
            .collect::<Vec<_>>()
            .join(",");
        line.push('\n');
        line
    }
}

fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') || s.contains('\r') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// Split one CSV line produced by [`BackupRow`] back into fields
fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}

/// Writer for `<dir>/car_plate_records.csv`
pub struct BackupLog {
    path: PathBuf,
    lock: Mutex<()>,
}

impl BackupLog {
    /// Open (creating directory and header row when missing)
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;
        let path = dir.join(BACKUP_FILE_NAME);
        if !path.is_file() {
            let mut header = BACKUP_HEADERS.join(",");
            header.push('\n');
            fs::write(&path, header)?;
            info!("Created backup log {:?}", path);
        }
        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, row: &BackupRow) -> Result<()> {
        let _guard = self.lock.lock();
        let mut file = OpenOptions::new().append(true).create(true).open(&self.path)?;
        file.write_all(row.to_line().as_bytes())?;
        Ok(())
    }

    /// Data rows currently in the log (header excluded)
    pub fn rows(&self) -> Result<Vec<BackupRow>> {
        let _guard = self.lock.lock();
        let content = fs::read_to_string(&self.path)?;
        let rows = content
            .lines()
            .skip(1)
            .filter(|l| !l.is_empty())
            .map(split_csv_line)
            .filter(|f| f.len() == BACKUP_HEADERS.len())
            .map(|f| BackupRow {
                timestamp: f[0].clone(),
                plate: f[1].clone(),
                confidence: f[2].clone(),
                color: f[3].clone(),
                distance_m: f[4].clone(),
                height_m: f[5].clone(),
                note: f[6].clone(),
            })
            .collect();
        Ok(rows)
    }
}
