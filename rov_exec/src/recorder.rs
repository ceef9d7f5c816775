//! # Frame recorder
//!
//! Saves the camera frames of a run into a directory as JPEGs named by the time they were
//! recieved, so that the names sort in recording order.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use image::RgbImage;
use log::info;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Timestamp format of the frame names, down to the millisecond
const FRAME_TIMESTAMP_FORMAT: &str = "%Y_%m_%d_%H_%M_%S_%3f";

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Writes camera frames into the recording directory.
#[derive(Debug)]
pub struct FrameRecorder {
    dir: PathBuf,

    /// Stem of the last frame written, without any counter suffix
    last_stem: Option<String>,

    /// Number of frames already written with `last_stem`
    repeats: u32,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum RecorderError {
    #[error("Cannot prepare the recording directory {0:?}: {1}")]
    CannotPrepareDir(PathBuf, std::io::Error),

    #[error("Cannot save the frame to {0:?}: {1}")]
    CannotSave(PathBuf, image::ImageError),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl FrameRecorder {
    /// Prepare the recording directory.
    ///
    /// An existing directory is emptied, a missing one is created.
    pub fn init<P: AsRef<Path>>(dir: P) -> Result<Self, RecorderError> {
        let dir = dir.as_ref().to_path_buf();

        if dir.exists() {
            info!("Clearing the recording directory {:?}", dir);
            fs::remove_dir_all(&dir)
                .map_err(|e| RecorderError::CannotPrepareDir(dir.clone(), e))?;
        }
        else {
            info!("Creating the recording directory {:?}", dir);
        }

        fs::create_dir_all(&dir)
            .map_err(|e| RecorderError::CannotPrepareDir(dir.clone(), e))?;

        Ok(Self {
            dir,
            last_stem: None,
            repeats: 0
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Save a frame recieved at the given time, returning the path it was written to.
    pub fn record(&mut self, image: &RgbImage, now: DateTime<Utc>) -> Result<PathBuf, RecorderError> {
        let name = self.next_name(now);
        let path = self.dir.join(format!("{}.jpg", name));

        image.save(&path)
            .map_err(|e| RecorderError::CannotSave(path.clone(), e))?;

        Ok(path)
    }

    /// Name for the next frame.
    ///
    /// Frames within the same millisecond get a counter suffix, which keeps the names unique and
    /// still sorts after the unsuffixed name.
    fn next_name(&mut self, now: DateTime<Utc>) -> String {
        let stem = frame_stem(now);

        if self.last_stem.as_ref() == Some(&stem) {
            self.repeats += 1;
            format!("{}_{:03}", stem, self.repeats)
        }
        else {
            self.repeats = 0;
            self.last_stem = Some(stem.clone());
            stem
        }
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Timestamp part of a frame's name.
pub fn frame_stem(now: DateTime<Utc>) -> String {
    now.format(FRAME_TIMESTAMP_FORMAT).to_string()
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn temp_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("rov_exec_{}_{}", name, std::process::id()))
    }

    #[test]
    fn test_frame_stem() {
        let t = Utc.ymd(2021, 3, 7).and_hms_micro(14, 5, 9, 123_456);

        assert_eq!(frame_stem(t), "2021_03_07_14_05_09_123");
    }

    #[test]
    fn test_names_unique_and_ordered() {
        let dir = temp_dir("names");
        let mut rec = FrameRecorder::init(&dir).unwrap();

        let t0 = Utc.ymd(2021, 3, 7).and_hms_micro(14, 5, 9, 999_100);
        let times = [
            t0,
            t0 + Duration::microseconds(300),
            t0 + Duration::microseconds(600),
            t0 + Duration::microseconds(1000),
            t0 + Duration::seconds(1),
        ];

        let names: Vec<String> = times.iter().map(|t| rec.next_name(*t)).collect();

        assert_eq!(names[0], "2021_03_07_14_05_09_999");
        assert_eq!(names[1], "2021_03_07_14_05_09_999_001");
        assert_eq!(names[3], "2021_03_07_14_05_10_000");

        for pair in names.windows(2) {
            assert!(pair[0] < pair[1], "{} >= {}", pair[0], pair[1]);
        }

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_init_and_record() {
        let dir = temp_dir("record");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("stale.jpg"), b"old").unwrap();

        let mut rec = FrameRecorder::init(&dir).unwrap();
        assert!(!dir.join("stale.jpg").exists());

        let path = rec.record(&RgbImage::new(320, 160), Utc::now()).unwrap();

        assert!(path.exists());
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("jpg"));
        assert_eq!(fs::read_dir(&dir).unwrap().count(), 1);

        fs::remove_dir_all(&dir).ok();
    }
}
