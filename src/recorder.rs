use std::{
    fs,
    path::{Path, PathBuf},
};

use opencv::{
    core::{Mat, Vector},
    imgcodecs,
};
use serde::{Deserialize, Serialize};

use crate::{error::WriteError, target::Target};

/// Name of the CSV index inside the output folder.
pub const INDEX_FILE: &str = "data.csv";

/// One persisted (target, image) pairing. Field names double as the CSV
/// header, so the index columns are exactly
/// `target_x_px,target_y_px,image_filename`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub target_x_px: u32,
    pub target_y_px: u32,
    pub image_filename: String,
}

/// Owns the output folder and the CSV writer for one collection run.
/// Filenames are a zero-padded monotone counter, unique within the run.
pub struct SessionRecorder {
    base_path: PathBuf,
    writer: csv::Writer<fs::File>,
    next_index: usize,
}

impl SessionRecorder {
    pub fn create(base_path: &Path) -> Result<Self, WriteError> {
        fs::create_dir_all(base_path).map_err(|source| WriteError::CreateDir {
            path: base_path.to_path_buf(),
            source,
        })?;

        let index_path = base_path.join(INDEX_FILE);
        let writer = csv::Writer::from_path(&index_path).map_err(|source| {
            WriteError::OpenIndex {
                path: index_path,
                source,
            }
        })?;

        Ok(SessionRecorder {
            base_path: base_path.to_path_buf(),
            writer,
            next_index: 0,
        })
    }

    /// Number of records written so far.
    pub fn len(&self) -> usize {
        self.next_index
    }

    pub fn is_empty(&self) -> bool {
        self.next_index == 0
    }

    /// Persist one confirmed fixation: the image first, then its index
    /// row. The writer is flushed per row so an abort at any point leaves
    /// no partial line behind.
    pub fn record(&mut self, target: &Target, frame: &Mat) -> Result<SessionRecord, WriteError> {
        let image_filename = format!("{:04}.png", self.next_index);
        let image_path = self.base_path.join(&image_filename);

        let encoded = imgcodecs::imwrite(
            &image_path.to_string_lossy(),
            frame,
            &Vector::<i32>::new(),
        )
        .map_err(|source| WriteError::WriteImage {
            path: image_path.clone(),
            source,
        })?;
        if !encoded {
            return Err(WriteError::EncodeImage { path: image_path });
        }

        let record = SessionRecord {
            target_x_px: target.x,
            target_y_px: target.y,
            image_filename,
        };
        self.writer.serialize(&record)?;
        self.writer.flush()?;

        self.next_index += 1;
        Ok(record)
    }
}

/// Read a session index back, in insertion (= chronological) order.
pub fn load_index(base_path: &Path) -> Result<Vec<SessionRecord>, WriteError> {
    let index_path = base_path.join(INDEX_FILE);
    let mut reader =
        csv::Reader::from_path(&index_path).map_err(|source| WriteError::OpenIndex {
            path: index_path,
            source,
        })?;

    let mut records = Vec::new();
    for row in reader.deserialize() {
        records.push(row?);
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::Orientation;
    use opencv::core::{Scalar, CV_8UC3};
    use tempfile::TempDir;

    fn test_frame() -> Mat {
        Mat::new_rows_cols_with_default(8, 8, CV_8UC3, Scalar::all(64.0)).unwrap()
    }

    fn target(x: u32, y: u32) -> Target {
        Target {
            x,
            y,
            orientation: Orientation::Right,
        }
    }

    #[test]
    fn records_image_and_index_row() {
        let dir = TempDir::new().unwrap();
        let mut recorder = SessionRecorder::create(dir.path()).unwrap();

        let record = recorder.record(&target(100, 200), &test_frame()).unwrap();
        assert_eq!(record.image_filename, "0000.png");
        assert!(dir.path().join("0000.png").exists());

        let rows = load_index(dir.path()).unwrap();
        assert_eq!(rows, vec![record]);
    }

    #[test]
    fn filenames_are_a_monotone_counter() {
        let dir = TempDir::new().unwrap();
        let mut recorder = SessionRecorder::create(dir.path()).unwrap();

        for i in 0..3 {
            let record = recorder.record(&target(i, i), &test_frame()).unwrap();
            assert_eq!(record.image_filename, format!("{:04}.png", i));
        }
        assert_eq!(recorder.len(), 3);
    }

    #[test]
    fn header_matches_record_fields() {
        let dir = TempDir::new().unwrap();
        let mut recorder = SessionRecorder::create(dir.path()).unwrap();
        recorder.record(&target(5, 6), &test_frame()).unwrap();

        let index = fs::read_to_string(dir.path().join(INDEX_FILE)).unwrap();
        let mut lines = index.lines();
        assert_eq!(
            lines.next().unwrap(),
            "target_x_px,target_y_px,image_filename"
        );
        assert_eq!(lines.next().unwrap(), "5,6,0000.png");
    }

    #[test]
    fn every_row_is_flushed_immediately() {
        let dir = TempDir::new().unwrap();
        let mut recorder = SessionRecorder::create(dir.path()).unwrap();
        recorder.record(&target(1, 2), &test_frame()).unwrap();

        // Read back while the writer is still alive.
        let rows = load_index(dir.path()).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn load_index_is_deterministic() {
        let dir = TempDir::new().unwrap();
        let mut recorder = SessionRecorder::create(dir.path()).unwrap();
        for i in 0..5 {
            recorder.record(&target(i * 10, i * 20), &test_frame()).unwrap();
        }
        drop(recorder);

        let first = load_index(dir.path()).unwrap();
        let second = load_index(dir.path()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 5);
        assert!(first.windows(2).all(|w| w[0].image_filename < w[1].image_filename));
    }

    #[test]
    fn nested_output_directory_is_created() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("data").join("p00");
        let recorder = SessionRecorder::create(&nested).unwrap();
        assert!(recorder.is_empty());
        assert!(nested.join(INDEX_FILE).exists());
    }

    #[test]
    fn unwritable_output_path_fails() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("occupied");
        fs::write(&blocker, b"not a directory").unwrap();

        assert!(SessionRecorder::create(&blocker).is_err());
    }
}
