//! Read/write calibration JSON files.
//!
//! A calibration file is the portable form of the constants consumed by
//! `scone unfold --calibration`:
//! - response constants `(a, b, σa, σb)` and, when fitted, the fit diagnostics
//! - neutron contamination and pile-up constants
//! - provenance (reference files, multiplicity range, UTC timestamp)

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::MultRange;
use crate::error::{AppError, Stage};
use crate::io::ingest::file_label;
use crate::unfold::calibration::CalibrationConstants;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationFile {
    pub tool: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<DateTime<Utc>>,
    pub constants: CalibrationConstants,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provenance: Option<Provenance>,
}

/// Where fitted response constants came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub references: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mult_range: Option<MultRange>,
}

impl CalibrationFile {
    pub fn new(constants: CalibrationConstants, provenance: Option<Provenance>) -> Self {
        Self {
            tool: "scone".to_string(),
            generated_at: Some(Utc::now()),
            constants,
            provenance,
        }
    }
}

/// Write a calibration JSON file.
pub fn write_calibration_json(path: &Path, calibration: &CalibrationFile) -> Result<(), AppError> {
    let file = File::create(path).map_err(|e| {
        AppError::io(format!("Failed to create calibration JSON '{}': {e}", path.display()))
            .at(Stage::Export)
            .for_input(file_label(path))
    })?;

    serde_json::to_writer_pretty(file, calibration).map_err(|e| {
        AppError::io(format!("Failed to write calibration JSON: {e}"))
            .at(Stage::Export)
            .for_input(file_label(path))
    })?;

    Ok(())
}

/// Read a calibration JSON file.
pub fn read_calibration_json(path: &Path) -> Result<CalibrationFile, AppError> {
    let file = File::open(path).map_err(|e| {
        AppError::io(format!("Failed to open calibration JSON '{}': {e}", path.display()))
            .at(Stage::Calibration)
            .for_input(file_label(path))
    })?;
    let calibration: CalibrationFile = serde_json::from_reader(BufReader::new(file)).map_err(|e| {
        AppError::config(format!("Invalid calibration JSON: {e}"))
            .at(Stage::Calibration)
            .for_input(file_label(path))
    })?;
    Ok(calibration)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn written_file_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calibration.json");
        let file = CalibrationFile::new(
            CalibrationConstants::default(),
            Some(Provenance {
                references: vec!["ref_a.txt".to_string()],
                mult_range: MultRange::new(1.0, 20.0),
            }),
        );

        write_calibration_json(&path, &file).unwrap();
        let back = read_calibration_json(&path).unwrap();

        assert_eq!(back.tool, "scone");
        assert!(back.generated_at.is_some());
        assert_eq!(back.constants.response.a, 19.0);
        assert_eq!(back.provenance.unwrap().references, vec!["ref_a.txt".to_string()]);
    }

    #[test]
    fn pileup_defaults_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("minimal.json");
        std::fs::write(
            &path,
            r#"{
                "tool": "scone",
                "constants": {
                    "response": { "a": 19.0, "b": 28.0, "sigma_a": 0.5, "sigma_b": 1.0 },
                    "contamination": { "value": 0.33, "sigma": 0.01 },
                    "energy_half_width": 0.5
                }
            }"#,
        )
        .unwrap();

        let back = read_calibration_json(&path).unwrap();
        assert!(back.generated_at.is_none());
        assert!(back.constants.response.quality.is_none());
        assert!((back.constants.pileup.at(1.0) - 0.15).abs() < 1e-12);
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = read_calibration_json(&path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Config);
        assert_eq!(err.stage(), Some(Stage::Calibration));
    }
}
