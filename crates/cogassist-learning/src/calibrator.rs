//! C9's ConfidenceCalibrator: maps a raw predicted confidence to a
//! bin-smoothed calibrated value, and reports expected calibration error.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use cogassist_core::config::LearningConfig;
use cogassist_core::util::clamp;
use cogassist_storage::atomic::{read_json, write_json_atomic};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct Bin {
    #[serde(default)]
    samples: VecDeque<(f64, f64)>,
}

impl Bin {
    fn record(&mut self, predicted: f64, actual: f64, capacity: usize) {
        self.samples.push_back((predicted, actual));
        while self.samples.len() > capacity {
            self.samples.pop_front();
        }
    }

    fn avg_predicted(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().map(|(p, _)| p).sum::<f64>() / self.samples.len() as f64
    }

    fn avg_actual(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().map(|(_, a)| a).sum::<f64>() / self.samples.len() as f64
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct CalibratorFile {
    bins: Vec<Bin>,
}

pub struct ConfidenceCalibrator {
    config: LearningConfig,
    path: PathBuf,
    num_bins: usize,
    bins: Arc<DashMap<usize, Bin>>,
}

impl ConfidenceCalibrator {
    pub fn new(path: impl Into<PathBuf>, config: LearningConfig) -> cogassist_storage::StorageResult<Self> {
        let num_bins = config.default_num_bins.max(1);
        let path = path.into();
        let bins = Arc::new(DashMap::new());
        if let Some(file) = read_json::<CalibratorFile>(&path)? {
            for (idx, bin) in file.bins.into_iter().enumerate() {
                bins.insert(idx, bin);
            }
        }
        Ok(Self { config, path, num_bins, bins })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn bin_index(&self, p: f64) -> usize {
        let p = p.clamp(0.0, 1.0);
        ((p * self.num_bins as f64) as usize).min(self.num_bins - 1)
    }

    /// Record an observed outcome for a predicted confidence, for future
    /// calibration and ECE computation.
    pub fn observe(&self, predicted: f64, actual: f64) -> cogassist_storage::StorageResult<()> {
        let idx = self.bin_index(predicted);
        self.bins
            .entry(idx)
            .or_default()
            .record(predicted, actual, self.config.calibration_history_capacity);
        self.persist()
    }

    fn persist(&self) -> cogassist_storage::StorageResult<()> {
        let mut bins = vec![Bin::default(); self.num_bins];
        for entry in self.bins.iter() {
            if let Some(slot) = bins.get_mut(*entry.key()) {
                *slot = entry.value().clone();
            }
        }
        write_json_atomic(&self.path, &CalibratorFile { bins })
    }

    /// Calibrate a raw predicted confidence. Returns `p` unchanged if the
    /// owning bin has fewer than `default_min_samples_per_bin` samples.
    pub fn calibrate(&self, p: f64) -> f64 {
        let idx = self.bin_index(p);
        let Some(bin) = self.bins.get(&idx) else {
            return clamp(p);
        };
        if bin.samples.len() < self.config.default_min_samples_per_bin {
            return clamp(p);
        }
        let bin_avg = bin.avg_actual();
        let smoothing = self.config.default_smoothing_factor;
        clamp(bin_avg * smoothing + p * (1.0 - smoothing))
    }

    /// Expected calibration error: the sample-weighted mean of
    /// `|avg_predicted - avg_actual|` across bins with any samples.
    pub fn expected_calibration_error(&self) -> f64 {
        let mut total_weight = 0.0;
        let mut weighted_error = 0.0;
        for entry in self.bins.iter() {
            let bin = entry.value();
            if bin.samples.is_empty() {
                continue;
            }
            let weight = bin.samples.len() as f64;
            weighted_error += weight * (bin.avg_predicted() - bin.avg_actual()).abs();
            total_weight += weight;
        }
        if total_weight == 0.0 {
            0.0
        } else {
            weighted_error / total_weight
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calibrate_without_samples_returns_input() {
        let dir = tempfile::tempdir().unwrap();
        let calibrator = ConfidenceCalibrator::new(dir.path().join("cal.json"), LearningConfig::default()).unwrap();
        assert_eq!(calibrator.calibrate(0.7), 0.7);
    }

    #[test]
    fn calibrate_pulls_toward_observed_outcomes() {
        let dir = tempfile::tempdir().unwrap();
        let calibrator = ConfidenceCalibrator::new(dir.path().join("cal.json"), LearningConfig::default()).unwrap();
        for _ in 0..10 {
            calibrator.observe(0.9, 0.5).unwrap();
        }
        let calibrated = calibrator.calibrate(0.9);
        assert!(calibrated < 0.9);
    }

    #[test]
    fn ece_is_zero_with_no_observations() {
        let dir = tempfile::tempdir().unwrap();
        let calibrator = ConfidenceCalibrator::new(dir.path().join("cal.json"), LearningConfig::default()).unwrap();
        assert_eq!(calibrator.expected_calibration_error(), 0.0);
    }

    #[test]
    fn reopening_calibrator_loads_persisted_bins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cal.json");
        let calibrator = ConfidenceCalibrator::new(&path, LearningConfig::default()).unwrap();
        for _ in 0..10 {
            calibrator.observe(0.9, 0.5).unwrap();
        }
        let reopened = ConfidenceCalibrator::new(&path, LearningConfig::default()).unwrap();
        assert!(reopened.expected_calibration_error() > 0.0);
    }
}
