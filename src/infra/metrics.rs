// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Mirrors every progress line of the adversarial loop into a
// CSV file so loss curves can be plotted after the run.
//
// Output file: <checkpoint_dir>/metrics.csv
//
//   epoch,batch,d_loss,g_loss
//   1,10,1.384512,0.702113
//   1,20,1.297730,0.781904
//   ...
//
// The file is appended to across runs; a resumed run simply
// continues below the previous rows.

use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use serde::{Deserialize, Serialize};

use crate::domain::error::{GanError, GanResult};

const HEADER: &str = "epoch,batch,d_loss,g_loss";

/// One logged progress point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub epoch:  usize,
    /// 1-based batch index within the epoch
    pub batch:  usize,
    pub d_loss: f64,
    pub g_loss: f64,
}

impl ProgressRecord {
    pub fn new(epoch: usize, batch: usize, d_loss: f64, g_loss: f64) -> Self {
        Self { epoch, batch, d_loss, g_loss }
    }
}

pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Writes the CSV header if the file doesn't exist yet.
    pub fn new(dir: impl AsRef<Path>) -> GanResult<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|e| GanError::io(dir.display(), e))?;

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path).map_err(|e| GanError::io(csv_path.display(), e))?;
            writeln!(f, "{HEADER}").map_err(|e| GanError::io(csv_path.display(), e))?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    pub fn log(&self, m: &ProgressRecord) -> GanResult<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .map_err(|e| GanError::io(self.csv_path.display(), e))?;

        writeln!(f, "{},{},{:.6},{:.6}", m.epoch, m.batch, m.d_loss, m.g_loss)
            .map_err(|e| GanError::io(self.csv_path.display(), e))
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_append_below_single_header() {
        let dir = tempfile::tempdir().unwrap();

        let logger = MetricsLogger::new(dir.path()).unwrap();
        logger.log(&ProgressRecord::new(1, 10, 1.5, 0.75)).unwrap();

        // Reopening must not write a second header
        let logger = MetricsLogger::new(dir.path()).unwrap();
        logger.log(&ProgressRecord::new(1, 20, 1.25, 0.5)).unwrap();

        let csv = fs::read_to_string(logger.csv_path()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines, vec![
            HEADER,
            "1,10,1.500000,0.750000",
            "1,20,1.250000,0.500000",
        ]);
    }
}
