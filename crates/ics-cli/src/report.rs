//! Tabular coverage log written by `ics_sweep`.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Column order of the CSV output.
pub const COLUMNS: [&str; 3] = ["yaw", "yaw_coverage", "circle_coverage"];

/// One heading's coverage next to the heading-independent circle coverage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CoverageRecord {
    pub yaw: f64,
    pub yaw_coverage: f64,
    pub circle_coverage: f64,
}

#[derive(Debug, Clone, Default)]
pub struct CoverageLog {
    records: Vec<CoverageRecord>,
}

impl CoverageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, record: CoverageRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[CoverageRecord] {
        &self.records
    }

    pub fn write_to<W: Write>(&self, mut out: W) -> Result<()> {
        writeln!(out, "{}", COLUMNS.join(","))?;
        for r in &self.records {
            writeln!(out, "{},{},{}", r.yaw, r.yaw_coverage, r.circle_coverage)?;
        }
        out.flush()?;
        Ok(())
    }

    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let file = File::create(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        self.write_to(BufWriter::new(file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_has_header_and_one_row_per_record() {
        let mut log = CoverageLog::new();
        log.record(CoverageRecord {
            yaw: 0.0,
            yaw_coverage: 0.75,
            circle_coverage: 0.5,
        });
        log.record(CoverageRecord {
            yaw: 0.5,
            yaw_coverage: 0.25,
            circle_coverage: 0.5,
        });

        let mut buf = Vec::new();
        log.write_to(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, ["yaw,yaw_coverage,circle_coverage", "0,0.75,0.5", "0.5,0.25,0.5"]);
    }
}
