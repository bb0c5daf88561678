//! Result table and output files.
//!
//! - `accumulator`: wide table that absorbs per-page schema drift
//! - `csv`, `xlsx`: writers for the two output formats
//!
//! [`Persister`] checks the table, then writes both files through temporary
//! files in the target directory so a failed run never leaves a partial file
//! or half of the CSV/XLSX pair.

mod accumulator;
mod csv;
mod error;
mod xlsx;

use std::path::{Path, PathBuf};

use tracing::{info, warn};

pub use accumulator::Accumulator;
pub use error::ExportError;

/// Where and under what name output is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPlan {
    pub dir: PathBuf,
    pub stem: String,
    /// First and one-past-last input index processed.
    pub start: usize,
    pub end: usize,
    pub csv_bom: bool,
}

impl OutputPlan {
    /// `<stem>_<start>_<end>`
    pub fn file_stem(&self) -> String {
        format!("{}_{}_{}", self.stem, self.start, self.end)
    }

    pub fn csv_path(&self) -> PathBuf {
        self.dir.join(format!("{}.csv", self.file_stem()))
    }

    pub fn xlsx_path(&self) -> PathBuf {
        self.dir.join(format!("{}.xlsx", self.file_stem()))
    }
}

/// Files produced by a successful write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFiles {
    pub csv: PathBuf,
    pub xlsx: PathBuf,
    pub rows: usize,
    pub columns: usize,
}

/// Writes an accumulated table as CSV and XLSX.
pub struct Persister;

impl Persister {
    /// Write `table` according to `plan`.
    ///
    /// Nothing is written when the table is inconsistent or empty, and
    /// either both files are in place afterwards or neither is.
    pub fn write(table: &Accumulator, plan: &OutputPlan) -> Result<WrittenFiles, ExportError> {
        table.check_consistent()?;
        if table.is_empty() {
            return Err(ExportError::Empty);
        }

        let csv_path = plan.csv_path();
        let xlsx_path = plan.xlsx_path();
        for path in [&csv_path, &xlsx_path] {
            if path.is_dir() {
                return Err(ExportError::TargetIsDirectory(path.clone()));
            }
        }

        std::fs::create_dir_all(&plan.dir)?;
        let csv_tmp = csv::write_temp(table, &plan.dir, plan.csv_bom)?;
        let xlsx_tmp = xlsx::write_temp(table, &plan.dir)?;

        persist(csv_tmp, &csv_path)?;
        if let Err(e) = persist(xlsx_tmp, &xlsx_path) {
            if let Err(rm) = std::fs::remove_file(&csv_path) {
                warn!("Could not remove {} after a failed write: {}", csv_path.display(), rm);
            }
            return Err(e);
        }

        info!(
            "Wrote {} rows x {} columns to {} and {}",
            table.len(),
            table.columns().len(),
            csv_path.display(),
            xlsx_path.display()
        );
        Ok(WrittenFiles {
            csv: csv_path,
            xlsx: xlsx_path,
            rows: table.len(),
            columns: table.columns().len(),
        })
    }
}

fn persist(tmp: tempfile::NamedTempFile, path: &Path) -> Result<(), ExportError> {
    tmp.persist(path).map_err(|source| ExportError::Persist {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inconsistent_table_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");
        let table = Accumulator::from_columns(vec![
            ("part_number".to_string(), vec!["6200ZZ".to_string(), "6201ZZ".to_string()]),
            ("price".to_string(), vec!["150,000 VND".to_string()]),
        ]);
        let plan = OutputPlan {
            dir: out.clone(),
            stem: "product_specifications".to_string(),
            start: 0,
            end: 2,
            csv_bom: false,
        };

        match Persister::write(&table, &plan) {
            Err(ExportError::Inconsistent { rows, columns }) => {
                assert_eq!(rows, 2);
                assert_eq!(columns, vec![("price".to_string(), 1)]);
            }
            other => panic!("expected inconsistency, got {:?}", other),
        }
        assert!(!out.exists());
    }
}
