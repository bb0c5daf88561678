//! CSV output.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use super::{Accumulator, ExportError};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Write `table` to a temporary file in `dir`.
pub(super) fn write_temp(table: &Accumulator, dir: &Path, bom: bool) -> Result<NamedTempFile, ExportError> {
    let mut tmp = tempfile::Builder::new()
        .prefix(".partscout-")
        .suffix(".csv")
        .tempfile_in(dir)?;
    if bom {
        tmp.write_all(UTF8_BOM)?;
    }
    {
        let mut writer = csv::Writer::from_writer(&mut tmp);
        writer.write_record(table.columns())?;
        for row in table.rows() {
            writer.write_record(&row)?;
        }
        writer.flush()?;
    }
    Ok(tmp)
}
