//! XLSX output.

use std::path::Path;

use rust_xlsxwriter::{Format, Workbook};
use tempfile::NamedTempFile;

use super::{Accumulator, ExportError};

const SHEET_NAME: &str = "parts";
const MAX_ROWS: usize = 1_048_576;
const MAX_COLUMNS: usize = 16_384;

/// Write `table` to a temporary workbook in `dir`.
pub(super) fn write_temp(table: &Accumulator, dir: &Path) -> Result<NamedTempFile, ExportError> {
    let columns = table.columns().len();
    if table.len() + 1 > MAX_ROWS || columns > MAX_COLUMNS {
        return Err(ExportError::TooLarge {
            rows: table.len(),
            columns,
        });
    }

    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;

    let bold = Format::new().set_bold();
    for (col, name) in table.columns().iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, name, &bold)?;
    }
    for (i, row) in table.rows().enumerate() {
        for (col, value) in row.iter().enumerate() {
            if !value.is_empty() {
                sheet.write_string((i + 1) as u32, col as u16, *value)?;
            }
        }
    }
    sheet.autofit();

    let mut tmp = tempfile::Builder::new()
        .prefix(".partscout-")
        .suffix(".xlsx")
        .tempfile_in(dir)?;
    workbook.save_to_writer(&mut tmp)?;
    Ok(tmp)
}
