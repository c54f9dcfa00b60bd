use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::{Format, Workbook, Worksheet};
use sqlx::postgres::PgPool;

use crate::config::{SheetExport, TableExport};
use crate::db::{CellValue, TableData};
use crate::db::sql;

/// Writes one table per workbook, in mapping order. Destination
/// directories are created before the first query, so they are in
/// place even when a later fetch fails. The first failure aborts the
/// remaining exports.
pub async fn export_tables(pool: &PgPool, exports: &[TableExport]) -> Result<()> {
    for export in exports {
        ensure_parent_dir(&export.output)?;
    }
    for export in exports {
        let data = sql::fetch_table(pool, &export.table).await?;
        write_table_file(&export.output, &data)?;
        println!(
            "Exported {} rows from {} to {}",
            data.rows.len(),
            export.table,
            export.output.display()
        );
    }
    Ok(())
}

/// Builds the combined report: every sheet's rows are fetched first,
/// then the workbook is written in one pass.
pub async fn export_report(pool: &PgPool, path: &Path, sheets: &[SheetExport]) -> Result<()> {
    let mut fetched = Vec::with_capacity(sheets.len());
    for sheet in sheets {
        let data = sql::fetch_table(pool, &sheet.table).await?;
        println!("Fetched {} rows from {}", data.rows.len(), sheet.table);
        fetched.push((sheet.sheet.clone(), data));
    }
    write_workbook(path, &fetched)
}

/// Serializes one result set to a single-sheet workbook at `path`,
/// overwriting any previous file and creating the parent directory if
/// it is missing.
pub fn write_table_file(path: &Path, data: &TableData) -> Result<()> {
    let mut workbook = Workbook::new();
    write_sheet(workbook.add_worksheet(), data)?;
    save_workbook(workbook, path)
}

/// Serializes several result sets as named sheets of one workbook.
pub fn write_workbook(path: &Path, sheets: &[(String, TableData)]) -> Result<()> {
    let mut workbook = Workbook::new();
    for (name, data) in sheets {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(name)?;
        write_sheet(worksheet, data)?;
    }
    save_workbook(workbook, path)
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
    }
    Ok(())
}

fn save_workbook(mut workbook: Workbook, path: &Path) -> Result<()> {
    ensure_parent_dir(path)?;
    workbook
        .save(path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

fn write_sheet(worksheet: &mut Worksheet, data: &TableData) -> Result<()> {
    let header_format = Format::new().set_bold();
    let timestamp_format = Format::new().set_num_format("yyyy-mm-dd hh:mm:ss");
    let date_format = Format::new().set_num_format("yyyy-mm-dd");

    for (col, header) in data.headers.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, header, &header_format)?;
    }

    for (row_idx, row) in data.rows.iter().enumerate() {
        let row_num = row_idx as u32 + 1;
        for (col_idx, value) in row.iter().enumerate() {
            let col = col_idx as u16;
            match value {
                CellValue::Null => {}
                CellValue::Bool(b) => {
                    worksheet.write_boolean(row_num, col, *b)?;
                }
                CellValue::Int(n) => {
                    worksheet.write_number(row_num, col, *n as f64)?;
                }
                CellValue::Float(f) => {
                    worksheet.write_number(row_num, col, *f)?;
                }
                CellValue::Text(s) => {
                    worksheet.write_string(row_num, col, s.as_str())?;
                }
                CellValue::Timestamp(dt) => {
                    worksheet.write_datetime_with_format(row_num, col, dt, &timestamp_format)?;
                }
                CellValue::Date(d) => {
                    worksheet.write_datetime_with_format(row_num, col, d, &date_format)?;
                }
            }
        }
    }

    Ok(())
}
