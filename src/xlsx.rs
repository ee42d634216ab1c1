use crate::report::{Column, Report, RowGroup};
use anyhow::Context;
use rust_xlsxwriter::{Color, Format, FormatAlign, FormatPattern, Url, Workbook, Worksheet};
use std::path::Path;
use tracing::{info, warn};

const SHEET_NAME: &str = "Pods";
const HEADER_FILL: u32 = 0xD9EAD3;
const CELL_FONT: &str = "Source Code Pro Medium";

struct Formats {
    header: Format,
    plain: Format,
    wrapped: Format,
}

impl Formats {
    fn new() -> Self {
        let plain = Format::new()
            .set_font_name(CELL_FONT)
            .set_align(FormatAlign::VerticalCenter);
        Self {
            header: Format::new()
                .set_pattern(FormatPattern::Solid)
                .set_background_color(Color::RGB(HEADER_FILL)),
            wrapped: plain.clone().set_text_wrap(),
            plain,
        }
    }

    fn for_column(&self, column: Column) -> &Format {
        if column.wraps_text() {
            &self.wrapped
        } else {
            &self.plain
        }
    }
}

/// Lay the report out on a single worksheet.
pub fn render_workbook(report: &Report) -> anyhow::Result<Workbook> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;
    sheet.set_freeze_panes(1, 2)?;

    let formats = Formats::new();
    for (col, column) in report.columns.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, column.header(), &formats.header)?;
    }

    let mut row: u32 = 1;
    for group in &report.groups {
        let last = row + group.row_count() as u32 - 1;
        for (col, &column) in report.columns.iter().enumerate() {
            let col = col as u16;
            let format = formats.for_column(column);
            if column.is_pod_level() {
                write_pod_cell(sheet, group, column, (row, last), col, format)?;
            } else {
                for offset in 0..group.row_count() {
                    let text = group
                        .cell(offset, column)
                        .map(|c| c.text.as_str())
                        .unwrap_or_default();
                    sheet.write_string_with_format(row + offset as u32, col, text, format)?;
                }
            }
        }
        row = last + 1;
    }

    for (col, width) in report.column_widths().into_iter().enumerate() {
        sheet.set_column_width(col as u16, width)?;
    }

    Ok(workbook)
}

/// Write a pod-level cell, merged vertically over the group's rows.
fn write_pod_cell(
    sheet: &mut Worksheet,
    group: &RowGroup,
    column: Column,
    (first, last): (u32, u32),
    col: u16,
    format: &Format,
) -> anyhow::Result<()> {
    let cell = group.cell(0, column).cloned().unwrap_or_default();
    if last > first {
        // The top-left cell is rewritten below when it holds a link or a number.
        sheet.merge_range(first, col, last, col, &cell.text, format)?;
    }

    if let Some(link) = &cell.link {
        let url = Url::new(link).set_text(&cell.text);
        if let Err(e) = sheet.write_url_with_format(first, col, url, format) {
            warn!("Writing link as plain text ({}): {}", e, link);
            sheet.write_string_with_format(first, col, link, format)?;
        }
    } else if let Some(number) = cell.number {
        sheet.write_number_with_format(first, col, number, format)?;
    } else if last == first {
        sheet.write_string_with_format(first, col, &cell.text, format)?;
    }
    Ok(())
}

pub fn write_report(report: &Report, path: &Path) -> anyhow::Result<()> {
    let mut workbook = render_workbook(report)?;
    workbook
        .save(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!(
        "Wrote {} rows for {} pod templates to {}",
        report.data_rows(),
        report.groups.len(),
        path.display()
    );
    Ok(())
}
