use std::path::Path;

use rust_xlsxwriter::{Format, Workbook};
use tracing::debug;

use crate::error::Result;
use crate::locale::Locale;
use crate::models::{AttendanceReport, Round};
use crate::report::{percent_cell, week_cell};

pub const ATTENDANCE_WORKBOOK: &str = "attendance.xlsx";
pub const ROUNDS_WORKBOOK: &str = "rounds.xlsx";
const MAX_COLUMN_CHARS: usize = 80;

/// A table that will be materialised as one worksheet.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetTable {
    pub sheet_name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl SheetTable {
    fn new(sheet_name: &str, columns: &[&str]) -> Self {
        SheetTable {
            sheet_name: sheet_name.to_string(),
            columns: columns.iter().map(|column| column.to_string()).collect(),
            rows: Vec::new(),
        }
    }
}

/// Weekly and participation sheets for the attendance workbook.
pub fn attendance_tables(report: &AttendanceReport, locale: Locale) -> Vec<SheetTable> {
    let mut weekly = SheetTable::new("Weekly", &locale.weekly_headers());
    weekly.rows = report
        .weeks
        .iter()
        .map(|week| vec![week.label.clone(), week_cell(week, locale)])
        .collect();

    let mut participation = SheetTable::new("Participation", &locale.participation_headers());
    participation.rows = report
        .participation
        .iter()
        .map(|record| vec![record.name.clone(), percent_cell(record)])
        .collect();

    vec![weekly, participation]
}

pub fn rounds_table(rounds: &[Round], locale: Locale) -> SheetTable {
    let mut table = SheetTable::new("Rounds", &locale.round_headers());
    table.rows = rounds
        .iter()
        .map(|round| {
            vec![
                round.name.clone(),
                round.date.clone(),
                round.time.clone(),
                round.round_id.clone(),
                round.participants.join(", "),
            ]
        })
        .collect();
    table
}

pub fn write_attendance_workbook(
    path: &Path,
    report: &AttendanceReport,
    locale: Locale,
) -> Result<()> {
    save_workbook(path, &attendance_tables(report, locale), locale)
}

pub fn write_rounds_workbook(path: &Path, rounds: &[Round], locale: Locale) -> Result<()> {
    save_workbook(path, &[rounds_table(rounds, locale)], locale)
}

fn save_workbook(path: &Path, tables: &[SheetTable], locale: Locale) -> Result<()> {
    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();

    for table in tables {
        add_sheet(&mut workbook, table, &header, locale)?;
    }

    workbook.save(path)?;
    debug!(path = %path.display(), sheets = tables.len(), "workbook saved");
    Ok(())
}

/// Bold frozen header row, columns sized to their longest cell, right-to-left
/// layout for Hebrew.
fn add_sheet(
    workbook: &mut Workbook,
    table: &SheetTable,
    header: &Format,
    locale: Locale,
) -> Result<()> {
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(&table.sheet_name)?;
    worksheet.set_right_to_left(locale == Locale::Hebrew);

    for (col_idx, title) in table.columns.iter().enumerate() {
        let col = col_idx as u16;
        worksheet.write_string_with_format(0, col, title, header)?;

        let mut widest = title.chars().count();
        for (row_idx, row) in table.rows.iter().enumerate() {
            if let Some(cell) = row.get(col_idx) {
                worksheet.write_string(row_idx as u32 + 1, col, cell)?;
                widest = widest.max(cell.chars().count());
            }
        }
        worksheet.set_column_width(col, (widest.min(MAX_COLUMN_CHARS) + 2) as f64)?;
    }

    worksheet.set_freeze_panes(1, 0)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attendance::tests::{at, event, query, range, roster};
    use crate::attendance::{build_report, filter_attendance};
    use crate::rounds::build_rounds;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn attendance_tables_use_localized_headers() {
        let events = vec![event("E1", at(2024, 2, 3, 18), &[("P1", false)])];
        let q = query(range((2024, 2, 1), (2024, 2, 15)), "IDC");
        let report = build_report(&events, &roster(), &q).unwrap();

        let tables = attendance_tables(&report, Locale::English);

        assert_eq!(tables[0].columns, vec!["Week", "Participants"]);
        assert_eq!(tables[0].rows.len(), 2);
        assert_eq!(tables[0].rows[1][1], "No sessions this week");
        assert_eq!(tables[1].rows, vec![vec!["name-P1", "50.00%"]]);
    }

    #[test]
    fn workbook_is_written_to_disk() {
        let events = vec![event("E1", at(2024, 2, 3, 18), &[("P1", false)])];
        let q = query(range((2024, 2, 1), (2024, 2, 15)), "IDC");
        let attendance = filter_attendance(&events, &roster(), &q).unwrap();
        let rounds = build_rounds(&attendance);
        let dir = tempdir().unwrap();
        let path = dir.path().join(ROUNDS_WORKBOOK);

        write_rounds_workbook(&path, &rounds, Locale::Hebrew).unwrap();

        assert!(path.exists());
    }

    #[test]
    fn empty_attendance_workbook_is_still_written() {
        let q = query(range((2024, 2, 1), (2024, 2, 8)), "IDC");
        let report = build_report(&[], &roster(), &q).unwrap();
        let dir = tempdir().unwrap();
        let path = dir.path().join(ATTENDANCE_WORKBOOK);

        write_attendance_workbook(&path, &report, Locale::English).unwrap();

        assert!(fs::metadata(&path).unwrap().len() > 0);
    }
}
