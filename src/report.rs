use std::fmt::Write;
use std::path::Path;

use csv::{QuoteStyle, WriterBuilder};

use crate::attendance::AttendanceQuery;
use crate::error::Result;
use crate::locale::Locale;
use crate::models::{AttendanceReport, ParticipationRecord, WeekBucket};

pub const WEEKLY_FILE: &str = "dates.tsv";
pub const PARTICIPATION_FILE: &str = "namesToPercent.tsv";

fn tsv_writer(path: &Path) -> Result<csv::Writer<std::fs::File>> {
    Ok(WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(false)
        .quote_style(QuoteStyle::Never)
        .from_path(path)?)
}

pub fn week_cell(week: &WeekBucket, locale: Locale) -> String {
    if week.attendees.is_empty() {
        locale.no_sessions().to_string()
    } else {
        week.attendees.join(", ")
    }
}

pub fn percent_cell(record: &ParticipationRecord) -> String {
    format!("{}%", record.formatted())
}

/// `label<TAB>names`, one line per week.
pub fn write_weekly_tsv(path: &Path, weeks: &[WeekBucket], locale: Locale) -> Result<()> {
    let mut writer = tsv_writer(path)?;
    for week in weeks {
        writer.write_record([week.label.as_str(), week_cell(week, locale).as_str()])?;
    }
    writer.flush()?;
    Ok(())
}

/// `name<TAB>NN.NN%`, highest participation first.
pub fn write_participation_tsv(path: &Path, records: &[ParticipationRecord]) -> Result<()> {
    let mut writer = tsv_writer(path)?;
    for record in records {
        writer.write_record([record.name.as_str(), percent_cell(record).as_str()])?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_report_files(dir: &Path, report: &AttendanceReport, locale: Locale) -> Result<()> {
    write_weekly_tsv(&dir.join(WEEKLY_FILE), &report.weeks, locale)?;
    write_participation_tsv(&dir.join(PARTICIPATION_FILE), &report.participation)
}

pub fn build_summary(query: &AttendanceQuery, report: &AttendanceReport, limit: usize) -> String {
    let mut output = String::new();
    let active_weeks = report
        .weeks
        .iter()
        .filter(|week| !week.attendees.is_empty())
        .count();

    let _ = writeln!(output, "# Attendance for {}", query.society);
    let _ = writeln!(
        output,
        "{} to {}: {} weeks, {} with sessions",
        query.range.start.date_naive(),
        query.range.end.date_naive(),
        report.weeks.len(),
        active_weeks
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Top Participants");

    if report.participation.is_empty() {
        let _ = writeln!(output, "No attendance recorded for this window.");
    } else {
        for record in report.participation.iter().take(limit) {
            let _ = writeln!(
                output,
                "- {} {}% across {} weeks",
                record.name,
                record.formatted(),
                record.weeks_attended
            );
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attendance::build_report;
    use crate::attendance::tests::{at, event, query, range, roster};
    use crate::cache::CachePaths;
    use std::fs;
    use tempfile::tempdir;

    fn sample() -> (AttendanceQuery, AttendanceReport) {
        let events = vec![
            event("E1", at(2024, 2, 3, 18), &[("P1", false), ("P2", false)]),
            event("E2", at(2024, 2, 20, 18), &[("P1", false)]),
        ];
        let q = query(range((2024, 2, 1), (2024, 2, 15)), "IDC");
        let report = build_report(&events, &roster(), &q).unwrap();
        (q, report)
    }

    #[test]
    fn weekly_tsv_marks_empty_weeks() {
        let (_, report) = sample();
        let dir = tempdir().unwrap();

        write_report_files(dir.path(), &report, Locale::English).unwrap();

        let dates = fs::read_to_string(dir.path().join(WEEKLY_FILE)).unwrap();
        assert_eq!(
            dates,
            "01/02/2024 - 08/02/2024\tname-P1, name-P2\n\
             08/02/2024 - 15/02/2024\tNo sessions this week\n"
        );
    }

    #[test]
    fn participation_tsv_has_percent_suffix() {
        let (_, report) = sample();
        let dir = tempdir().unwrap();

        write_report_files(dir.path(), &report, Locale::Hebrew).unwrap();

        let percents = fs::read_to_string(dir.path().join(PARTICIPATION_FILE)).unwrap();
        assert_eq!(percents, "name-P1\t50.00%\nname-P2\t50.00%\n");
    }

    #[test]
    fn full_runs_from_unchanged_cache_are_identical() {
        let dir = tempdir().unwrap();
        let cache = CachePaths::new(dir.path());
        cache
            .store_events(&[
                event("E2", at(2024, 2, 10, 18), &[("P2", false), ("P1", false)]),
                event("E1", at(2024, 2, 3, 18), &[("P1", false), ("P2", true)]),
            ])
            .unwrap();
        cache.store_participants(&roster()).unwrap();
        let q = query(range((2024, 2, 1), (2024, 2, 22)), "IDC");

        let run = || {
            let events = cache.load_events().unwrap();
            let participants = cache.load_participants().unwrap();
            let report = build_report(&events, &participants, &q).unwrap();
            write_report_files(&cache.dir, &report, Locale::Hebrew).unwrap();
            (
                fs::read(cache.dir.join(WEEKLY_FILE)).unwrap(),
                fs::read(cache.dir.join(PARTICIPATION_FILE)).unwrap(),
            )
        };

        let first = run();
        let second = run();

        assert_eq!(first, second);
        assert_eq!(
            String::from_utf8(first.1).unwrap(),
            "name-P1\t66.67%\nname-P2\t33.33%\n"
        );
    }

    #[test]
    fn summary_lists_top_participants() {
        let (q, report) = sample();

        let summary = build_summary(&q, &report, 1);

        assert!(summary.contains("# Attendance for IDC"));
        assert!(summary.contains("2 weeks, 1 with sessions"));
        assert!(summary.contains("- name-P1 50.00% across 1 weeks"));
        assert!(!summary.contains("name-P2"));
    }
}
