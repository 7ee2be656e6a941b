use std::path::PathBuf;

use anyhow::Context;
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use clap::Args;

use crate::attendance::{AttendanceQuery, RecordPolicy};
use crate::feedback::{FeedbackQuery, DEFAULT_MONTHS};
use crate::locale::Locale;
use crate::models::DateRange;

pub const DEFAULT_OUTPUT_DIR: &str = "output";
pub const MAX_OFFSET_HOURS: i64 = 23;

fn fixed_offset(hours: i32) -> anyhow::Result<FixedOffset> {
    hours
        .checked_mul(3600)
        .and_then(FixedOffset::east_opt)
        .with_context(|| format!("invalid UTC offset {hours} hours"))
}

fn record_policy(skip_invalid: bool) -> RecordPolicy {
    if skip_invalid {
        RecordPolicy::SkipInvalid
    } else {
        RecordPolicy::Strict
    }
}

/// Window, society and rendering options shared by the report commands.
#[derive(Args, Debug, Clone)]
pub struct ReportArgs {
    /// Society (club) whose members are reported
    #[arg(long)]
    pub society: String,
    /// First day of the window, YYYY-MM-DD
    #[arg(long)]
    pub start: NaiveDate,
    /// Day the window ends (exclusive), YYYY-MM-DD
    #[arg(long)]
    pub end: NaiveDate,
    /// Hours east of UTC used for day boundaries and labels
    #[arg(
        long,
        default_value_t = 0,
        allow_hyphen_values = true,
        value_parser = clap::value_parser!(i32).range(-MAX_OFFSET_HOURS..=MAX_OFFSET_HOURS)
    )]
    pub utc_offset: i32,
    #[arg(long, value_enum, default_value_t = Locale::Hebrew)]
    pub locale: Locale,
    /// Skip events with unreadable times instead of failing
    #[arg(long)]
    pub skip_invalid: bool,
    #[arg(long, default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,
}

impl ReportArgs {
    pub fn query(&self) -> anyhow::Result<AttendanceQuery> {
        let offset = fixed_offset(self.utc_offset)?;
        let range = DateRange::from_dates(self.start, self.end, offset)
            .context("could not place window dates at the requested offset")?;

        Ok(AttendanceQuery {
            range,
            society: self.society.clone(),
            locale: self.locale,
            policy: record_policy(self.skip_invalid),
        })
    }
}

/// Options for the novice feedback report.
#[derive(Args, Debug, Clone)]
pub struct FeedbackArgs {
    /// How many months back from now to collect feedback
    #[arg(long, default_value_t = DEFAULT_MONTHS)]
    pub months: u32,
    /// Hours east of UTC used for event times
    #[arg(
        long,
        default_value_t = 0,
        allow_hyphen_values = true,
        value_parser = clap::value_parser!(i32).range(-MAX_OFFSET_HOURS..=MAX_OFFSET_HOURS)
    )]
    pub utc_offset: i32,
    #[arg(long, value_enum, default_value_t = Locale::English)]
    pub locale: Locale,
    /// Skip events with unreadable times instead of failing
    #[arg(long)]
    pub skip_invalid: bool,
    #[arg(long, default_value = DEFAULT_OUTPUT_DIR)]
    pub output_dir: PathBuf,
}

impl FeedbackArgs {
    pub fn query(&self, now: DateTime<Utc>) -> anyhow::Result<FeedbackQuery> {
        let offset = fixed_offset(self.utc_offset)?;
        FeedbackQuery::lookback(
            now.with_timezone(&offset),
            self.months,
            self.locale,
            record_policy(self.skip_invalid),
        )
        .with_context(|| format!("cannot look back {} months", self.months))
    }
}
