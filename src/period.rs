//! End-of-period dates for SDMX `TIME_PERIOD` codes.

use chrono::NaiveDate;

use crate::table::{Table, Value};

pub const TIME_PERIOD: &str = "TIME_PERIOD";
pub const DATE: &str = "date";

/// Returns the last calendar day of an SDMX period, or `None` if the code is
/// not a recognized annual (`1960`), monthly (`1960-M04`) or quarterly
/// (`1960-Q2`) period.
pub fn parse_time_period(raw: &str) -> Option<NaiveDate> {
    let val = raw.trim();
    if val.contains("-M") {
        let (year, month) = split_once_exact(val, "-M")?;
        let month = month.parse::<u32>().ok().filter(|m| (1..=12).contains(m))?;
        month_end(year.parse().ok()?, month)
    } else if val.contains("-Q") {
        let (year, quarter) = split_once_exact(val, "-Q")?;
        let quarter = quarter.parse::<u32>().ok().filter(|q| (1..=4).contains(q))?;
        month_end(year.parse().ok()?, quarter * 3)
    } else if val.len() == 4 && is_digits(val) {
        NaiveDate::from_ymd_opt(val.parse().ok()?, 12, 31)
    } else {
        None
    }
}

/// Adds (or replaces) `out_col` with the end-of-period date of every value in
/// `time_col`. Unparseable entries become [`Value::Null`].
///
/// An empty table, or one without `time_col`, is returned unchanged.
pub fn convert_time_period(table: &Table, time_col: &str, out_col: &str) -> Table {
    if table.is_empty() {
        return table.clone();
    }
    let Some(values) = table.column(time_col) else {
        tracing::warn!(column = time_col, "time column missing; dates not converted");
        return table.clone();
    };
    let dates = values
        .map(|v| match v {
            Value::Null => Value::Null,
            other => parse_time_period(&other.to_string()).into(),
        })
        .collect();
    table.with_column(out_col, dates)
}

// Both halves must be non-empty ASCII digits and the marker must occur once.
fn split_once_exact<'a>(val: &'a str, marker: &str) -> Option<(&'a str, &'a str)> {
    let mut parts = val.split(marker);
    let (left, right) = (parts.next()?, parts.next()?);
    if parts.next().is_some() || !is_digits(left) || !is_digits(right) {
        return None;
    }
    Some((left, right))
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn month_end(year: i32, month: u32) -> Option<NaiveDate> {
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year.checked_add(1)?, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    next.pred_opt()
}
