// src/services/locale.rs
//! Brazilian number and date conventions used by the worksheet.

use chrono::{NaiveDate, NaiveDateTime};

pub const SHEET_DATE_FORMAT: &str = "%d/%m/%Y";

const FALLBACK_DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%Y/%m/%d",
    "%d/%m/%y",
];

const FALLBACK_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
];

pub const MONTH_NAMES: [&str; 12] = [
    "Janeiro", "Fevereiro", "Março", "Abril", "Maio", "Junho",
    "Julho", "Agosto", "Setembro", "Outubro", "Novembro", "Dezembro",
];

/// Full month name for 1-based `month`.
pub fn month_name(month: u32) -> &'static str {
    match month {
        1..=12 => MONTH_NAMES[(month - 1) as usize],
        _ => "",
    }
}

/// Three letter abbreviation, e.g. "Mar".
pub fn month_abbr(month: u32) -> String {
    month_name(month).chars().take(3).collect()
}

/// `%Y` takes any number of digits, so "02/03/25" would parse as year 25.
/// A `%Y` format only counts when the text carries a four digit year.
fn has_full_year(raw: &str) -> bool {
    raw.split(|c: char| !c.is_ascii_digit()).any(|run| run.len() == 4)
}

fn parse_with(raw: &str, fmt: &str) -> Option<NaiveDate> {
    if fmt.contains("%Y") && !has_full_year(raw) {
        return None;
    }
    NaiveDate::parse_from_str(raw, fmt).ok()
}

/// Parses a sheet date, trying `dd/mm/YYYY` first.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Some(date) = parse_with(raw, SHEET_DATE_FORMAT) {
        return Some(date);
    }

    FALLBACK_DATE_FORMATS
        .iter()
        .find_map(|fmt| parse_with(raw, fmt))
        .or_else(|| {
            FALLBACK_DATETIME_FORMATS
                .iter()
                .filter(|fmt| !fmt.contains("%Y") || has_full_year(raw))
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(|dt| dt.date())
        })
}

/// Parses a decimal number written with either `.` or `,` as separator.
///
/// When both appear, whichever comes last is the decimal separator and the
/// other one is treated as a thousands separator ("1.234,5" and "1,234.5"
/// are both 1234.5).
pub fn parse_decimal(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let normalized = match (raw.rfind(','), raw.rfind('.')) {
        (Some(comma), Some(dot)) if comma > dot => raw.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => raw.replace(',', ""),
        (Some(_), None) => raw.replace(',', "."),
        _ => raw.to_string(),
    };

    normalized
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

/// Value as written back to the sheet: shortest round-trip repr, comma decimal.
pub fn format_decimal_comma(value: f64) -> String {
    value.to_string().replace('.', ",")
}

/// `1234.5` → `"1.234,50"`.
pub fn format_number_br(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (formatted.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && formatted.chars().any(|c| c.is_ascii_digit() && c != '0') {
        "-"
    } else {
        ""
    };

    match frac_part {
        Some(frac) => format!("{}{},{}", sign, grouped, frac),
        None => format!("{}{}", sign, grouped),
    }
}

pub fn format_date_br(date: NaiveDate) -> String {
    date.format(SHEET_DATE_FORMAT).to_string()
}
