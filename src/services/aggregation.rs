// src/services/aggregation.rs
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::HashMap;

use crate::models::{DayValue, GenerationRecord};
use crate::services::locale::month_abbr;

/// Date window used to slice the record list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    All,
    Year(i32),
    Month { year: i32, month: u32 },
    /// Both ends inclusive.
    Range { start: NaiveDate, end: NaiveDate },
}

impl Period {
    pub fn contains(&self, date: NaiveDate) -> bool {
        match *self {
            Period::All => true,
            Period::Year(year) => date.year() == year,
            Period::Month { year, month } => date.year() == year && date.month() == month,
            Period::Range { start, end } => start <= date && date <= end,
        }
    }
}

pub fn filter(records: &[GenerationRecord], period: Period) -> Vec<GenerationRecord> {
    records
        .iter()
        .filter(|r| period.contains(r.date))
        .cloned()
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub count: usize,
    pub total_kwh: f64,
    pub mean_kwh: f64,
    pub best_day: Option<DayValue>,
    pub worst_day: Option<DayValue>,
}

/// Sum, mean and the best/worst day. Ties go to the earliest date.
pub fn summarize(records: &[GenerationRecord]) -> Summary {
    let count = records.len();
    let total_kwh: f64 = records.iter().map(|r| r.energy_kwh).sum();
    let mean_kwh = if count == 0 { 0.0 } else { total_kwh / count as f64 };

    let mut best: Option<&GenerationRecord> = None;
    let mut worst: Option<&GenerationRecord> = None;
    for record in records {
        if best.map_or(true, |b| record.energy_kwh > b.energy_kwh) {
            best = Some(record);
        }
        if worst.map_or(true, |w| record.energy_kwh < w.energy_kwh) {
            worst = Some(record);
        }
    }

    let day = |r: &GenerationRecord| DayValue {
        date: r.date,
        energy_kwh: r.energy_kwh,
    };

    Summary {
        count,
        total_kwh,
        mean_kwh,
        best_day: best.map(day),
        worst_day: worst.map(day),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CumulativePoint {
    pub date: NaiveDate,
    pub energy_kwh: f64,
    pub cumulative_kwh: f64,
}

/// Running total ordered by date.
pub fn cumulative(records: &[GenerationRecord]) -> Vec<CumulativePoint> {
    let mut sorted: Vec<&GenerationRecord> = records.iter().collect();
    sorted.sort_by_key(|r| r.date);

    let mut running = 0.0;
    sorted
        .into_iter()
        .map(|r| {
            running += r.energy_kwh;
            CumulativePoint {
                date: r.date,
                energy_kwh: r.energy_kwh,
                cumulative_kwh: running,
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthTotal {
    pub month: u32,
    pub label: String,
    pub total_kwh: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlySummary {
    pub year: i32,
    pub months: Vec<MonthTotal>,
    /// Mean over the months that have data.
    pub mean_monthly_kwh: f64,
}

/// Per-month totals of `year`, only for months that have records.
pub fn monthly_totals(records: &[GenerationRecord], year: i32) -> MonthlySummary {
    let mut totals = [None::<f64>; 12];
    for record in records.iter().filter(|r| r.date.year() == year) {
        let slot = &mut totals[record.date.month0() as usize];
        *slot = Some(slot.unwrap_or(0.0) + record.energy_kwh);
    }

    let months: Vec<MonthTotal> = totals
        .iter()
        .enumerate()
        .filter_map(|(i, total)| {
            total.map(|total_kwh| MonthTotal {
                month: i as u32 + 1,
                label: month_abbr(i as u32 + 1),
                total_kwh,
            })
        })
        .collect();

    let mean_monthly_kwh = if months.is_empty() {
        0.0
    } else {
        months.iter().map(|m| m.total_kwh).sum::<f64>() / months.len() as f64
    };

    MonthlySummary {
        year,
        months,
        mean_monthly_kwh,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnnualProgress {
    pub year: i32,
    pub month: u32,
    pub accumulated_to_month_kwh: f64,
    pub year_total_kwh: f64,
    pub months_with_data: usize,
    pub projected_year_kwh: f64,
}

/// Generation accumulated through the end of `month`, plus a naive
/// projection for the whole year.
pub fn annual_progress(records: &[GenerationRecord], year: i32, month: u32) -> AnnualProgress {
    let in_year: Vec<&GenerationRecord> = records.iter().filter(|r| r.date.year() == year).collect();

    let accumulated_to_month_kwh: f64 = in_year
        .iter()
        .filter(|r| r.date.month() <= month)
        .map(|r| r.energy_kwh)
        .sum();
    let year_total_kwh: f64 = in_year.iter().map(|r| r.energy_kwh).sum();
    let months_with_data = months_with_data(records, year);

    let projected_year_kwh = if months_with_data == 0 {
        0.0
    } else {
        accumulated_to_month_kwh / months_with_data as f64 * 12.0
    };

    AnnualProgress {
        year,
        month,
        accumulated_to_month_kwh,
        year_total_kwh,
        months_with_data,
        projected_year_kwh,
    }
}

pub fn months_with_data(records: &[GenerationRecord], year: i32) -> usize {
    let mut seen = [false; 12];
    for record in records.iter().filter(|r| r.date.year() == year) {
        seen[record.date.month0() as usize] = true;
    }
    seen.iter().filter(|s| **s).count()
}

/// Heatmap column for early-January days that ISO numbering puts in the
/// previous year's last week.
pub const LEADING_WEEK: u32 = 0;
/// Heatmap column for late-December days that ISO numbering puts in
/// week 1 of the next year.
pub const TRAILING_WEEK: u32 = 54;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeatmapCell {
    pub date: NaiveDate,
    pub week: u32,
    /// 0 = Monday.
    pub weekday: u32,
    pub month: u32,
    pub energy_kwh: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarGrid {
    pub year: i32,
    pub cells: Vec<HeatmapCell>,
    /// `(month, first grid week)` for column labels.
    pub month_start_weeks: Vec<(u32, u32)>,
}

/// Grid week for `date` within its own calendar year.
pub fn calendar_week(date: NaiveDate) -> u32 {
    let iso_week = date.iso_week().week();
    match date.month() {
        1 if iso_week >= 52 => LEADING_WEEK,
        12 if iso_week == 1 => TRAILING_WEEK,
        _ => iso_week,
    }
}

/// Lays out every day of `year` on a week × weekday grid. Days without a
/// record get 0 kWh.
pub fn calendar_grid(records: &[GenerationRecord], year: i32) -> CalendarGrid {
    let (Some(start), Some(end)) = (
        NaiveDate::from_ymd_opt(year, 1, 1),
        NaiveDate::from_ymd_opt(year, 12, 31),
    ) else {
        return CalendarGrid {
            year,
            cells: Vec::new(),
            month_start_weeks: Vec::new(),
        };
    };

    let by_date: HashMap<NaiveDate, f64> = records
        .iter()
        .filter(|r| r.date.year() == year)
        .map(|r| (r.date, r.energy_kwh))
        .collect();
    let mut cells = Vec::with_capacity(366);
    let mut month_start_weeks: Vec<(u32, u32)> = Vec::with_capacity(12);

    for date in start.iter_days().take_while(|d| *d <= end) {
        let energy_kwh = by_date.get(&date).copied().unwrap_or(0.0);
        let week = calendar_week(date);
        let month = date.month();
        match month_start_weeks.iter_mut().find(|(m, _)| *m == month) {
            Some((_, first)) => *first = (*first).min(week),
            None => month_start_weeks.push((month, week)),
        }

        cells.push(HeatmapCell {
            date,
            week,
            weekday: date.weekday().num_days_from_monday(),
            month,
            energy_kwh,
        });
    }

    CalendarGrid {
        year,
        cells,
        month_start_weeks,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overview {
    pub records: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub total_kwh: f64,
}

pub fn overview(records: &[GenerationRecord]) -> Overview {
    Overview {
        records: records.len(),
        first_date: records.iter().map(|r| r.date).min(),
        last_date: records.iter().map(|r| r.date).max(),
        total_kwh: records.iter().map(|r| r.energy_kwh).sum(),
    }
}

/// Years present in the data, newest first.
pub fn available_years(records: &[GenerationRecord]) -> Vec<i32> {
    let mut years: Vec<i32> = records.iter().map(|r| r.date.year()).collect();
    years.sort_unstable_by(|a, b| b.cmp(a));
    years.dedup();
    years
}

/// Months of `year` present in the data, ascending.
pub fn available_months(records: &[GenerationRecord], year: i32) -> Vec<u32> {
    let mut months: Vec<u32> = records
        .iter()
        .filter(|r| r.date.year() == year)
        .map(|r| r.date.month())
        .collect();
    months.sort_unstable();
    months.dedup();
    months
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FilterDefaults {
    pub year: Option<i32>,
    pub month: Option<u32>,
}

/// Pre-selected year/month for the filter selectors: today's year and
/// month when they have data, otherwise the newest year and its latest
/// month.
pub fn default_selection(records: &[GenerationRecord], today: NaiveDate) -> FilterDefaults {
    let years = available_years(records);
    let year = if years.contains(&today.year()) {
        Some(today.year())
    } else {
        years.first().copied()
    };

    let month = year.and_then(|year| {
        let months = available_months(records, year);
        if months.contains(&today.month()) {
            Some(today.month())
        } else {
            months.last().copied()
        }
    });

    FilterDefaults { year, month }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::collections::HashSet;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn rec(y: i32, m: u32, d: u32, kwh: f64) -> GenerationRecord {
        GenerationRecord::new(ymd(y, m, d), kwh)
    }

    fn sample() -> Vec<GenerationRecord> {
        vec![
            rec(2024, 12, 30, 8.0),
            rec(2025, 1, 1, 10.0),
            rec(2025, 1, 2, 14.0),
            rec(2025, 1, 3, 6.0),
            rec(2025, 2, 10, 20.0),
            rec(2025, 3, 5, 14.0),
        ]
    }

    #[test]
    fn period_filters() {
        let data = sample();
        assert_eq!(filter(&data, Period::All).len(), 6);
        assert_eq!(filter(&data, Period::Year(2025)).len(), 5);
        assert_eq!(filter(&data, Period::Month { year: 2025, month: 1 }).len(), 3);
        let range = Period::Range {
            start: ymd(2024, 12, 30),
            end: ymd(2025, 1, 2),
        };
        assert_eq!(filter(&data, range).len(), 3);
        assert!(filter(&data, Period::Year(2023)).is_empty());
    }

    #[test]
    fn summary_stats() {
        let january = filter(&sample(), Period::Month { year: 2025, month: 1 });
        let summary = summarize(&january);

        assert_eq!(summary.count, 3);
        assert_relative_eq!(summary.total_kwh, 30.0);
        assert_relative_eq!(summary.mean_kwh, 10.0);
        assert_eq!(summary.best_day.unwrap().date, ymd(2025, 1, 2));
        assert_eq!(summary.worst_day.unwrap().date, ymd(2025, 1, 3));
    }

    #[test]
    fn summary_ties_pick_earliest_and_empty_is_zero() {
        let tied = vec![rec(2025, 1, 1, 5.0), rec(2025, 1, 2, 5.0)];
        let summary = summarize(&tied);
        assert_eq!(summary.best_day.unwrap().date, ymd(2025, 1, 1));
        assert_eq!(summary.worst_day.unwrap().date, ymd(2025, 1, 1));

        let empty = summarize(&[]);
        assert_eq!(empty.count, 0);
        assert_eq!(empty.mean_kwh, 0.0);
        assert!(empty.best_day.is_none());
    }

    #[test]
    fn cumulative_is_ordered_running_sum() {
        let mut data = sample();
        data.reverse();
        let series = cumulative(&data);

        assert_eq!(series.first().unwrap().date, ymd(2024, 12, 30));
        let totals: Vec<f64> = series.iter().map(|p| p.cumulative_kwh).collect();
        assert_eq!(totals, vec![8.0, 18.0, 32.0, 38.0, 58.0, 72.0]);
    }

    #[test]
    fn monthly_totals_skip_empty_months() {
        let monthly = monthly_totals(&sample(), 2025);

        let got: Vec<(u32, &str, f64)> = monthly
            .months
            .iter()
            .map(|m| (m.month, m.label.as_str(), m.total_kwh))
            .collect();
        assert_eq!(got, vec![(1, "Jan", 30.0), (2, "Fev", 20.0), (3, "Mar", 14.0)]);
        assert_relative_eq!(monthly.mean_monthly_kwh, 64.0 / 3.0);
    }

    #[test]
    fn annual_progress_projects_from_months_with_data() {
        let progress = annual_progress(&sample(), 2025, 2);

        assert_relative_eq!(progress.accumulated_to_month_kwh, 50.0);
        assert_relative_eq!(progress.year_total_kwh, 64.0);
        assert_eq!(progress.months_with_data, 3);
        assert_relative_eq!(progress.projected_year_kwh, 50.0 / 3.0 * 12.0);

        let none = annual_progress(&sample(), 2019, 6);
        assert_eq!(none.projected_year_kwh, 0.0);
    }

    #[test]
    fn iso_week_edges_are_remapped() {
        // 2021-01-01 is a Friday in ISO week 53 of 2020
        assert_eq!(calendar_week(ymd(2021, 1, 1)), LEADING_WEEK);
        assert_eq!(calendar_week(ymd(2021, 1, 3)), LEADING_WEEK);
        assert_eq!(calendar_week(ymd(2021, 1, 4)), 1);
        // 2024-12-30 is a Monday in ISO week 1 of 2025
        assert_eq!(calendar_week(ymd(2024, 12, 30)), TRAILING_WEEK);
        assert_eq!(calendar_week(ymd(2024, 12, 29)), 52);
        // 2020-12-31 is in ISO week 53 of 2020 and stays there
        assert_eq!(calendar_week(ymd(2020, 12, 31)), 53);
    }

    #[test]
    fn every_day_gets_its_own_cell() {
        for year in 2015..=2035 {
            let grid = calendar_grid(&[], year);
            let days_in_year = if NaiveDate::from_ymd_opt(year, 2, 29).is_some() { 366 } else { 365 };
            assert_eq!(grid.cells.len(), days_in_year, "year {}", year);

            let distinct: HashSet<(u32, u32)> =
                grid.cells.iter().map(|c| (c.week, c.weekday)).collect();
            assert_eq!(distinct.len(), grid.cells.len(), "collision in {}", year);

            // the leading column only holds days before the first Monday
            assert!(grid
                .cells
                .iter()
                .filter(|c| c.week == LEADING_WEEK)
                .all(|c| c.date.month() == 1 && c.date.day() <= 3));
        }
    }

    #[test]
    fn grid_fills_energy_and_month_labels() {
        let grid = calendar_grid(&sample(), 2025);

        let day = |m, d| grid.cells.iter().find(|c| c.date == ymd(2025, m, d)).unwrap();
        assert_eq!(day(1, 2).energy_kwh, 14.0);
        assert_eq!(day(2, 10).energy_kwh, 20.0);
        assert_eq!(day(2, 11).energy_kwh, 0.0);
        // 2025-01-01 is a Wednesday in ISO week 1
        assert_eq!((day(1, 1).week, day(1, 1).weekday), (1, 2));

        assert_eq!(grid.month_start_weeks.len(), 12);
        assert_eq!(grid.month_start_weeks[0], (1, 1));
        // 2025-12-29 onward is ISO week 1 of 2026
        assert_eq!(day(12, 31).week, TRAILING_WEEK);
        assert_eq!(grid.month_start_weeks[11], (12, 49));
    }

    #[test]
    fn filter_defaults_prefer_today() {
        let data = sample();

        let picked = default_selection(&data, ymd(2025, 2, 15));
        assert_eq!(picked, FilterDefaults { year: Some(2025), month: Some(2) });

        let picked = default_selection(&data, ymd(2025, 7, 1));
        assert_eq!(picked, FilterDefaults { year: Some(2025), month: Some(3) });

        let picked = default_selection(&data, ymd(2030, 1, 1));
        assert_eq!(picked.year, Some(2025));

        assert_eq!(default_selection(&[], ymd(2025, 1, 1)), FilterDefaults { year: None, month: None });
        assert_eq!(available_years(&data), vec![2025, 2024]);
        assert_eq!(available_months(&data, 2025), vec![1, 2, 3]);
    }

    #[test]
    fn overview_covers_all_records() {
        let info = overview(&sample());
        assert_eq!(info.records, 6);
        assert_eq!(info.first_date, Some(ymd(2024, 12, 30)));
        assert_eq!(info.last_date, Some(ymd(2025, 3, 5)));
        assert_relative_eq!(info.total_kwh, 72.0);
    }
}
