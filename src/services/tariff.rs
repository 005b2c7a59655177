// src/services/tariff.rs
//! Savings under Brazilian net metering (Lei 14.300).
//!
//! Energy consumed on site is worth the full tariff. Energy injected into
//! the grid is also credited at the full tariff, but pays a growing share
//! of the distribution fee ("Fio B") according to the phase-in schedule.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Share of the Fio B fee charged on injected energy, by calendar year.
pub const FIO_B_SCHEDULE: [(i32, f64); 7] = [
    (2023, 0.15),
    (2024, 0.30),
    (2025, 0.45),
    (2026, 0.60),
    (2027, 0.75),
    (2028, 0.90),
    (2029, 1.00),
];

/// Yearly output loss of the panels.
pub const PANEL_DEGRADATION: f64 = 0.005;

/// Fio B fraction for `year`. Nothing before the law, full fee after 2029.
pub fn tax_fraction(year: i32) -> f64 {
    let (first_year, _) = FIO_B_SCHEDULE[0];
    let (last_year, last_fraction) = FIO_B_SCHEDULE[FIO_B_SCHEDULE.len() - 1];
    if year < first_year {
        return 0.0;
    }
    if year >= last_year {
        return last_fraction;
    }
    FIO_B_SCHEDULE
        .iter()
        .find(|(y, _)| *y == year)
        .map(|(_, fraction)| *fraction)
        .unwrap_or(last_fraction)
}

/// Longest projection horizon accepted for the cash flow.
pub const MAX_LIFETIME_YEARS: u32 = 50;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TariffError {
    #[error("{field} must be greater than zero (got {value})")]
    NotPositive { field: &'static str, value: f64 },
    #[error("{field} must not be negative (got {value})")]
    Negative { field: &'static str, value: f64 },
    #[error("self consumption fraction must be within [0, 1] (got {0})")]
    FractionOutOfRange(f64),
    #[error("system lifetime must be between 1 and 50 years (got {0})")]
    LifetimeOutOfRange(u32),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TariffConfig {
    /// R$/kWh paid for grid energy, taxes included.
    pub full_rate: f64,
    /// R$/kWh distribution fee (Fio B).
    pub grid_fee_rate: f64,
    pub self_consumption_fraction: f64,
    pub install_date: NaiveDate,
    pub initial_investment: f64,
    pub average_monthly_consumption_kwh: f64,
    pub system_lifetime_years: u32,
    pub installed_power_kw: f64,
}

impl Default for TariffConfig {
    fn default() -> Self {
        TariffConfig {
            full_rate: 0.95552617,
            grid_fee_rate: 0.49,
            self_consumption_fraction: 0.30,
            install_date: NaiveDate::from_ymd_opt(2025, 5, 1).unwrap_or_default(),
            initial_investment: 15_000.0,
            average_monthly_consumption_kwh: 363.88,
            system_lifetime_years: 25,
            installed_power_kw: 10.0,
        }
    }
}

impl TariffConfig {
    pub fn validate(&self) -> Result<(), TariffError> {
        let positive = [
            ("full_rate", self.full_rate),
            ("grid_fee_rate", self.grid_fee_rate),
            ("installed_power_kw", self.installed_power_kw),
        ];
        for (field, value) in positive {
            if !(value > 0.0) || !value.is_finite() {
                return Err(TariffError::NotPositive { field, value });
            }
        }

        let non_negative = [
            ("initial_investment", self.initial_investment),
            ("average_monthly_consumption_kwh", self.average_monthly_consumption_kwh),
        ];
        for (field, value) in non_negative {
            if !(value >= 0.0) || !value.is_finite() {
                return Err(TariffError::Negative { field, value });
            }
        }

        if !(0.0..=1.0).contains(&self.self_consumption_fraction) {
            return Err(TariffError::FractionOutOfRange(self.self_consumption_fraction));
        }
        if !(1..=MAX_LIFETIME_YEARS).contains(&self.system_lifetime_years) {
            return Err(TariffError::LifetimeOutOfRange(self.system_lifetime_years));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct TariffBreakdown {
    pub self_consumed_kwh: f64,
    pub injected_kwh: f64,
    pub tax_fraction: f64,
    pub tax_paid: f64,
    pub gross_value: f64,
    pub net_savings: f64,
}

/// Splits `total_kwh` into consumed and injected energy and prices both.
pub fn compute(
    total_kwh: f64,
    full_rate: f64,
    grid_fee_rate: f64,
    self_consumption_fraction: f64,
    year: i32,
) -> TariffBreakdown {
    if total_kwh <= 0.0 {
        return TariffBreakdown::default();
    }

    let fraction = self_consumption_fraction.clamp(0.0, 1.0);
    let self_consumed_kwh = total_kwh * fraction;
    let injected_kwh = total_kwh * (1.0 - fraction);
    let tax_fraction = tax_fraction(year);
    let tax_paid = injected_kwh * grid_fee_rate * tax_fraction;
    let gross_value = (self_consumed_kwh + injected_kwh) * full_rate;

    TariffBreakdown {
        self_consumed_kwh,
        injected_kwh,
        tax_fraction,
        tax_paid,
        gross_value,
        net_savings: gross_value - tax_paid,
    }
}

/// [`compute`] with the rates from `config`.
pub fn compute_with(total_kwh: f64, config: &TariffConfig, year: i32) -> TariffBreakdown {
    compute(
        total_kwh,
        config.full_rate,
        config.grid_fee_rate,
        config.self_consumption_fraction,
        year,
    )
}

/// Years to recover `investment`; 0 when there are no savings.
pub fn payback_years(investment: f64, annual_net_savings: f64) -> f64 {
    if annual_net_savings > 0.0 {
        investment / annual_net_savings
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CashFlowPoint {
    pub year: u32,
    pub cumulative: f64,
}

/// Cumulative cash position from year 0 (the purchase) to `years`, with
/// savings shrinking by [`PANEL_DEGRADATION`] per year.
pub fn cash_flow_projection(investment: f64, annual_savings: f64, years: u32) -> Vec<CashFlowPoint> {
    let years = years.min(MAX_LIFETIME_YEARS);
    let mut points = Vec::with_capacity(years as usize + 1);
    let mut cumulative = -investment;
    points.push(CashFlowPoint { year: 0, cumulative });

    for year in 1..=years {
        let degradation = (1.0 - PANEL_DEGRADATION).powi(year as i32);
        cumulative += annual_savings * degradation;
        points.push(CashFlowPoint { year, cumulative });
    }
    points
}

/// First projected year where the cash position is no longer negative.
pub fn break_even_year(points: &[CashFlowPoint]) -> Option<u32> {
    points
        .iter()
        .find(|p| p.year > 0 && p.cumulative >= 0.0)
        .map(|p| p.year)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EconomicAnalysis {
    pub year: i32,
    pub generated_kwh: f64,
    pub breakdown: TariffBreakdown,
    pub annual_net_savings: f64,
    pub monthly_net_savings: f64,
    pub payback_years: f64,
    pub lifetime_roi_pct: f64,
    pub consumption_compensation_pct: f64,
    pub simple_annual_return_pct: f64,
    pub months_in_operation: u32,
    pub already_saved: f64,
    pub investment_recovered_pct: f64,
    pub simple_npv: f64,
    pub savings_vs_grid_pct: f64,
    pub productivity_kwh_per_kw: f64,
    pub remaining_payback_years: f64,
    pub cash_flow: Vec<CashFlowPoint>,
    pub break_even_year: Option<u32>,
}

/// Whole months between `install_date` and `today`, never less than one.
pub fn months_in_operation(install_date: NaiveDate, today: NaiveDate) -> u32 {
    let months = (today.year() - install_date.year()) * 12 + today.month() as i32 - install_date.month() as i32;
    months.max(1) as u32
}

fn ratio_pct(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator * 100.0
    } else {
        0.0
    }
}

/// Financial indicators for one generation year.
///
/// `months_with_data` scales the year's figures to twelve months so a
/// partially recorded year is not undervalued. `today` drives the
/// "already saved" figures.
pub fn analyze(
    config: &TariffConfig,
    year: i32,
    generated_kwh: f64,
    months_with_data: usize,
    today: NaiveDate,
) -> EconomicAnalysis {
    let breakdown = compute_with(generated_kwh, config, year);

    let annual_net_savings = if months_with_data == 0 {
        0.0
    } else {
        breakdown.net_savings / months_with_data as f64 * 12.0
    };
    let monthly_net_savings = annual_net_savings / 12.0;
    let monthly_kwh = if months_with_data == 0 {
        0.0
    } else {
        generated_kwh / months_with_data as f64
    };

    let investment = config.initial_investment;
    let lifetime = config.system_lifetime_years as f64;
    let payback = payback_years(investment, annual_net_savings);
    let lifetime_savings = annual_net_savings * lifetime;
    let months_in_operation = months_in_operation(config.install_date, today);
    let already_saved = months_in_operation as f64 * monthly_net_savings;
    let grid_cost = config.average_monthly_consumption_kwh * 12.0 * config.full_rate * lifetime;

    let cash_flow = cash_flow_projection(investment, annual_net_savings, config.system_lifetime_years);
    let break_even = break_even_year(&cash_flow);

    EconomicAnalysis {
        year,
        generated_kwh,
        breakdown,
        annual_net_savings,
        monthly_net_savings,
        payback_years: payback,
        lifetime_roi_pct: ratio_pct(lifetime_savings - investment, investment),
        consumption_compensation_pct: ratio_pct(monthly_kwh, config.average_monthly_consumption_kwh).min(100.0),
        simple_annual_return_pct: ratio_pct(annual_net_savings, investment),
        months_in_operation,
        already_saved,
        investment_recovered_pct: ratio_pct(already_saved, investment),
        simple_npv: lifetime_savings - investment,
        savings_vs_grid_pct: ratio_pct(lifetime_savings, grid_cost),
        productivity_kwh_per_kw: if config.installed_power_kw > 0.0 {
            generated_kwh / months_with_data.max(1) as f64 * 12.0 / config.installed_power_kw
        } else {
            0.0
        },
        remaining_payback_years: (payback - months_in_operation as f64 / 12.0).max(0.0),
        cash_flow,
        break_even_year: break_even,
    }
}
