// src/handlers/summary.rs
use log::{debug, info};
use serde::Serialize;
use std::sync::Arc;
use warp::reply::Json;
use warp::Rejection;

use super::error::ApiError;
use super::{reply, session_key, PeriodQuery};
use crate::services::aggregation::{
    annual_progress, available_months, available_years, calendar_grid, cumulative, default_selection,
    filter, monthly_totals, overview, summarize, FilterDefaults, Overview,
};
use crate::state::AppState;

pub async fn get_summary(
    session_id: Option<String>,
    query: PeriodQuery,
    state: Arc<AppState>,
) -> Result<Json, Rejection> {
    let period = query.period().map_err(warp::reject::custom)?;
    info!("Handling request to summarize {:?}", period);

    let id = session_key(session_id);
    let mut session = state.sessions.checkout(&id);
    let records = state.dashboard.load(&mut session).await;
    let summary = summarize(&filter(&records, period));
    debug!("Summary: {:?}", summary);

    Ok(reply(&state, &id, session, summary))
}

pub async fn get_cumulative(
    session_id: Option<String>,
    query: PeriodQuery,
    state: Arc<AppState>,
) -> Result<Json, Rejection> {
    let period = query.period().map_err(warp::reject::custom)?;
    info!("Handling request for cumulative generation over {:?}", period);

    let id = session_key(session_id);
    let mut session = state.sessions.checkout(&id);
    let records = state.dashboard.load(&mut session).await;
    let series = cumulative(&filter(&records, period));

    Ok(reply(&state, &id, session, series))
}

pub async fn get_monthly(year: i32, session_id: Option<String>, state: Arc<AppState>) -> Result<Json, Rejection> {
    info!("Handling request for monthly totals of {}", year);

    let id = session_key(session_id);
    let mut session = state.sessions.checkout(&id);
    let records = state.dashboard.load(&mut session).await;

    Ok(reply(&state, &id, session, monthly_totals(&records, year)))
}

pub async fn get_annual(
    year: i32,
    month: u32,
    session_id: Option<String>,
    state: Arc<AppState>,
) -> Result<Json, Rejection> {
    if !(1..=12).contains(&month) {
        return Err(warp::reject::custom(ApiError::bad_request(format!(
            "month must be 1-12, got {}",
            month
        ))));
    }
    info!("Handling request for annual progress {}/{}", month, year);

    let id = session_key(session_id);
    let mut session = state.sessions.checkout(&id);
    let records = state.dashboard.load(&mut session).await;

    Ok(reply(&state, &id, session, annual_progress(&records, year, month)))
}

pub async fn get_heatmap(year: i32, session_id: Option<String>, state: Arc<AppState>) -> Result<Json, Rejection> {
    info!("Handling request for the {} heatmap", year);

    let id = session_key(session_id);
    let mut session = state.sessions.checkout(&id);
    let records = state.dashboard.load(&mut session).await;

    Ok(reply(&state, &id, session, calendar_grid(&records, year)))
}

#[derive(Serialize)]
struct OverviewResponse {
    #[serde(flatten)]
    overview: Overview,
    years: Vec<i32>,
    months: Vec<u32>,
    selected: FilterDefaults,
    edit_mode: bool,
}

/// Sidebar figures and filter defaults.
pub async fn get_overview(session_id: Option<String>, state: Arc<AppState>) -> Result<Json, Rejection> {
    info!("Handling request for the overview");

    let id = session_key(session_id);
    let mut session = state.sessions.checkout(&id);
    let records = state.dashboard.load(&mut session).await;

    let selected = default_selection(&records, state.today());
    let response = OverviewResponse {
        overview: overview(&records),
        years: available_years(&records),
        months: selected
            .year
            .map(|year| available_months(&records, year))
            .unwrap_or_default(),
        selected,
        edit_mode: session.edit_mode,
    };

    Ok(reply(&state, &id, session, response))
}
