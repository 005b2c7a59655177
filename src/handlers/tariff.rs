// src/handlers/tariff.rs
use chrono::Datelike;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use warp::reply::Json;
use warp::Rejection;

use super::error::ApiError;
use super::{reply, session_key};
use crate::services::aggregation::{filter, months_with_data, Period};
use crate::services::tariff::{analyze, compute_with, TariffConfig};
use crate::state::AppState;

/// Financial analysis of one generation year with the session's tariff.
pub async fn get_tariff(year: i32, session_id: Option<String>, state: Arc<AppState>) -> Result<Json, Rejection> {
    info!("Handling request for the {} economic analysis", year);

    let id = session_key(session_id);
    let mut session = state.sessions.checkout(&id);
    let records = state.dashboard.load(&mut session).await;

    let generated: f64 = filter(&records, Period::Year(year)).iter().map(|r| r.energy_kwh).sum();
    let analysis = analyze(
        &session.tariff,
        year,
        generated,
        months_with_data(&records, year),
        state.today(),
    );

    Ok(reply(&state, &id, session, analysis))
}

#[derive(Debug, Deserialize)]
pub struct ComputeRequest {
    pub total_kwh: f64,
    /// Defaults to the current year.
    pub year: Option<i32>,
}

/// Prices an arbitrary amount of energy with the session's tariff.
pub async fn compute_tariff(
    session_id: Option<String>,
    request: ComputeRequest,
    state: Arc<AppState>,
) -> Result<Json, Rejection> {
    if !request.total_kwh.is_finite() || request.total_kwh < 0.0 {
        return Err(warp::reject::custom(ApiError::unprocessable(format!(
            "total_kwh must be a non-negative number, got {}",
            request.total_kwh
        ))));
    }

    let id = session_key(session_id);
    let session = state.sessions.checkout(&id);
    let year = request.year.unwrap_or_else(|| state.today().year());
    let breakdown = compute_with(request.total_kwh, &session.tariff, year);

    Ok(reply(&state, &id, session, breakdown))
}

pub async fn get_tariff_config(session_id: Option<String>, state: Arc<AppState>) -> Result<Json, Rejection> {
    let id = session_key(session_id);
    let session = state.sessions.checkout(&id);
    let config = session.tariff.clone();
    Ok(reply(&state, &id, session, config))
}

pub async fn put_tariff_config(
    session_id: Option<String>,
    config: TariffConfig,
    state: Arc<AppState>,
) -> Result<Json, Rejection> {
    if let Err(e) = config.validate() {
        warn!("Rejected tariff configuration: {}", e);
        return Err(warp::reject::custom(ApiError::unprocessable(e.to_string())));
    }
    info!("Updating tariff configuration");

    let id = session_key(session_id);
    let mut session = state.sessions.checkout(&id);
    session.tariff = config.clone();
    session.info("Parâmetros atualizados");

    Ok(reply(&state, &id, session, config))
}

#[derive(Serialize)]
struct EditMode {
    edit_mode: bool,
}

pub async fn toggle_edit_mode(session_id: Option<String>, state: Arc<AppState>) -> Result<Json, Rejection> {
    let id = session_key(session_id);
    let mut session = state.sessions.checkout(&id);
    let edit_mode = session.toggle_edit_mode();
    info!("Session '{}' edit mode: {}", id, edit_mode);

    Ok(reply(&state, &id, session, EditMode { edit_mode }))
}
