// src/handlers/records.rs
use anyhow::anyhow;
use log::{error, info};
use std::sync::Arc;
use warp::reply::Json;
use warp::{Rejection, Reply};

use super::error::ApiError;
use super::{reply, session_key, write_reply, PeriodQuery};
use crate::models::{GenerationRecord, RecordInput};
use crate::services::aggregation::filter;
use crate::services::locale::{format_date_br, format_number_br};
use crate::state::AppState;

pub async fn list_records(
    session_id: Option<String>,
    query: PeriodQuery,
    state: Arc<AppState>,
) -> Result<Json, Rejection> {
    let period = query.period().map_err(warp::reject::custom)?;
    info!("Handling request to list records for {:?}", period);

    let id = session_key(session_id);
    let mut session = state.sessions.checkout(&id);
    let records = state.dashboard.load(&mut session).await;
    let selected = filter(&records, period);

    Ok(reply(&state, &id, session, selected))
}

pub async fn create_record(
    session_id: Option<String>,
    input: RecordInput,
    state: Arc<AppState>,
) -> Result<Json, Rejection> {
    info!("Handling request to add {} = {} kWh", input.date, input.energy_kwh);

    let id = session_key(session_id);
    let mut session = state.sessions.checkout(&id);
    let ok = state.dashboard.append(&mut session, input.date, input.energy_kwh).await;

    Ok(write_reply(&state, &id, session, ok))
}

pub async fn update_record(
    row_index: usize,
    session_id: Option<String>,
    input: RecordInput,
    state: Arc<AppState>,
) -> Result<Json, Rejection> {
    info!("Handling request to update row {}", row_index);

    let id = session_key(session_id);
    let mut session = state.sessions.checkout(&id);
    let ok = state
        .dashboard
        .update(&mut session, row_index, input.date, input.energy_kwh)
        .await;
    if ok {
        session.edit_mode = false;
    }

    Ok(write_reply(&state, &id, session, ok))
}

pub async fn delete_record(
    row_index: usize,
    session_id: Option<String>,
    state: Arc<AppState>,
) -> Result<Json, Rejection> {
    info!("Handling request to delete row {}", row_index);

    let id = session_key(session_id);
    let mut session = state.sessions.checkout(&id);
    let ok = state.dashboard.delete(&mut session, row_index).await;
    if ok {
        session.edit_mode = false;
    }

    Ok(write_reply(&state, &id, session, ok))
}

/// Clears the cached worksheet rows.
pub async fn refresh(session_id: Option<String>, state: Arc<AppState>) -> Result<Json, Rejection> {
    info!("Handling request to refresh cached data");

    let id = session_key(session_id);
    let mut session = state.sessions.checkout(&id);
    state.dashboard.refresh().await;
    session.info("Dados atualizados");

    Ok(write_reply(&state, &id, session, true))
}

/// The filtered records as a pt-BR formatted CSV.
pub async fn export_csv(
    session_id: Option<String>,
    query: PeriodQuery,
    state: Arc<AppState>,
) -> Result<impl Reply, Rejection> {
    let period = query.period().map_err(warp::reject::custom)?;
    info!("Handling request to export records for {:?}", period);

    let id = session_key(session_id);
    let mut session = state.sessions.checkout(&id);
    let records = filter(&state.dashboard.load(&mut session).await, period);
    state.sessions.store(&id, session);

    let body = records_csv(&records).map_err(|e| {
        error!("Failed to write CSV export: {:#}", e);
        warp::reject::custom(ApiError::new(e.to_string()))
    })?;

    Ok(warp::reply::with_header(
        body,
        "content-type",
        "text/csv; charset=utf-8",
    ))
}

/// `;`-separated so spreadsheet apps in pt-BR locales keep the decimal comma.
pub fn records_csv(records: &[GenerationRecord]) -> anyhow::Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new().delimiter(b';').from_writer(Vec::new());
    writer.write_record(["Data", "Energia Gerada (kWh)"])?;
    for record in records {
        writer.write_record([format_date_br(record.date), format_number_br(record.energy_kwh, 2)])?;
    }
    writer.into_inner().map_err(|e| anyhow!("flushing CSV export: {}", e))
}
