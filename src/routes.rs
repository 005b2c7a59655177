// src/routes.rs
use std::sync::Arc;
use warp::reject::Rejection;
use crate::handlers::records::{create_record, delete_record, export_csv, list_records, refresh, update_record};
use crate::handlers::summary::{get_annual, get_cumulative, get_heatmap, get_monthly, get_overview, get_summary};
use crate::handlers::tariff::{compute_tariff, get_tariff, get_tariff_config, put_tariff_config, toggle_edit_mode};
use crate::handlers::PeriodQuery;
use crate::state::AppState;
use log::{info, warn};

use std::convert::Infallible;
use warp::http::StatusCode;
use warp::{Filter, Reply};
use crate::handlers::error::ApiError;

pub const SESSION_HEADER: &str = "x-session-id";

// Turns rejections into JSON error bodies
pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let code;
    let message: String;

    if err.is_not_found() {
        code = StatusCode::NOT_FOUND;
        message = "Not Found".to_string();
    } else if let Some(api_error) = err.find::<ApiError>() {
        code = api_error.status;
        message = api_error.message.clone();
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        code = StatusCode::BAD_REQUEST;
        message = e.to_string();
    } else if let Some(e) = err.find::<warp::reject::InvalidQuery>() {
        code = StatusCode::BAD_REQUEST;
        message = e.to_string();
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        code = StatusCode::METHOD_NOT_ALLOWED;
        message = "Method Not Allowed".to_string();
    } else {
        warn!("Unhandled rejection: {:?}", err);
        code = StatusCode::INTERNAL_SERVER_ERROR;
        message = "Internal Server Error".to_string();
    }

    Ok(warp::reply::with_status(
        warp::reply::json(&serde_json::json!({
            "error": message,
        })),
        code,
    ))
}

pub fn routes(state: Arc<AppState>) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
    info!("Configuring routes...");

    let state_filter = warp::any().map(move || state.clone());
    let session = warp::header::optional::<String>(SESSION_HEADER);
    let period = warp::query::<PeriodQuery>();

    let list_route = warp::path!("api" / "v1" / "records")
        .and(warp::get())
        .and(session.clone())
        .and(period.clone())
        .and(state_filter.clone())
        .and_then(list_records);

    let create_route = warp::path!("api" / "v1" / "records")
        .and(warp::post())
        .and(session.clone())
        .and(warp::body::json())
        .and(state_filter.clone())
        .and_then(create_record);

    let update_route = warp::path!("api" / "v1" / "records" / usize)
        .and(warp::put())
        .and(session.clone())
        .and(warp::body::json())
        .and(state_filter.clone())
        .and_then(update_record);

    let delete_route = warp::path!("api" / "v1" / "records" / usize)
        .and(warp::delete())
        .and(session.clone())
        .and(state_filter.clone())
        .and_then(delete_record);

    let export_route = warp::path!("api" / "v1" / "records" / "export.csv")
        .and(warp::get())
        .and(session.clone())
        .and(period.clone())
        .and(state_filter.clone())
        .and_then(export_csv);

    let summary_route = warp::path!("api" / "v1" / "summary")
        .and(warp::get())
        .and(session.clone())
        .and(period.clone())
        .and(state_filter.clone())
        .and_then(get_summary);

    let cumulative_route = warp::path!("api" / "v1" / "cumulative")
        .and(warp::get())
        .and(session.clone())
        .and(period.clone())
        .and(state_filter.clone())
        .and_then(get_cumulative);

    let monthly_route = warp::path!("api" / "v1" / "monthly" / i32)
        .and(warp::get())
        .and(session.clone())
        .and(state_filter.clone())
        .and_then(get_monthly);

    let annual_route = warp::path!("api" / "v1" / "annual" / i32 / u32)
        .and(warp::get())
        .and(session.clone())
        .and(state_filter.clone())
        .and_then(get_annual);

    let heatmap_route = warp::path!("api" / "v1" / "heatmap" / i32)
        .and(warp::get())
        .and(session.clone())
        .and(state_filter.clone())
        .and_then(get_heatmap);

    let overview_route = warp::path!("api" / "v1" / "overview")
        .and(warp::get())
        .and(session.clone())
        .and(state_filter.clone())
        .and_then(get_overview);

    let tariff_route = warp::path!("api" / "v1" / "tariff" / i32)
        .and(warp::get())
        .and(session.clone())
        .and(state_filter.clone())
        .and_then(get_tariff);

    let compute_route = warp::path!("api" / "v1" / "tariff" / "compute")
        .and(warp::post())
        .and(session.clone())
        .and(warp::body::json())
        .and(state_filter.clone())
        .and_then(compute_tariff);

    let get_config_route = warp::path!("api" / "v1" / "session" / "tariff")
        .and(warp::get())
        .and(session.clone())
        .and(state_filter.clone())
        .and_then(get_tariff_config);

    let put_config_route = warp::path!("api" / "v1" / "session" / "tariff")
        .and(warp::put())
        .and(session.clone())
        .and(warp::body::json())
        .and(state_filter.clone())
        .and_then(put_tariff_config);

    let edit_mode_route = warp::path!("api" / "v1" / "session" / "edit_mode")
        .and(warp::post())
        .and(session.clone())
        .and(state_filter.clone())
        .and_then(toggle_edit_mode);

    let refresh_route = warp::path!("api" / "v1" / "refresh")
        .and(warp::post())
        .and(session.clone())
        .and(state_filter.clone())
        .and_then(refresh);

    info!("All routes configured successfully.");

    let records = list_route
        .or(create_route)
        .or(export_route)
        .or(update_route)
        .or(delete_route)
        .or(refresh_route);

    let charts = summary_route
        .or(cumulative_route)
        .or(monthly_route)
        .or(annual_route)
        .or(heatmap_route)
        .or(overview_route);

    let tariff = compute_route
        .or(tariff_route)
        .or(get_config_route)
        .or(put_config_route)
        .or(edit_mode_route);

    records.or(charts).or(tariff).recover(handle_rejection)
}
