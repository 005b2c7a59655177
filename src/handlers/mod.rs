// src/handlers/mod.rs
pub mod error;
pub mod records;
pub mod summary;
pub mod tariff;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use warp::reply::Json;

use crate::services::aggregation::Period;
use crate::services::session::{Notice, Session, DEFAULT_SESSION};
use crate::state::AppState;
use error::ApiError;

/// Every JSON response carries the session's pending notices.
#[derive(Serialize)]
pub struct Envelope<T: Serialize> {
    pub data: T,
    pub notices: Vec<Notice>,
}

#[derive(Serialize)]
pub struct WriteResult {
    pub ok: bool,
    pub notices: Vec<Notice>,
}

pub fn session_key(header: Option<String>) -> String {
    header
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| DEFAULT_SESSION.to_string())
}

/// Drains the session's notices into the reply and stores the session back.
pub fn reply<T: Serialize>(state: &AppState, id: &str, mut session: Session, data: T) -> Json {
    let notices = session.take_notices();
    state.sessions.store(id, session);
    warp::reply::json(&Envelope { data, notices })
}

pub fn write_reply(state: &AppState, id: &str, mut session: Session, ok: bool) -> Json {
    let notices = session.take_notices();
    state.sessions.store(id, session);
    warp::reply::json(&WriteResult { ok, notices })
}

/// `?year=&month=` or `?start=&end=`; nothing means all records.
#[derive(Debug, Default, Deserialize)]
pub struct PeriodQuery {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl PeriodQuery {
    pub fn period(&self) -> Result<Period, ApiError> {
        if let Some(month) = self.month {
            if !(1..=12).contains(&month) {
                return Err(ApiError::bad_request(format!("month must be 1-12, got {}", month)));
            }
        }

        match (self.start, self.end, self.year, self.month) {
            (Some(start), Some(end), None, None) if start <= end => Ok(Period::Range { start, end }),
            (Some(_), Some(_), None, None) => Err(ApiError::bad_request("start must not be after end")),
            (None, None, Some(year), Some(month)) => Ok(Period::Month { year, month }),
            (None, None, Some(year), None) => Ok(Period::Year(year)),
            (None, None, None, None) => Ok(Period::All),
            _ => Err(ApiError::bad_request(
                "use either year (with optional month) or both start and end",
            )),
        }
    }
}
