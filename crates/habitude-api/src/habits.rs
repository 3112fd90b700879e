use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::TypedHeader;
use axum_extra::headers::{Authorization, authorization::Bearer};
use chrono::NaiveTime;
use tracing::warn;
use uuid::Uuid;

use habitude_core::{Operation, is_allowed};
use habitude_db::models::{HabitPatch, HabitRow, HabitWrite};
use habitude_types::api::{
    Claims, CreateHabitRequest, HabitResponse, PageQuery, Paginated, UpdateHabitRequest,
};

use crate::AppState;
use crate::error::ApiError;
use crate::middleware::decode_access_token;

pub const PAGE_SIZE: u32 = 5;

const TIME_FORMAT: &str = "%H:%M:%S";

pub async fn list_habits(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (page, offset) = page_bounds(&query);
    let (count, rows) = state
        .db
        .habits_for_user(&claims.sub.to_string(), PAGE_SIZE, offset)?;

    Ok(Json(Paginated {
        count,
        page,
        page_size: PAGE_SIZE,
        items: rows.into_iter().map(habit_response).collect(),
    }))
}

pub async fn create_habit(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateHabitRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let write = HabitWrite {
        place: req.place,
        time: req.time.format(TIME_FORMAT).to_string(),
        action: req.action,
        is_pleasant: req.is_pleasant,
        linked_habit_id: req.linked_habit.map(|u| u.to_string()),
        periodicity: req.periodicity,
        reward: req.reward,
        execution_time: req.execution_time,
        is_public: req.is_public,
    };

    let id = Uuid::new_v4();
    let row = state
        .db
        .create_habit(&id.to_string(), &claims.sub.to_string(), &write)?;

    Ok((StatusCode::CREATED, Json(habit_response(row))))
}

/// Reads take an optional bearer: the owner sees their own habit, and a
/// public habit is visible to anyone — valid token, bad token, or none.
pub async fn get_habit(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let requester = bearer
        .as_ref()
        .and_then(|TypedHeader(auth)| decode_access_token(&state.jwt_secret, auth.token()))
        .map(|claims| claims.sub);

    let row = state
        .db
        .get_habit(&id.to_string())?
        .ok_or(ApiError::NotFound)?;
    let owner = parse_uuid(&row.user_id, "habit owner");

    // A denied read is indistinguishable from a missing habit
    if !is_allowed(requester, owner, row.is_public, Operation::Read) {
        return Err(ApiError::NotFound);
    }

    Ok(Json(habit_response(row)))
}

pub async fn update_habit(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateHabitRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let claims = require_bearer(&state, &bearer)?;

    let row = state
        .db
        .get_habit(&id.to_string())?
        .ok_or(ApiError::NotFound)?;
    let owner = parse_uuid(&row.user_id, "habit owner");
    check_owner_access(claims.sub, owner, row.is_public, Operation::Write)?;

    let patch = HabitPatch {
        place: req.place,
        time: req.time.map(|t| t.format(TIME_FORMAT).to_string()),
        action: req.action,
        is_pleasant: req.is_pleasant,
        linked_habit_id: req
            .linked_habit
            .map(|link| link.map(|u| u.to_string())),
        periodicity: req.periodicity,
        reward: req.reward,
        execution_time: req.execution_time,
        is_public: req.is_public,
    };

    let updated = state.db.update_habit(&id.to_string(), &patch)?;
    Ok(Json(habit_response(updated)))
}

pub async fn delete_habit(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let claims = require_bearer(&state, &bearer)?;

    let row = state
        .db
        .get_habit(&id.to_string())?
        .ok_or(ApiError::NotFound)?;
    let owner = parse_uuid(&row.user_id, "habit owner");
    check_owner_access(claims.sub, owner, row.is_public, Operation::Delete)?;

    state.db.delete_habit(&id.to_string())?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn public_habits(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (page, offset) = page_bounds(&query);
    let (count, rows) = state.db.public_habits(PAGE_SIZE, offset)?;

    Ok(Json(Paginated {
        count,
        page,
        page_size: PAGE_SIZE,
        items: rows.into_iter().map(habit_response).collect(),
    }))
}

fn require_bearer(
    state: &AppState,
    bearer: &Option<TypedHeader<Authorization<Bearer>>>,
) -> Result<Claims, ApiError> {
    bearer
        .as_ref()
        .and_then(|TypedHeader(auth)| decode_access_token(&state.jwt_secret, auth.token()))
        .ok_or(ApiError::Unauthorized)
}

/// Mutations on an invisible habit read as not-found; on a visible one
/// they read as forbidden.
fn check_owner_access(
    requester: Uuid,
    owner: Uuid,
    is_public: bool,
    op: Operation,
) -> Result<(), ApiError> {
    if is_allowed(Some(requester), owner, is_public, op) {
        Ok(())
    } else if is_allowed(Some(requester), owner, is_public, Operation::Read) {
        Err(ApiError::Forbidden)
    } else {
        Err(ApiError::NotFound)
    }
}

fn page_bounds(query: &PageQuery) -> (u32, u32) {
    let page = query.page.unwrap_or(1).max(1);
    // The page number is caller-controlled; a saturated offset just
    // lands on an empty page.
    (page, (page - 1).saturating_mul(PAGE_SIZE))
}

pub(crate) fn habit_response(row: HabitRow) -> HabitResponse {
    HabitResponse {
        id: parse_uuid(&row.id, "habit id"),
        user_id: parse_uuid(&row.user_id, "habit owner"),
        place: row.place,
        time: NaiveTime::parse_from_str(&row.time, TIME_FORMAT).unwrap_or_else(|e| {
            warn!("Corrupt time '{}' on habit '{}': {}", row.time, row.id, e);
            NaiveTime::MIN
        }),
        action: row.action,
        is_pleasant: row.is_pleasant,
        linked_habit: row
            .linked_habit_id
            .as_deref()
            .map(|s| parse_uuid(s, "linked habit")),
        periodicity: row.periodicity,
        reward: row.reward,
        execution_time: row.execution_time,
        is_public: row.is_public,
        created_at: parse_db_timestamp(&row.created_at, &row.id),
    }
}

pub(crate) fn parse_uuid(value: &str, what: &str) -> Uuid {
    value.parse().unwrap_or_else(|e| {
        warn!("Corrupt {} '{}': {}", what, value, e);
        Uuid::default()
    })
}

pub(crate) fn parse_db_timestamp(value: &str, id: &str) -> chrono::DateTime<chrono::Utc> {
    value
        .parse::<chrono::DateTime<chrono::Utc>>()
        .or_else(|_| {
            // SQLite stores timestamps as "YYYY-MM-DD HH:MM:SS" without
            // timezone. Parse as naive UTC and convert.
            chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
                .map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt created_at '{}' on record '{}': {}", value, id, e);
            chrono::DateTime::default()
        })
}
