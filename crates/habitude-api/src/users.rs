use axum::{Extension, Json, extract::State, response::IntoResponse};

use habitude_db::models::{UserPatch, UserRow};
use habitude_types::api::{Claims, UpdateUserRequest, UserResponse};

use crate::AppState;
use crate::auth::hash_password;
use crate::error::ApiError;
use crate::habits::{parse_db_timestamp, parse_uuid};

pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .db
        .get_user_by_id(&claims.sub.to_string())?
        .ok_or(ApiError::NotFound)?;

    Ok(Json(user_response(user)))
}

pub async fn update_me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<UpdateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if let Some(email) = &req.email {
        if !email.contains('@') || email.len() > 254 {
            return Err(ApiError::BadRequest("invalid email"));
        }
        if let Some(other) = state.db.get_user_by_email(email)? {
            if other.id != claims.sub.to_string() {
                return Err(ApiError::Conflict("email already registered"));
            }
        }
    }
    if let Some(password) = &req.password {
        if password.len() < 8 {
            return Err(ApiError::BadRequest("password must be at least 8 characters"));
        }
    }

    let password = req.password.as_deref().map(hash_password).transpose()?;

    let patch = UserPatch {
        email: req.email,
        password,
        telegram_chat_id: req.telegram_chat_id,
        city: req.city,
        phone: req.phone,
    };

    let user = state.db.update_user(&claims.sub.to_string(), &patch)?;
    Ok(Json(user_response(user)))
}

fn user_response(user: UserRow) -> UserResponse {
    UserResponse {
        id: parse_uuid(&user.id, "user id"),
        email: user.email,
        telegram_chat_id: user.telegram_chat_id,
        city: user.city,
        phone: user.phone,
        created_at: parse_db_timestamp(&user.created_at, &user.id),
    }
}
