use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use uuid::Uuid;

use habitude_types::api::{
    Claims, LoginRequest, LoginResponse, RefreshRequest, RefreshResponse, RegisterRequest,
    RegisterResponse, TokenKind,
};

use crate::AppState;
use crate::error::ApiError;

const ACCESS_TTL_MINUTES: i64 = 30;
const REFRESH_TTL_DAYS: i64 = 14;

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    // Minimal credential sanity before touching the store
    if !req.email.contains('@') || req.email.len() > 254 {
        return Err(ApiError::BadRequest("invalid email"));
    }
    if req.password.len() < 8 {
        return Err(ApiError::BadRequest("password must be at least 8 characters"));
    }

    if state.db.get_user_by_email(&req.email)?.is_some() {
        return Err(ApiError::Conflict("email already registered"));
    }

    let password_hash = hash_password(&req.password)?;
    let user_id = Uuid::new_v4();

    state.db.create_user(
        &user_id.to_string(),
        &req.email,
        &password_hash,
        req.telegram_chat_id.as_deref(),
        req.city.as_deref(),
        req.phone.as_deref(),
    )?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user_id,
            email: req.email,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .db
        .get_user_by_email(&req.email)?
        .ok_or(ApiError::Unauthorized)?;

    // Deactivated accounts fail exactly like bad credentials
    if !user.is_active {
        return Err(ApiError::Unauthorized);
    }

    let parsed_hash = PasswordHash::new(&user.password).map_err(|_| ApiError::Internal)?;
    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::Unauthorized)?;

    let user_id: Uuid = user.id.parse().map_err(|_| ApiError::Internal)?;

    state.db.touch_last_login(&user.id)?;

    let access_token = create_token(&state.jwt_secret, user_id, &user.email, TokenKind::Access)?;
    let refresh_token = create_token(&state.jwt_secret, user_id, &user.email, TokenKind::Refresh)?;

    Ok(Json(LoginResponse {
        user_id,
        access_token,
        refresh_token,
    }))
}

pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let claims = decode_refresh_token(&state.jwt_secret, &req.refresh_token)
        .ok_or(ApiError::Unauthorized)?;

    // The account must still exist and be active at refresh time
    let user = state
        .db
        .get_user_by_id(&claims.sub.to_string())?
        .filter(|u| u.is_active)
        .ok_or(ApiError::Unauthorized)?;

    let access_token = create_token(&state.jwt_secret, claims.sub, &user.email, TokenKind::Access)?;

    Ok(Json(RefreshResponse { access_token }))
}

pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|_| ApiError::Internal)
}

fn decode_refresh_token(secret: &str, token: &str) -> Option<Claims> {
    let data = jsonwebtoken::decode::<Claims>(
        token,
        &jsonwebtoken::DecodingKey::from_secret(secret.as_bytes()),
        &jsonwebtoken::Validation::default(),
    )
    .ok()?;

    (data.claims.kind == TokenKind::Refresh).then_some(data.claims)
}

pub fn create_token(
    secret: &str,
    user_id: Uuid,
    email: &str,
    kind: TokenKind,
) -> Result<String, ApiError> {
    let ttl = match kind {
        TokenKind::Access => chrono::Duration::minutes(ACCESS_TTL_MINUTES),
        TokenKind::Refresh => chrono::Duration::days(REFRESH_TTL_DAYS),
    };

    let claims = Claims {
        sub: user_id,
        email: email.to_string(),
        kind,
        exp: (chrono::Utc::now() + ttl).timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|_| ApiError::Internal)
}
