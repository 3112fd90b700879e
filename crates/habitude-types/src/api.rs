use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// -- JWT Claims --

/// Access and refresh tokens share one claims shape; `kind` tells them
/// apart so a refresh token can never pass the access middleware.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub kind: TokenKind,
    pub exp: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub telegram_chat_id: Option<String>,
    pub city: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub access_token: String,
}

// -- Users --

#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub telegram_chat_id: Option<String>,
    pub city: Option<String>,
    pub phone: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub city: Option<String>,
    pub phone: Option<String>,
}

// -- Habits --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateHabitRequest {
    pub place: String,
    pub time: NaiveTime,
    pub action: String,
    #[serde(default)]
    pub is_pleasant: bool,
    pub linked_habit: Option<Uuid>,
    pub periodicity: u32,
    pub reward: Option<String>,
    pub execution_time: u32,
    #[serde(default)]
    pub is_public: bool,
}

/// Partial update: absent fields keep their stored value. For the two
/// nullable fields, a JSON `null` clears the value while absence keeps
/// it, hence the double `Option`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateHabitRequest {
    pub place: Option<String>,
    pub time: Option<NaiveTime>,
    pub action: Option<String>,
    pub is_pleasant: Option<bool>,
    #[serde(default, with = "double_option")]
    pub linked_habit: Option<Option<Uuid>>,
    pub periodicity: Option<u32>,
    #[serde(default, with = "double_option")]
    pub reward: Option<Option<String>>,
    pub execution_time: Option<u32>,
    pub is_public: Option<bool>,
}

mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
    where
        T: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        Option::<T>::deserialize(de).map(Some)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HabitResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub place: String,
    pub time: NaiveTime,
    pub action: String,
    pub is_pleasant: bool,
    pub linked_habit: Option<Uuid>,
    pub periodicity: u32,
    pub reward: Option<String>,
    pub execution_time: u32,
    pub is_public: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

// -- Pagination --

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub count: u64,
    pub page: u32,
    pub page_size: u32,
    pub items: Vec<T>,
}
