//! User model. This build has no authentication layer; user id 1 is seeded
//! by the schema and acts as the current user for every request.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Id of the seeded default user.
pub const DEFAULT_USER_ID: i64 = 1;
