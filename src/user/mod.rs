mod repository;

pub use repository::*;

use serde::{Deserialize, Serialize};

/// Account as saved on database.
#[derive(
    Clone, Debug, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow,
)]
pub struct User {
    /// Store-assigned identifier.
    pub id: i64,
    pub name: String,
    pub email: String,
    /// Gravatar URL derived from the email.
    pub avatar: String,
    #[serde(skip)]
    pub password_hash: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
