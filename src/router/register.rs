//! Account registration endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use serde::{Deserialize, Serialize};
use tokio::task;
use validator::Validate;

use crate::AppState;
use crate::avatar::{self, AvatarOptions};
use crate::error::{Result, ServerError};
use crate::router::ValidJson;
use crate::user::UserRepository;

/// Candidate account. Absent fields deserialize to empty strings so the
/// validator reports them instead of the JSON layer.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct Body {
    #[serde(default)]
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[serde(default)]
    #[validate(email(message = "Please include a valid email"))]
    pub email: String,
    #[serde(default)]
    #[validate(length(
        min = 6,
        message = "Please enter a password with 6 or more characters"
    ))]
    pub password: String,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub token: String,
}

/// Handler to register a new account.
///
/// The email lookup only short-circuits the common duplicate before any
/// hashing happens; the unique index on `email` remains the authoritative
/// check at write time.
pub async fn handler(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<Body>,
) -> Result<Json<Response>> {
    let Body {
        name,
        email,
        password,
    } = body;
    let email = if state.config.registration.normalize_email {
        email.trim().to_lowercase()
    } else {
        email
    };

    let users = UserRepository::new(state.db.postgres.clone());
    if users.find_by_email(&email).await?.is_some() {
        return Err(ServerError::Conflict);
    }

    // Argon2 is CPU-bound; keep it off the async workers.
    let crypto = Arc::clone(&state.crypto);
    let password_hash =
        task::spawn_blocking(move || crypto.hash_password(password))
            .await
            .map_err(|err| ServerError::Internal {
                details: err.to_string(),
            })??;

    let user = users
        .insert(
            &name,
            &email,
            &avatar::gravatar_url(&email, &AvatarOptions::default()),
            &password_hash,
        )
        .await?;

    let token = state.token.create(&user.id.to_string())?;

    Ok(Json(Response { token }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DUPLICATE_EMAIL_MESSAGE;
    use crate::token::DEFAULT_EXPIRATION_TIME;
    use crate::{app, make_request, router};
    use axum::http::{Method, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use sqlx::{Pool, Postgres};

    async fn count_users(pool: &Pool<Postgres>) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(pool)
            .await
            .unwrap()
    }

    async fn errors(
        response: axum::http::Response<axum::body::Body>,
    ) -> Vec<Value> {
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: Value = serde_json::from_slice(&body).unwrap();
        body["errors"].as_array().unwrap().clone()
    }

    #[sqlx::test]
    async fn test_register(pool: Pool<Postgres>) {
        let state = router::state(pool.clone());
        let app = app(state.clone());

        let response = make_request(
            app,
            Method::POST,
            "/api/users",
            json!({
                "name": "Ada",
                "email": "ada@example.com",
                "password": "secret1",
            })
            .to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let body: Response = serde_json::from_slice(&body).unwrap();
        assert!(!body.token.is_empty());

        let user = UserRepository::new(pool)
            .find_by_email("ada@example.com")
            .await
            .unwrap()
            .expect("account saved");
        assert_eq!(user.name, "Ada");
        assert_ne!(user.password_hash, "secret1");
        assert!(
            state
                .crypto
                .verify_password("secret1", &user.password_hash)
                .unwrap()
        );
        assert_eq!(
            user.avatar,
            avatar::gravatar_url("ada@example.com", &AvatarOptions::default())
        );

        let claims = state.token.decode(&body.token).unwrap();
        assert_eq!(claims.sub, user.id.to_string());
        assert_eq!(claims.exp - claims.iat, DEFAULT_EXPIRATION_TIME);
    }

    #[sqlx::test]
    async fn test_missing_name(pool: Pool<Postgres>) {
        let app = app(router::state(pool.clone()));

        let response = make_request(
            app,
            Method::POST,
            "/api/users",
            json!({
                "email": "ada@example.com",
                "password": "secret1",
            })
            .to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let errors = errors(response).await;
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0]["msg"], "Name is required");
        assert_eq!(errors[0]["field"], "name");

        // Rejected before any store access.
        assert_eq!(count_users(&pool).await, 0);
    }

    #[sqlx::test]
    async fn test_invalid_email_is_independent(pool: Pool<Postgres>) {
        let app = app(router::state(pool.clone()));

        // Name and password are valid; only the email entry is reported.
        let response = make_request(
            app,
            Method::POST,
            "/api/users",
            json!({
                "name": "Ada",
                "email": "not-an-email",
                "password": "secret1",
            })
            .to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let errors = errors(response).await;
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0]["msg"], "Please include a valid email");
        assert_eq!(errors[0]["field"], "email");
    }

    #[sqlx::test]
    async fn test_short_password(pool: Pool<Postgres>) {
        let app = app(router::state(pool.clone()));

        let response = make_request(
            app,
            Method::POST,
            "/api/users",
            json!({
                "name": "Ada",
                "email": "ada@example.com",
                "password": "short",
            })
            .to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let errors = errors(response).await;
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0]["msg"],
            "Please enter a password with 6 or more characters"
        );
        assert_eq!(count_users(&pool).await, 0);
    }

    #[sqlx::test]
    async fn test_reports_every_failing_field(pool: Pool<Postgres>) {
        let app = app(router::state(pool.clone()));

        let response = make_request(
            app,
            Method::POST,
            "/api/users",
            json!({
                "name": "",
                "email": "nope",
                "password": "abc",
            })
            .to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let errors = errors(response).await;
        let fields: Vec<_> =
            errors.iter().map(|e| e["field"].as_str().unwrap()).collect();
        assert_eq!(fields, ["name", "email", "password"]);
    }

    #[sqlx::test]
    async fn test_malformed_body(pool: Pool<Postgres>) {
        let app = app(router::state(pool.clone()));

        let response =
            make_request(app, Method::POST, "/api/users", "{".to_string())
                .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let errors = errors(response).await;
        assert_eq!(errors.len(), 1);
        assert!(errors[0]["msg"].as_str().is_some_and(|msg| !msg.is_empty()));
    }

    #[sqlx::test]
    async fn test_duplicate_email(pool: Pool<Postgres>) {
        let state = router::state(pool.clone());

        let response = make_request(
            app(state.clone()),
            Method::POST,
            "/api/users",
            json!({
                "name": "Ada",
                "email": "ada@example.com",
                "password": "secret1",
            })
            .to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        // Same email, different everything else: one success, one conflict.
        let response = make_request(
            app(state),
            Method::POST,
            "/api/users",
            json!({
                "name": "Grace",
                "email": "ada@example.com",
                "password": "secret2",
            })
            .to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let errors = errors(response).await;
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0]["msg"], DUPLICATE_EMAIL_MESSAGE);

        assert_eq!(count_users(&pool).await, 1);
    }

    #[sqlx::test]
    async fn test_normalize_email_folds_case(pool: Pool<Postgres>) {
        let mut state = router::state(pool.clone());
        let mut config = (*state.config).clone();
        config.registration.normalize_email = true;
        state.config = std::sync::Arc::new(config);

        let response = make_request(
            app(state.clone()),
            Method::POST,
            "/api/users",
            json!({
                "name": "Ada",
                "email": "Ada@Example.com",
                "password": "secret1",
            })
            .to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let stored = UserRepository::new(pool)
            .find_by_email("ada@example.com")
            .await
            .unwrap();
        assert!(stored.is_some());

        let response = make_request(
            app(state),
            Method::POST,
            "/api/users",
            json!({
                "name": "Ada",
                "email": "ada@example.COM",
                "password": "secret1",
            })
            .to_string(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
