use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::error;
use uuid::Uuid;

use wastewatch_classify::Classifier;
use wastewatch_db::Database;
use wastewatch_types::api::{Claims, LoginRequest, LoginResponse};

use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub classifier: Classifier,
    pub jwt_secret: String,
}

/// Exchange an identity from the external wallet-login provider for a
/// session token. The provider already authenticated the user; this lazily
/// anchors a user row to the email on first login.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = req.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::Validation("a valid email is required".into()));
    }
    let name = if req.name.trim().is_empty() {
        "Anonymous user".to_string()
    } else {
        req.name.trim().to_string()
    };

    let db = state.clone();
    let lookup_email = email.clone();
    let user = tokio::task::spawn_blocking(move || {
        if let Some(user) = db.db.get_user_by_email(&lookup_email)? {
            return Ok(user);
        }
        db.db
            .create_user(&Uuid::new_v4().to_string(), &lookup_email, &name)?;
        db.db
            .get_user_by_email(&lookup_email)?
            .ok_or(wastewatch_db::StoreError::NotFound("user"))
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        ApiError::Internal
    })??;

    let user_id = crate::parse_uuid(&user.id, "user id");
    let token = create_token(&state.jwt_secret, user_id, &user.email).map_err(|e| {
        error!("token creation failed: {}", e);
        ApiError::Internal
    })?;

    Ok((
        StatusCode::OK,
        Json(LoginResponse {
            user_id,
            email: user.email,
            name: user.name,
            token,
        }),
    ))
}

fn create_token(secret: &str, user_id: Uuid, email: &str) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = Claims {
        sub: user_id,
        email: email.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}
