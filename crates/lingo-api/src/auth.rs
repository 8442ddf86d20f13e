use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use jsonwebtoken::{EncodingKey, Header, encode};
use tracing::info;
use uuid::Uuid;

use lingo_db::models::UserRow;
use lingo_types::api::{
    AuthResponse, Claims, DataResponse, LoginRequest, ProfileResponse, RegisterRequest, UpdateProfileRequest,
};
use lingo_types::models::User;

use crate::error::{ApiError, ApiResult};
use crate::extract::{ApiJson, ApiPath};
use crate::records;
use crate::state::{AppState, with_db};

pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    validate_username(&req.username)?;
    validate_email(&req.email)?;
    if req.password.len() < 8 {
        return Err(ApiError::validation("password must be at least 8 characters"));
    }

    let email = req.email.clone();
    if with_db(&state.db, move |db| db.get_user_by_email(&email))
        .await?
        .is_some()
    {
        return Err(ApiError::Conflict("User already exists".into()));
    }

    let password_hash = hash_password(&req.password)?;

    let user_id = Uuid::new_v4();
    let (_, created_at) = records::now();
    let (username, email) = (req.username.clone(), req.email.clone());
    with_db(&state.db, move |db| {
        db.create_user(&user_id.to_string(), &username, &email, &password_hash, &created_at)
    })
    .await
    .map_err(|e| email_taken(e, "User already exists"))?;

    let token = create_token(&state.jwt_secret, user_id, &req.username)
        .map_err(|e| ApiError::Internal(format!("token encoding failed: {}", e)))?;

    info!("Registered {} ({})", req.username, user_id);
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            user_id,
            username: req.username,
            email: req.email,
            token,
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let email = req.email.clone();
    let user = with_db(&state.db, move |db| db.get_user_by_email(&email))
        .await?
        .ok_or(ApiError::Unauthorized)?;

    verify_password(&req.password, &user.password)?;

    let user_id: Uuid = user
        .id
        .parse()
        .map_err(|_| ApiError::Internal(format!("corrupt user id '{}'", user.id)))?;

    let token = create_token(&state.jwt_secret, user_id, &user.username)
        .map_err(|e| ApiError::Internal(format!("token encoding failed: {}", e)))?;

    Ok(Json(AuthResponse {
        user_id,
        username: user.username,
        email: user.email,
        token,
    }))
}

pub async fn get_profile(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let user = with_db(&state.db, move |db| db.get_user_by_id(&user_id.to_string()))
        .await?
        .ok_or(ApiError::NotFound("User"))?;
    Ok(Json(profile(user)))
}

/// Only the account owner may edit a profile. Omitted fields are kept.
pub async fn update_profile(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<Uuid>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<UpdateProfileRequest>,
) -> ApiResult<impl IntoResponse> {
    if claims.sub != user_id {
        return Err(ApiError::Forbidden);
    }
    if let Some(username) = &req.username {
        validate_username(username)?;
    }
    if let Some(email) = &req.email {
        validate_email(email)?;
        let email = email.clone();
        let holder = with_db(&state.db, move |db| db.get_user_by_email(&email)).await?;
        if holder.is_some_and(|row| row.id != user_id.to_string()) {
            return Err(ApiError::Conflict("Email already in use".into()));
        }
    }

    let user = with_db(&state.db, move |db| {
        db.update_profile(
            &user_id.to_string(),
            req.username.as_deref(),
            req.email.as_deref(),
            req.avatar.as_deref(),
        )
    })
    .await
    .map_err(|e| email_taken(e, "Email already in use"))?
    .ok_or(ApiError::NotFound("User"))?;

    Ok(Json(profile(user)))
}

/// Everyone except the given user, for the contact list.
pub async fn list_users(
    State(state): State<AppState>,
    ApiPath(user_id): ApiPath<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let rows = with_db(&state.db, move |db| {
        let id = user_id.to_string();
        match db.get_user_by_id(&id)? {
            Some(_) => db.list_users_except(&id).map(Some),
            None => Ok(None),
        }
    })
    .await?
    .ok_or(ApiError::NotFound("User"))?;

    let users: Vec<User> = rows.into_iter().filter_map(records::user_from_row).collect();
    Ok(Json(DataResponse::new(users)))
}

pub fn create_token(secret: &str, user_id: Uuid, username: &str) -> anyhow::Result<String> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

/// Hash a password with Argon2id and a fresh random salt.
fn hash_password(password: &str) -> ApiResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {}", e)))
}

fn verify_password(password: &str, stored_hash: &str) -> ApiResult<()> {
    let parsed_hash = PasswordHash::new(stored_hash)
        .map_err(|e| ApiError::Internal(format!("stored hash unreadable: {}", e)))?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::Unauthorized)
}

/// The email lookup and the write are separate statements, so a concurrent
/// writer can still take the address in between; the UNIQUE index catches it.
fn email_taken(err: ApiError, message: &str) -> ApiError {
    match err {
        ApiError::Persistence(e) if lingo_db::is_unique_violation(&e) => ApiError::Conflict(message.into()),
        other => other,
    }
}

fn profile(user: UserRow) -> ProfileResponse {
    ProfileResponse {
        username: user.username,
        email: user.email,
        avatar: user.avatar,
    }
}

fn validate_username(username: &str) -> ApiResult<()> {
    let len = username.chars().count();
    if !(3..=32).contains(&len) {
        return Err(ApiError::validation("username must be 3 to 32 characters"));
    }
    Ok(())
}

fn validate_email(email: &str) -> ApiResult<()> {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
        _ => Err(ApiError::validation("invalid email address")),
    }
}
