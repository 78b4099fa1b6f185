use std::time::Duration;

use axum::{
    Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use cookie::{Cookie, SameSite};

use crate::{
    AppState,
    auth::{AuthUser, Role, hash_password, verify_password},
    config::{AppConfig, Env},
    error::{ApiError, StoreError},
    models::{
        ChangePasswordRequest, CreateUserRequest, CreatedUserResponse, LoginRequest,
        LoginResponse, MessageResponse, NewUser, ProfileResponse, RegisterRequest,
        RegisterResponse, UpdateUserRequest, UpdatedUserResponse, UserListResponse, UserProfile,
        UserUpdate,
    },
};

const MIN_PASSWORD_LEN: usize = 6;

fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters long"
        )));
    }
    Ok(())
}

fn parse_role(raw: &str) -> Result<Role, ApiError> {
    raw.parse::<Role>().map_err(|_| {
        ApiError::Validation("Invalid role. Must be one of: ADMIN, SUPPORT, CLIENT".to_string())
    })
}

/// `local@domain.tld` with no whitespace.
fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split_once('.')
                    .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
        }
        None => false,
    }
}

fn hash(password: &str) -> Result<String, ApiError> {
    hash_password(password).map_err(|e| ApiError::Internal(e.to_string()))
}

/// Builds the auth cookie. Hardened (`Secure`, `SameSite=Strict`) in production; `Lax`
/// locally so cross-port frontends keep working.
fn auth_cookie(
    config: &AppConfig,
    value: String,
    max_age: Duration,
) -> Result<Cookie<'static>, ApiError> {
    let max_age = cookie::time::Duration::try_from(max_age)
        .map_err(|e| ApiError::Internal(format!("cookie max-age out of range: {e}")))?;
    let production = config.env == Env::Production;

    Ok(Cookie::build((config.cookie_name.clone(), value))
        .http_only(true)
        .secure(production)
        .same_site(if production {
            SameSite::Strict
        } else {
            SameSite::Lax
        })
        .path("/")
        .max_age(max_age)
        .build())
}

// --- Handlers ---

/// login
///
/// [Public Route] Exchanges email and password for an identity token. The token is returned in
/// the body and also set as an HttpOnly cookie, so both API clients and browsers can use it.
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 400, description = "Missing email or password"),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if payload.email.is_empty() || payload.password.is_empty() {
        return Err(ApiError::Validation(
            "Email and password are required".to_string(),
        ));
    }

    // Unknown email and wrong password are indistinguishable to the caller.
    let user = state
        .repo
        .get_user_by_email(&payload.email)
        .await?
        .filter(|user| verify_password(&payload.password, &user.password_hash))
        .ok_or(ApiError::InvalidCredentials)?;

    let identity = AuthUser {
        id: user.id.clone(),
        email: user.email.clone(),
        role: user.role,
    };
    let token = state
        .codec
        .encode(&identity, state.config.token_ttl)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    tracing::info!(user_id = %user.id, role = %user.role, "user logged in");

    let cookie = auth_cookie(&state.config, token.clone(), state.config.token_ttl)?;
    let body = LoginResponse {
        message: "Login successful".to_string(),
        token,
        user: UserProfile::from(user),
    };

    Ok(([(header::SET_COOKIE, cookie.to_string())], Json(body)))
}

/// logout
///
/// [Public Route] Expires the auth cookie. Tokens held by API clients stay valid until their
/// own expiry.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses((status = 200, description = "Logged out", body = MessageResponse))
)]
pub async fn logout(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let cookie = auth_cookie(&state.config, String::new(), Duration::ZERO)?;
    let body = MessageResponse {
        success: true,
        message: "Logout successful".to_string(),
    };
    Ok(([(header::SET_COOKIE, cookie.to_string())], Json(body)))
}

/// register
///
/// [Public Route] Creates a CLIENT account. Staff accounts are created by an admin through
/// [`create_user`].
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registered", body = RegisterResponse),
        (status = 400, description = "Missing or invalid fields"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if payload.email.is_empty() || payload.password.is_empty() || payload.name.is_empty() {
        return Err(ApiError::Validation(
            "Email, password, and name are required".to_string(),
        ));
    }
    validate_password(&payload.password)?;

    // The store's insert is the single authority on duplicate emails (409).
    let user = state
        .repo
        .create_user(NewUser {
            email: payload.email,
            name: payload.name,
            role: Role::Client,
            password_hash: hash(&payload.password)?,
        })
        .await?;

    tracing::info!(user_id = %user.id, "user registered");

    let body = RegisterResponse {
        message: "User registered successfully".to_string(),
        user: UserProfile::from(user),
    };
    Ok((StatusCode::CREATED, Json(body)))
}

/// get_me
///
/// [Authenticated Route] Profile of the identity the gateway attached to the request.
#[utoipa::path(
    get,
    path = "/api/private/me",
    responses(
        (status = 200, description = "Current user", body = ProfileResponse),
        (status = 401, description = "No or invalid token"),
        (status = 404, description = "User no longer exists")
    )
)]
pub async fn get_me(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let record = state
        .repo
        .get_user(&user.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(ProfileResponse {
        success: true,
        data: UserProfile::from(record),
    }))
}

/// list_users
///
/// [Admin Route] Every account, newest first. The ADMIN gate is the access policy's
/// `/api/private/admin` rule.
#[utoipa::path(
    get,
    path = "/api/private/admin/users",
    responses(
        (status = 200, description = "All users", body = UserListResponse),
        (status = 403, description = "Caller is not an admin")
    )
)]
pub async fn list_users(
    _user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<UserListResponse>, ApiError> {
    let users = state
        .repo
        .list_users()
        .await?
        .into_iter()
        .map(UserProfile::from)
        .collect();

    Ok(Json(UserListResponse {
        success: true,
        users,
    }))
}

/// change_password
///
/// [Authenticated Route] Sets a new password for the caller. Existing tokens stay valid.
#[utoipa::path(
    put,
    path = "/api/private/me",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password updated", body = MessageResponse),
        (status = 400, description = "Missing or too short password"),
        (status = 401, description = "No or invalid token"),
        (status = 404, description = "User no longer exists")
    )
)]
pub async fn change_password(
    user: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if payload.new_password.is_empty() {
        return Err(ApiError::Validation("New password is required".to_string()));
    }
    validate_password(&payload.new_password)?;

    let update = UserUpdate {
        password_hash: Some(hash(&payload.new_password)?),
        ..UserUpdate::default()
    };
    state
        .repo
        .update_user(&user.id, update)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    tracing::info!(user_id = %user.id, "password changed");

    Ok(Json(MessageResponse {
        success: true,
        message: "Password updated successfully".to_string(),
    }))
}

/// create_user
///
/// [Admin Route] Creates an account with an explicit role (CLIENT when omitted).
#[utoipa::path(
    post,
    path = "/api/private/admin/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = CreatedUserResponse),
        (status = 400, description = "Missing fields, short password or unknown role"),
        (status = 403, description = "Caller is not an admin"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn create_user(
    admin: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if payload.email.is_empty() || payload.password.is_empty() || payload.name.is_empty() {
        return Err(ApiError::Validation(
            "Email, password, and name are required".to_string(),
        ));
    }
    validate_password(&payload.password)?;
    let role = match payload.role.as_deref() {
        None | Some("") => Role::Client,
        Some(raw) => parse_role(raw)?,
    };

    let user = state
        .repo
        .create_user(NewUser {
            email: payload.email,
            name: payload.name,
            role,
            password_hash: hash(&payload.password)?,
        })
        .await?;

    tracing::info!(admin_id = %admin.id, user_id = %user.id, role = %user.role, "user created");

    let body = CreatedUserResponse {
        success: true,
        message: "User created successfully".to_string(),
        data: UserProfile::from(user),
    };
    Ok((StatusCode::CREATED, Json(body)))
}

/// update_user
///
/// [Admin Route] Patches email, name, password, or role of an account. Absent or empty fields
/// are left as they are. A role change applies to tokens issued after it.
#[utoipa::path(
    patch,
    path = "/api/private/admin/users/{user_id}",
    params(("user_id" = String, Path, description = "Account identifier")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = UpdatedUserResponse),
        (status = 400, description = "Invalid email, short password or unknown role"),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, description = "No such user"),
        (status = 409, description = "Email held by another user")
    )
)]
pub async fn update_user(
    admin: AuthUser,
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<UpdatedUserResponse>, ApiError> {
    let present = |field: Option<String>| field.filter(|value| !value.is_empty());
    let email = present(payload.email);
    let name = present(payload.name);
    let password = present(payload.password);

    if let Some(email) = &email {
        if !is_valid_email(email) {
            return Err(ApiError::Validation("Invalid email format".to_string()));
        }
    }
    if let Some(password) = &password {
        validate_password(password)?;
    }
    let role = present(payload.role).as_deref().map(parse_role).transpose()?;

    let update = UserUpdate {
        email,
        name,
        role,
        password_hash: password.as_deref().map(hash).transpose()?,
    };
    let user = state
        .repo
        .update_user(&user_id, update)
        .await
        .map_err(|e| match e {
            StoreError::EmailTaken => {
                ApiError::Conflict("Email is already in use by another user".to_string())
            }
            other => other.into(),
        })?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    tracing::info!(admin_id = %admin.id, user_id = %user.id, "user updated");

    Ok(Json(UpdatedUserResponse {
        success: true,
        message: "User updated successfully".to_string(),
        user: UserProfile::from(user),
    }))
}
