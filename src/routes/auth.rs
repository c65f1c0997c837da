use crate::{
    auth::{hash_password, verify_password, AuthResponse, AuthenticatedUser, LoginRequest, RegisterRequest},
    error::{AppError, AppResult},
    models::RefreshTokenRequest,
    notifications::Notification,
    repository::users,
    response::ApiResponse,
    state::AppState,
};
use actix_web::{post, web, HttpResponse};
use log::{info, warn};
use validator::Validate;

/// Register a new user
///
/// Creates the account, returns it with a fresh token pair and queues a
/// welcome email.
#[post("/register")]
pub async fn register(
    state: web::Data<AppState>,
    register_data: web::Json<RegisterRequest>,
) -> AppResult<HttpResponse> {
    let register_data = register_data.into_inner();
    register_data.validate()?;

    if users::exists_by_email(&state.pool, &register_data.email).await? {
        return Err(AppError::Conflict("Email already registered".into()));
    }

    let password_hash = hash_password(&register_data.password, state.bcrypt_cost)?;

    // A concurrent registration that wins the race surfaces here as a unique violation.
    let user = users::create(
        &state.pool,
        &register_data.email,
        &password_hash,
        &register_data.name,
    )
    .await?;

    let tokens = state.tokens.issue_pair(&user).await?;

    let _ = state.notifications.enqueue(Notification::WelcomeEmail {
        email: user.email.clone(),
        name: user.name.clone(),
    });

    info!("Registered user {}", user.id);
    Ok(HttpResponse::Created().json(ApiResponse::success(
        "User registered successfully",
        AuthResponse { user, tokens },
    )))
}

/// Login user
///
/// Unknown email and wrong password are answered identically.
#[post("/login")]
pub async fn login(
    state: web::Data<AppState>,
    login_data: web::Json<LoginRequest>,
) -> AppResult<HttpResponse> {
    login_data.validate()?;

    let invalid = || AppError::Unauthenticated("Invalid email or password".into());

    let user = users::find_by_email(&state.pool, &login_data.email)
        .await?
        .ok_or_else(invalid)?;

    if !verify_password(&login_data.password, &user.password_hash)? {
        return Err(invalid());
    }

    let tokens = state.tokens.issue_pair(&user).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::success(
        "Login successful",
        AuthResponse { user, tokens },
    )))
}

/// Exchange a refresh token for a new token pair.
#[post("/refresh")]
pub async fn refresh(
    state: web::Data<AppState>,
    body: web::Json<RefreshTokenRequest>,
) -> AppResult<HttpResponse> {
    body.validate()?;

    let pair = state.tokens.rotate(&body.refresh_token).await.map_err(|e| {
        warn!("Refresh rejected: {}", e);
        AppError::from(e)
    })?;

    Ok(HttpResponse::Ok().json(ApiResponse::success("Token refreshed", pair)))
}

/// Revoke every refresh token of the caller. Access tokens stay valid until they expire.
pub async fn logout(state: web::Data<AppState>, user: AuthenticatedUser) -> AppResult<HttpResponse> {
    let revoked = state.tokens.revoke_all_for_user(user.id).await?;
    info!("User {} logged out, {} refresh tokens revoked", user.id, revoked);
    Ok(HttpResponse::Ok().json(ApiResponse::message("Logged out successfully")))
}

pub async fn profile(state: web::Data<AppState>, user: AuthenticatedUser) -> AppResult<HttpResponse> {
    let account = users::find_by_id(&state.pool, user.id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    Ok(HttpResponse::Ok().json(ApiResponse::success("Profile retrieved", account)))
}
