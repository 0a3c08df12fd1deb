use super::cookie::CookieOptions;
use super::error::ApiError;
use super::guard::CurrentUser;
use super::multipart::{self, MultipartForm};
use super::response::ApiResponse;
use crate::application_port::*;
use crate::domain_model::{PublicUser, UploadField};
use crate::logger::*;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::hyper::body::Bytes;
use warp::multipart::FormData;
use warp::reject;

fn rejected(e: AuthError) -> warp::Rejection {
    reject::custom(ApiError::from(e))
}

pub async fn register(
    form: FormData,
    auth_service: Arc<dyn AuthService>,
) -> Result<warp::reply::Response, warp::Rejection> {
    let form: MultipartForm = multipart::read_form(form).await.map_err(reject::custom)?;

    let register_input = RegisterInput {
        full_name: form.field("fullName"),
        email: form.field("email"),
        username: form.field("username"),
        password: form.field("password"),
        uploads: form.uploads,
    };
    let user = auth_service
        .register(register_input)
        .await
        .map_err(rejected)?;

    Ok(ApiResponse::new(StatusCode::CREATED, user, "User registered successfully").into_response())
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user: PublicUser,
    pub access_token: AccessToken,
    pub refresh_token: RefreshToken,
}

pub async fn login(
    body: LoginRequest,
    auth_service: Arc<dyn AuthService>,
    cookie_options: Arc<CookieOptions>,
) -> Result<warp::reply::Response, warp::Rejection> {
    let login_input = LoginInput {
        username: body.username,
        email: body.email,
        password: body.password,
    };
    let LoginResult { user, tokens } = auth_service
        .login(login_input)
        .await
        .map_err(rejected)?;

    let now = Utc::now();
    let login_response = LoginResponse {
        user,
        access_token: tokens.access_token.clone(),
        refresh_token: tokens.refresh_token.clone(),
    };
    let mut res = ApiResponse::ok(login_response, "User logged in successfully").into_response();
    cookie_options
        .set_token_cookies(&mut res, &tokens, now)
        .map_err(reject::custom)?;
    Ok(res)
}

pub async fn logout(
    current: CurrentUser,
    auth_service: Arc<dyn AuthService>,
    cookie_options: Arc<CookieOptions>,
) -> Result<warp::reply::Response, warp::Rejection> {
    auth_service.logout(current.id).await.map_err(rejected)?;

    let mut res = ApiResponse::ok(json!({}), "User logged out").into_response();
    cookie_options
        .clear_token_cookies(&mut res)
        .map_err(reject::custom)?;
    Ok(res)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

/// The body is optional here, so it arrives as raw bytes rather than
/// through the JSON filter. The cookie wins over the body.
pub async fn refresh_token(
    cookie: Option<String>,
    body: Bytes,
    auth_service: Arc<dyn AuthService>,
    cookie_options: Arc<CookieOptions>,
) -> Result<warp::reply::Response, warp::Rejection> {
    let from_body = if body.iter().all(u8::is_ascii_whitespace) {
        None
    } else {
        serde_json::from_slice::<RefreshRequest>(&body)
            .map_err(|e| {
                reject::custom(
                    ApiError::bad_request("Invalid request body").with_errors(vec![e.to_string()]),
                )
            })?
            .refresh_token
    };

    let presented = cookie
        .filter(|c| !c.trim().is_empty())
        .or(from_body)
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| reject::custom(ApiError::unauthorized("Unauthorized request")))?;

    let tokens = auth_service
        .refresh(&presented)
        .await
        .map_err(|e| reject::custom(ApiError::refresh_rejected(e)))?;

    let now = Utc::now();
    let mut res = ApiResponse::ok(&tokens, "Access token refreshed").into_response();
    cookie_options
        .set_token_cookies(&mut res, &tokens, now)
        .map_err(reject::custom)?;
    Ok(res)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub old_password: String,
    #[serde(default)]
    pub new_password: String,
}

pub async fn change_password(
    current: CurrentUser,
    body: ChangePasswordRequest,
    auth_service: Arc<dyn AuthService>,
) -> Result<warp::reply::Response, warp::Rejection> {
    auth_service
        .change_password(current.id, &body.old_password, &body.new_password)
        .await
        .map_err(rejected)?;

    Ok(ApiResponse::ok(json!({}), "Password changed successfully").into_response())
}

pub async fn current_user(current: CurrentUser) -> Result<warp::reply::Response, warp::Rejection> {
    Ok(ApiResponse::ok(current.user, "Current user fetched successfully").into_response())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAccountRequest {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
}

pub async fn update_account(
    current: CurrentUser,
    body: UpdateAccountRequest,
    user_service: Arc<dyn UserService>,
) -> Result<warp::reply::Response, warp::Rejection> {
    let update_input = UpdateAccountInput {
        full_name: body.full_name,
        email: body.email,
    };
    let user = user_service
        .update_account(current.id, update_input)
        .await
        .map_err(rejected)?;

    Ok(ApiResponse::ok(user, "Account details updated successfully").into_response())
}

pub async fn update_avatar(
    current: CurrentUser,
    form: FormData,
    user_service: Arc<dyn UserService>,
) -> Result<warp::reply::Response, warp::Rejection> {
    let mut form = multipart::read_form(form).await.map_err(reject::custom)?;
    let file = form
        .uploads
        .take(UploadField::Avatar)
        .ok_or_else(|| reject::custom(ApiError::bad_request("Avatar file is missing")))?;

    let user = user_service
        .update_avatar(current.id, file)
        .await
        .map_err(rejected)?;

    debug!(user_id = %current.id, "avatar replaced");
    Ok(ApiResponse::ok(user, "Avatar image updated successfully").into_response())
}

pub async fn update_cover_image(
    current: CurrentUser,
    form: FormData,
    user_service: Arc<dyn UserService>,
) -> Result<warp::reply::Response, warp::Rejection> {
    let mut form = multipart::read_form(form).await.map_err(reject::custom)?;
    let file = form
        .uploads
        .take(UploadField::CoverImage)
        .ok_or_else(|| reject::custom(ApiError::bad_request("Cover image file is missing")))?;

    let user = user_service
        .update_cover_image(current.id, file)
        .await
        .map_err(rejected)?;

    debug!(user_id = %current.id, "cover image replaced");
    Ok(ApiResponse::ok(user, "Cover image updated successfully").into_response())
}
