use super::cookie::REFRESH_TOKEN_COOKIE;
use super::error::ApiError;
use super::guard::with_session;
use super::handler;
use crate::server::*;
use std::convert::Infallible;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::{Filter, reject};

pub const JSON_BODY_LIMIT: u64 = 16 * 1024;

/// Protected routes put `with_session` straight after the method, so nothing
/// about the body is looked at before the caller is known.
pub fn routes(
    server: Arc<Server>,
) -> impl Filter<Extract = (warp::reply::Response,), Error = warp::Rejection> + Clone {
    let register = warp::path!("users" / "register")
        .and(warp::post())
        .and(warp::multipart::form().max_length(server.upload_limit_bytes))
        .and(with(server.auth_service.clone()))
        .and_then(handler::register);

    let login = warp::path!("users" / "login")
        .and(warp::post())
        .and(json_body())
        .and(with(server.auth_service.clone()))
        .and(with(server.cookie_options.clone()))
        .and_then(handler::login);

    let logout = warp::path!("users" / "logout")
        .and(warp::post())
        .and(with_session(server.auth_service.clone()))
        .and(with(server.auth_service.clone()))
        .and(with(server.cookie_options.clone()))
        .and_then(handler::logout);

    let refresh_token = warp::path!("users" / "refresh-token")
        .and(warp::post())
        .and(warp::cookie::optional::<String>(REFRESH_TOKEN_COOKIE))
        .and(optional_body(JSON_BODY_LIMIT))
        .and(with(server.auth_service.clone()))
        .and(with(server.cookie_options.clone()))
        .and_then(handler::refresh_token);

    let change_password = warp::path!("users" / "change-password")
        .and(warp::post())
        .and(with_session(server.auth_service.clone()))
        .and(json_body())
        .and(with(server.auth_service.clone()))
        .and_then(handler::change_password);

    let current_user = warp::path!("users" / "current-user")
        .and(warp::post())
        .and(with_session(server.auth_service.clone()))
        .and_then(handler::current_user);

    let update_account = warp::path!("users" / "update-account")
        .and(warp::patch())
        .and(with_session(server.auth_service.clone()))
        .and(json_body())
        .and(with(server.user_service.clone()))
        .and_then(handler::update_account);

    let update_avatar = warp::path!("users" / "avatar")
        .and(warp::patch())
        .and(with_session(server.auth_service.clone()))
        .and(warp::multipart::form().max_length(server.upload_limit_bytes))
        .and(with(server.user_service.clone()))
        .and_then(handler::update_avatar);

    let update_cover_image = warp::path!("users" / "cover-image")
        .and(warp::patch())
        .and(with_session(server.auth_service.clone()))
        .and(warp::multipart::form().max_length(server.upload_limit_bytes))
        .and(with(server.user_service.clone()))
        .and_then(handler::update_cover_image);

    register
        .or(login)
        .unify()
        .or(logout)
        .unify()
        .or(refresh_token)
        .unify()
        .or(change_password)
        .unify()
        .or(current_user)
        .unify()
        .or(update_account)
        .unify()
        .or(update_avatar)
        .unify()
        .or(update_cover_image)
        .unify()
}

fn with<ServiceType>(
    service: Arc<ServiceType>,
) -> impl Filter<Extract = (Arc<ServiceType>,), Error = Infallible> + Clone
where
    ServiceType: Send + Sync + ?Sized,
{
    warp::any().map(move || service.clone())
}

fn json_body<T>() -> impl Filter<Extract = (T,), Error = warp::Rejection> + Clone
where
    T: serde::de::DeserializeOwned + Send,
{
    warp::body::content_length_limit(JSON_BODY_LIMIT).and(warp::body::json())
}

/// Like `content_length_limit`, but a missing `Content-Length` is allowed so
/// that an empty POST still reaches the handler.
fn optional_body(
    limit: u64,
) -> impl Filter<Extract = (warp::hyper::body::Bytes,), Error = warp::Rejection> + Clone {
    warp::header::optional::<u64>("content-length")
        .and_then(move |length: Option<u64>| async move {
            match length {
                Some(length) if length > limit => Err(reject::custom(ApiError::new(
                    StatusCode::PAYLOAD_TOO_LARGE,
                    "Payload too large",
                ))),
                _ => Ok(()),
            }
        })
        .untuple_one()
        .and(warp::body::bytes())
}
