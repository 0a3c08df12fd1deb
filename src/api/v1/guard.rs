use super::cookie::ACCESS_TOKEN_COOKIE;
use super::error::ApiError;
use crate::application_port::{AuthError, AuthService};
use crate::domain_model::{PublicUser, UserId};
use crate::logger::*;
use std::sync::Arc;
use warp::http::header::AUTHORIZATION;
use warp::{Filter, reject};

/// The authenticated caller, handed to protected handlers.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: UserId,
    pub user: PublicUser,
}

/// Picks the bearer credential: the cookie wins, else the `Authorization`
/// header without its scheme. Blank values count as absent.
pub fn extract_credential(cookie: Option<String>, authorization: Option<String>) -> Option<String> {
    let from_cookie = cookie
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());
    if from_cookie.is_some() {
        return from_cookie;
    }

    let header = authorization?;
    let header = header.trim();
    let token = match header.split_once(' ') {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
        _ if header.eq_ignore_ascii_case("bearer") => "",
        _ => header,
    };
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

pub async fn authenticate_request(
    auth_service: &dyn AuthService,
    cookie: Option<String>,
    authorization: Option<String>,
) -> Result<CurrentUser, ApiError> {
    let token = extract_credential(cookie, authorization)
        .ok_or_else(|| ApiError::unauthorized("Unauthorized request"))?;

    let user = auth_service
        .authenticate(&token)
        .await
        .map_err(|e| match e {
            AuthError::TokenExpired => ApiError::unauthorized("Access token expired"),
            AuthError::TokenInvalid | AuthError::IdentityNotFound => {
                ApiError::unauthorized("Invalid access token")
            }
            other => ApiError::from(other),
        })?;

    trace!(user_id = %user.id, "request authenticated");
    Ok(CurrentUser { id: user.id, user })
}

/// Rejects the request before the handler runs unless it carries a valid
/// access token.
pub fn with_session(
    auth_service: Arc<dyn AuthService>,
) -> impl Filter<Extract = (CurrentUser,), Error = warp::Rejection> + Clone {
    warp::cookie::optional::<String>(ACCESS_TOKEN_COOKIE)
        .and(warp::header::optional::<String>(AUTHORIZATION.as_str()))
        .and_then(move |cookie: Option<String>, authorization: Option<String>| {
            let auth_service = auth_service.clone();
            async move {
                authenticate_request(auth_service.as_ref(), cookie, authorization)
                    .await
                    .map_err(reject::custom)
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> Option<String> {
        Some(v.to_string())
    }

    #[test]
    fn cookie_is_preferred_over_header() {
        assert_eq!(
            extract_credential(s("from-cookie"), s("Bearer from-header")),
            s("from-cookie")
        );
    }

    #[test]
    fn header_scheme_is_stripped() {
        assert_eq!(extract_credential(None, s("Bearer abc")), s("abc"));
        assert_eq!(extract_credential(None, s("bearer   abc ")), s("abc"));
        assert_eq!(extract_credential(None, s("abc")), s("abc"));
    }

    #[test]
    fn blank_values_are_absent() {
        assert_eq!(extract_credential(None, None), None);
        assert_eq!(extract_credential(s(""), None), None);
        assert_eq!(extract_credential(None, s("Bearer")), None);
        assert_eq!(extract_credential(None, s("Bearer   ")), None);
        assert_eq!(extract_credential(s("  "), s("Bearer abc")), s("abc"));
    }
}
