use super::error::ApiError;
use crate::application_port::TokenPair;
use chrono::{DateTime, Utc};
use std::str::FromStr;
use warp::http::header::SET_COOKIE;
use warp::http::HeaderValue;

pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SameSite {
    Strict,
    #[default]
    Lax,
    None,
}

impl SameSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

impl FromStr for SameSite {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(SameSite::Strict),
            "lax" => Ok(SameSite::Lax),
            "none" => Ok(SameSite::None),
            other => Err(anyhow::anyhow!("unknown SameSite policy: {}", other)),
        }
    }
}

/// Attributes shared by the two token cookies.
#[derive(Debug, Clone)]
pub struct CookieOptions {
    pub secure: bool,
    pub http_only: bool,
    pub same_site: SameSite,
    pub path: String,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            secure: true,
            http_only: true,
            same_site: SameSite::Lax,
            path: "/".to_string(),
        }
    }
}

impl CookieOptions {
    pub fn from_settings(cookie: &crate::settings::Cookie) -> anyhow::Result<Self> {
        Ok(Self {
            secure: cookie.secure,
            same_site: cookie.same_site.parse()?,
            ..Self::default()
        })
    }

    pub fn build_set_cookie(&self, name: &str, value: &str, max_age_secs: i64) -> String {
        let mut cookie = format!("{}={}", name, value);

        if self.http_only {
            cookie.push_str("; HttpOnly");
        }
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie.push_str(&format!("; SameSite={}", self.same_site.as_str()));
        cookie.push_str(&format!("; Path={}", self.path));
        cookie.push_str(&format!("; Max-Age={}", max_age_secs.max(0)));

        cookie
    }

    pub fn build_clear_cookie(&self, name: &str) -> String {
        self.build_set_cookie(name, "", 0)
    }

    /// Appends `Set-Cookie` for both tokens, each living as long as its token.
    pub fn set_token_cookies(
        &self,
        res: &mut warp::reply::Response,
        tokens: &TokenPair,
        now: DateTime<Utc>,
    ) -> Result<(), ApiError> {
        let access_age = (tokens.access_token_expires_at - now).num_seconds();
        let refresh_age = (tokens.refresh_token_expires_at - now).num_seconds();
        append(
            res,
            self.build_set_cookie(ACCESS_TOKEN_COOKIE, &tokens.access_token.0, access_age),
        )?;
        append(
            res,
            self.build_set_cookie(REFRESH_TOKEN_COOKIE, &tokens.refresh_token.0, refresh_age),
        )
    }

    pub fn clear_token_cookies(&self, res: &mut warp::reply::Response) -> Result<(), ApiError> {
        append(res, self.build_clear_cookie(ACCESS_TOKEN_COOKIE))?;
        append(res, self.build_clear_cookie(REFRESH_TOKEN_COOKIE))
    }
}

// `append`, not `insert`: both cookies must survive.
fn append(res: &mut warp::reply::Response, cookie: String) -> Result<(), ApiError> {
    let value = HeaderValue::from_str(&cookie).map_err(ApiError::internal)?;
    res.headers_mut().append(SET_COOKIE, value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application_port::{AccessToken, RefreshToken};
    use warp::Reply;

    #[test]
    fn set_cookie_carries_all_attributes() {
        let cookie = CookieOptions::default().build_set_cookie("accessToken", "abc", 900);
        assert!(cookie.starts_with("accessToken=abc"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Secure"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("Max-Age=900"));
    }

    #[test]
    fn same_site_parses_case_insensitively() {
        assert_eq!("strict".parse::<SameSite>().unwrap(), SameSite::Strict);
        assert_eq!("None".parse::<SameSite>().unwrap(), SameSite::None);
        assert!("sideways".parse::<SameSite>().is_err());
    }

    #[test]
    fn token_cookies_are_both_appended() {
        let now = Utc::now();
        let tokens = TokenPair {
            access_token: AccessToken("a.b.c".to_string()),
            refresh_token: RefreshToken("d.e.f".to_string()),
            access_token_expires_at: now + chrono::Duration::minutes(15),
            refresh_token_expires_at: now + chrono::Duration::days(10),
        };
        let mut res = warp::reply().into_response();
        CookieOptions::default()
            .set_token_cookies(&mut res, &tokens, now)
            .unwrap();

        let cookies: Vec<_> = res
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect();
        assert_eq!(cookies.len(), 2);
        assert!(cookies[0].starts_with("accessToken=a.b.c"));
        assert!(cookies[0].contains("Max-Age=900"));
        assert!(cookies[1].starts_with("refreshToken=d.e.f"));
        assert!(cookies[1].contains("Max-Age=864000"));
    }

    #[test]
    fn clear_cookies_expire_immediately() {
        let mut res = warp::reply().into_response();
        CookieOptions::default().clear_token_cookies(&mut res).unwrap();
        let cookies: Vec<_> = res.headers().get_all(SET_COOKIE).iter().collect();
        assert_eq!(cookies.len(), 2);
        for cookie in cookies {
            assert!(cookie.to_str().unwrap().contains("Max-Age=0"));
        }
    }
}
