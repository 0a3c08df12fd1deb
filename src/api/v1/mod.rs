mod cookie;
mod error;
mod guard;
mod handler;
mod multipart;
mod response;
mod router;

pub use cookie::{ACCESS_TOKEN_COOKIE, CookieOptions, REFRESH_TOKEN_COOKIE, SameSite};
pub use error::{ApiError, ErrorBody, recover_error};
pub use guard::{CurrentUser, extract_credential, with_session};
pub use response::ApiResponse;
pub use router::{JSON_BODY_LIMIT, routes};
