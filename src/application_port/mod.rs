mod auth_service;
mod media_host;
mod token_service;
mod user_service;

pub use auth_service::*;
pub use media_host::*;
pub use token_service::*;
pub use user_service::*;
