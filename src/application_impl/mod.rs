mod auth_service_impl;
mod media_host_fake;
mod media_host_impl;
mod password_hasher_impl;
mod token_service_impl;
mod user_service_impl;

pub use auth_service_impl::*;
pub use media_host_fake::*;
pub use media_host_impl::*;
pub use password_hasher_impl::*;
pub use token_service_impl::*;
pub use user_service_impl::*;
