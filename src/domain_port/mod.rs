// repo

mod user_repo;

pub use user_repo::*;
