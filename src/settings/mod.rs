//! Settings come from a TOML file layered with `VIDTUBE__*` environment
//! variables. See `settings/dev.toml` for every key.

mod cli;
pub use clap::Parser;
pub use cli::*;

mod settings;
pub use settings::*;
