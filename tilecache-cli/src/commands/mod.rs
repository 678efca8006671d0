//! Command handlers, one module per subcommand.

pub mod cache;
pub mod get;
pub mod init;
pub mod seed;
