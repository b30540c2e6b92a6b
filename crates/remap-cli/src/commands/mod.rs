//! CLI command implementations

pub mod init;
pub mod rules;
pub mod validate;
