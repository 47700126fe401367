//! CLI command implementations

mod build;
mod clean;
mod init;
mod validate;

pub use build::BuildCommand;
pub use clean::CleanCommand;
pub use init::InitCommand;
pub use validate::ValidateCommand;
