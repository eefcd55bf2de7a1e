mod create;
mod docs;
mod provision;
mod update;
mod venv;

pub use create::cmd_create;
pub use docs::cmd_docs;
pub use provision::cmd_provision;
pub use update::cmd_update;
pub use venv::cmd_setup_virtualenv;
