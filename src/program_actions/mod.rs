mod notebook_actions;
mod external_commands;
pub mod docs_actions;

pub use notebook_actions::*;
pub use external_commands::*;
