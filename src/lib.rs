//! callops console: configuration, logging and the command-line front end over
//! [`callops_orchestrator`].

pub mod cli;
pub mod config;
pub mod logging;
pub mod render;

pub use callops_orchestrator as orchestrator;
pub use callops_protocol as protocol;
