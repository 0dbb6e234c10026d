//! HTTP gateway that hands a symptom list to an external prediction script and
//! relays the script's JSON output.

pub mod cli;
pub mod config;
pub mod execution;
pub mod handlers;
pub mod process;
pub mod server;
