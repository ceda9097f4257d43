//! CLI building blocks for the HL7 workbench binary: argument
//! definitions, command handlers, logging setup, and terminal rendering.

pub mod cli;
pub mod commands;
pub mod logging;
pub mod output;
