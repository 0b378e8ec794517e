//! Shared GitHub helpers for runbot.
//! This crate provides webhook payload types, error-body truncation, the
//! `/execute` command detector and execution-report rendering consumed by the
//! runtime crate.

pub mod execute_command;
pub mod execution_report;
pub mod github_content;
pub mod github_payloads;
pub mod github_transport_helpers;
pub mod pull_request_context;
