//! Integration tests for the burst-buffer host agent

mod cli_flow;
mod event_flow;
mod startup_flow;
mod support;
