//! Scripts for deploying and configuring the MyDan contracts.

#![deny(missing_docs)]

pub mod artifacts;
pub mod cli;
mod commands;
pub mod constants;
pub mod context;
pub mod encoder;
pub mod errors;
pub mod ledger;
pub mod networks;
pub mod orchestrator;
pub mod params;
pub mod pipeline;
pub mod steps;
pub mod target;
pub mod utils;
pub mod verify;
