pub mod config;
pub mod error;
pub mod fetch;
pub mod gbfs;
pub mod infra;
pub mod manifest;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod services;
pub mod station;
pub mod stats;
