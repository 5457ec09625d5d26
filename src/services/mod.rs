//! Seams between the orchestrator and the external services it drives.

pub mod insight_api;
pub mod map_host;
