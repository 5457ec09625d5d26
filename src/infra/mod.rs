//! Concrete adapters for the traits in [`services`](crate::services).

pub mod arcgis;
pub mod openai;
