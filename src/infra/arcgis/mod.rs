//! ArcGIS Pro adapter for [`MapHost`](crate::services::map_host::MapHost).

mod host;
mod script;

pub use host::ArcGisProHost;
