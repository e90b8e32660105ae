// Adapters layer: concrete implementations of the domain ports and the
// request/response surface.

pub mod csv_routes;
pub mod memory_store;
pub mod rest;
pub mod target_table;
