pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod ingest;
pub mod middleware;
pub mod pipeline;
pub mod routes;
pub mod server;
pub mod sync;

#[cfg(test)]
mod endpoint_tests;
