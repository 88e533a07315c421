pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod geometry;
pub mod handlers;
pub mod routing;
pub mod session;
pub mod srs;
pub mod store;
pub mod study;
pub mod validation;

#[cfg(test)]
pub mod testing;
