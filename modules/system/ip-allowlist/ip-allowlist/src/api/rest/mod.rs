//! HTTP surface: the gate middleware and the allow-list management routes.

pub mod client_ip;
pub mod deny;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
