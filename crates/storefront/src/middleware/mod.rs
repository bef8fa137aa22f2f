//! Request-level helpers shared by the public handlers.

pub mod client_ip;

pub use client_ip::client_identifier;
