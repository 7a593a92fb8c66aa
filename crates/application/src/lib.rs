//! Ferrous Forwarder Application Layer
pub mod dns_message;
pub mod ports;
pub mod services;
pub mod use_cases;
