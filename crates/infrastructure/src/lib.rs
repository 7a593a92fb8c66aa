pub mod dns;
pub mod public_ip;
