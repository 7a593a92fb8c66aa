pub mod public_ip_refresh;
pub mod runner;

pub use public_ip_refresh::PublicIpRefreshJob;
pub use runner::JobRunner;
