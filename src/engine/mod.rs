pub mod admission;
pub mod autopilot;
pub mod config;
pub mod events;
pub mod journal;
pub mod notify;
pub mod oracle;
pub mod render;
pub mod router;
pub mod session;
pub mod shield;
pub mod types;
