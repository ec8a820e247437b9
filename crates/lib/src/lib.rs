//! Slack bridge library: RTM event routing and interaction callback verification,
//! used by the `slack-bridge` binary.

pub mod channels;
pub mod config;
pub mod gateway;
pub mod handler;
pub mod routing;
pub mod runtime;
