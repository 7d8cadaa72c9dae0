//! # biggerfish
//!
//! Orchestrates browser CPU side-channel trace collection: a configured
//! browser backend loads each target page for a fixed window while a
//! sampling strategy records timing activity, and every run is appended to a
//! per-target record file that collection can resume from.

pub mod cli;
pub mod collector;
pub mod config;
pub mod driver;
pub mod logging;
pub mod notify;
pub mod pageserver;
pub mod protocol;
pub mod receiver;
pub mod sampler;
pub mod store;
pub mod targets;
pub mod timer;
pub mod trace;
