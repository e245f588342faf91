//! Jukebox workspace umbrella crate.
//!
//! Re-exports the workspace crates so a host bot can depend on
//! `jukebox-workspace` alone: implement the traits in [`bridge_traits`],
//! build a [`core_runtime::config::CoreConfig`], and drive a
//! [`core_service::JukeboxService`].

pub use bridge_traits;
pub use core_queue;
pub use core_runtime;
pub use core_service;

pub use core_service::{ChatCommand, CommandContext, JukeboxService};
