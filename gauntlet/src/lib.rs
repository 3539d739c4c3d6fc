//! Encounter orchestration engine for autonomous runs in an external world.
//!
//! The engine drives a controlled actor through a fixed multi-phase
//! objective: travel to a staging ground, consume the warded gates of each
//! guardian phase, confirm each guardian's death, and engage the terminal
//! encounter. The world is only observed through periodically refreshed
//! read-only snapshots and only acted on through discrete commands, so every
//! loop is built to make forward progress under stale views, vanishing
//! entity handles, and operator pauses. The architecture enforces a strict
//! separation:
//!
//! - **[`core`]**: Pure, deterministic logic (snapshot types, threat
//!   filtering, the objective graph). No I/O, fully testable in isolation.
//! - **Engine modules** ([`interact`], [`engage`], [`run`]): bounded
//!   retry/poll loops coordinating world commands with snapshot evidence.
//! - **Seams** ([`world`]): traits for the externally owned collaborators
//!   (snapshot accessor, movement, combat, inventory helpers).
//!
//! [`run::execute_run`] is the single entry point; [`sim`] provides a
//! scripted world for dry runs and tests.

pub mod config;
pub mod core;
pub mod engage;
pub mod exit_codes;
pub mod interact;
pub mod journal;
pub mod logging;
pub mod pause;
pub mod run;
pub mod sim;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod world;
