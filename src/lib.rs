//! pr-pilot - team development workflow CLI
//!
//! Wraps the daily git/GitHub chores of a team that ships through rebase
//! merges and a kanban board: branch upkeep, PR creation and review
//! routing, readiness reporting, and orchestrated merging of everything
//! a board card says is ready to publish.
//!
//! The crate splits into:
//! - [`git`] and [`exec`]: typed access to the local `git` binary
//! - [`platform`]: the code-host seam and its GitHub implementation
//! - [`flux`], [`sheets`], [`openai`]: the other external services
//! - [`merge`]: pure merge planning plus effectful execution
//! - [`report`]: flag derivation, ranking and table layout
//! - [`config`], [`auth`], [`error`], [`types`]: shared plumbing

pub mod auth;
pub mod config;
pub mod error;
pub mod exec;
pub mod flux;
pub mod git;
pub mod merge;
pub mod openai;
pub mod platform;
pub mod report;
pub mod sheets;
pub mod types;
