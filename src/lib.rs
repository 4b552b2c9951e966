//! # Deadline Board
//!
//! Live, time-relative status for a list of deadline-bound tasks.
//!
//! This library provides:
//! - A pure status evaluator: `(deadline, completed, now) -> label`
//! - An in-memory, insertion-ordered mirror of a remote task store
//! - A ticker that re-derives every status on a fixed period
//! - Completion filtering with a closed selector set
//! - An HTTP API (with an SSE stream) for presentation clients
//!
//! ## Architecture
//!
//! ```text
//!   presentation ──HTTP──▶ api ──▶ TaskBoard ──▶ TaskBackend (remote store)
//!                                     │
//!                                     ▼
//!               Ticker ──────────▶ TaskStore ◀── FilterEngine
//!                 │
//!                 └── Clock
//! ```
//!
//! ## Modules
//! - `task`: task records, deadlines, status evaluation
//! - `store`: the local task mirror
//! - `ticker`: periodic re-evaluation
//! - `filter`: completion filtering
//! - `remote`: the storage collaborator interface and clients
//! - `board`: mutation entry points
//! - `api`: HTTP server

pub mod api;
pub mod board;
pub mod clock;
pub mod config;
pub mod filter;
pub mod remote;
pub mod store;
pub mod task;
pub mod ticker;

pub use board::{BoardError, TaskBoard, TaskRow};
pub use config::Config;
pub use filter::FilterSelector;
pub use task::{Deadline, StatusLabel, Task, TaskId};
