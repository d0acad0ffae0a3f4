//! Task board synchronisation engine.
//!
//! Keeps an in-memory, column-organised view of tasks consistent with a
//! remote task store while supporting drag-and-drop reordering, cross-column
//! status moves, optimistic field updates with rollback, and bulk mutations
//! across a selection set.
//!
//! The moving parts, in data-flow order:
//!
//! - [`remote`] — the store contract and raw transport records
//! - [`projection`] — raw records into fully-populated [`task::Task`]s
//! - [`vocab`] — translation between display and persisted status taxonomies
//! - [`board`] — partitioning the task set into ordered columns
//! - [`reorder`] — turning drag ends into resolved move plans
//! - [`engine`] — the shared cache and its single writer, the optimistic
//!   mutation engine
//! - [`bulk`] — one field change across a selection, tracked per item
//! - [`filter`] — composable facet predicates over the task set
//!
//! [`config`] supplies the board variant (columns, vocabulary, priority
//! scale); [`cli`] and [`cmd`] are the command-line skin.

pub mod board;
pub mod bulk;
pub mod cli;
pub mod cmd;
pub mod config;
pub mod engine;
pub mod filter;
pub mod projection;
pub mod remote;
pub mod reorder;
pub mod task;
#[cfg(test)]
pub mod testutil;
pub mod vocab;
