//! Group poll bot: users register, add items to a shared list, cast one vote
//! each and watch a pinned status message update live.
//!
//! Each module focuses on a concrete responsibility:
//!
//! - [`store`] owns users, items, votes and the monitor slot, persisting each
//!   resource class to its own JSON snapshot.
//! - [`dispatch`] long-polls the upstream service and runs one handler task
//!   per update, draining them on stop.
//! - [`bot`] turns commands and button presses into store operations and
//!   replies.
//! - [`monitor`] keeps the pinned status message in sync after changes.
//! - [`api`] describes the upstream capability and its HTTP client.
//! - [`render`] builds the HTML message bodies.
//! - [`runtime`] wires everything together behind a [`runtime::BotHandle`].
//! - [`cli`] and [`telemetry`] hold process configuration and logging setup.
//!
//! Integration tests drive the dispatcher and handlers through an in-process
//! fake of [`api::ChatApi`].

pub mod api;
pub mod bot;
pub mod cli;
pub mod dispatch;
pub mod monitor;
pub mod render;
pub mod runtime;
pub mod store;
pub mod telemetry;
