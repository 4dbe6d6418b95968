//! # promptc-dashboard
//!
//! Live web dashboard for the promptc agent.
//!
//! | Route | Purpose |
//! |-------|---------|
//! | `GET /` | status page |
//! | `GET /api/metrics` | metrics view polled by the page |
//! | `GET /api/health` | liveness summary |
//! | `GET /api/config` | current template table |
//! | `POST /api/config` | hot-reload the template table |
//! | `GET /ws` | audit history replay, then live lines |
//!
//! The dashboard owns no business logic; every route reads or writes one
//! of the shared runtime handles held in [`AppState`].

pub mod error;
pub mod handlers;
mod page;
pub mod routes;
pub mod server;
pub mod state;

pub use error::DashboardError;
pub use server::DashboardServer;
pub use state::AppState;
