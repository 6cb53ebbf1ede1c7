//! `leubot-cockpit` – the HTTP API for the arm
//!
//! Translates HTTP requests into [`ArmRequest`][leubot_types::ArmRequest]s
//! for the arbitrator and renders the replies.  The layer holds no arm state
//! of its own; everything goes through an
//! [`ArmHandle`][leubot_runtime::ArmHandle].
//!
//! # Resources
//!
//! All paths live under `/{api_path}/{api_version}` (see
//! [`ApiConfig::base_path`]).
//!
//! | Path | Methods |
//! |---|---|
//! | `/user` | `GET`, `POST` |
//! | `/user/{token}` | `DELETE` |
//! | `/base`, `/shoulder`, `/elbow`, `/wrist/angle`, `/wrist/rotation`, `/gripper` | `GET`, `PUT` |
//! | `/posture` | `GET`, `PUT` |
//! | `/reset`, `/sleep` | `PUT` |
//! | `/events` | `GET` (WebSocket stream of arm events) |
//!
//! Every resource also answers `OPTIONS` (204 with CORS headers) and, where
//! it has a `GET`, `HEAD`.
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use leubot_cockpit::{ApiConfig, AppState, CockpitServer};
//! use leubot_hal::ArmLinkTransport;
//! use leubot_middleware::EventBus;
//! use leubot_runtime::{Arbitrator, ArbitratorConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let bus = EventBus::default();
//!     let (arm, _task) = Arbitrator::spawn(
//!         ArbitratorConfig::default(),
//!         Box::new(ArmLinkTransport::dry_run()),
//!         bus.clone(),
//!     )
//!     .expect("invalid arbitrator config");
//!     let state = AppState { arm, bus, api: Arc::new(ApiConfig::default()) };
//!     CockpitServer::new(state)
//!         .run(std::future::pending())
//!         .await
//!         .expect("cockpit server failed");
//! }
//! ```

pub mod error;
pub mod routes;
pub mod server;
pub mod stream;

pub use error::ApiError;
pub use routes::{ApiConfig, AppState, build_router};
pub use server::{CockpitServer, DEFAULT_PORT};
