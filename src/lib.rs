// MIT License

//! Bridge library for Paradox alarm panels reachable through the web
//! interface of their IP module (IP150 and compatible).
//!
//! The module exposes no API, only a browser UI, so this crate drives that
//! UI directly: it performs the module's challenge-response login, scrapes
//! area and zone state out of the pages' embedded JavaScript literals, and
//! issues arm requests the same way the UI's own scripts do.
//!
//! The heart of the crate is [`ParadoxPanel`], a single-threaded session
//! engine. Callers enqueue commands ([`CommandItem`]) and call
//! [`ParadoxPanel::process`] on a regular cadence; each call advances the
//! session by at most one protocol step. The module only tolerates one
//! session at a time and a slow request rate, which is why the engine is
//! deliberately stepwise instead of running the protocol to completion in
//! one call.
//!
//! Status results surface as [`StatusSnapshot`] values whose `serde`
//! serialization matches the JSON shape the companion MQTT daemon publishes.

pub mod config;
pub mod constants;
pub mod crypto;
pub mod error;
pub mod panel;
pub mod queue;
pub mod scrape;
pub mod status;
pub mod terminology;
pub mod transport;

pub use config::ModuleConfig;
pub use error::{ParadoxError, Result};
pub use panel::{LoginPhase, ParadoxPanel, SessionToken};
pub use queue::{ArmMode, CommandItem};
pub use status::{AreaStatus, StatusSnapshot, ZoneStatus};
pub use terminology::TerminologyCache;
pub use transport::{HttpTransport, Transport};
