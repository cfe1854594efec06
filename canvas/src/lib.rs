//! Deterministic stroke replay and the client-side session replica.
//!
//! This crate turns an ordered stroke log into pixels and holds the derived,
//! disposable copy of a session that a client renders from. It never owns
//! canonical state: the server decides the log and horizon, and the
//! [`replica::Replica`] only applies newer versions of what it is sent.
//!
//! ## Module layout
//!
//! | Module | Role |
//! |--------|------|
//! | [`render`] | ReplayEngine: [`render::render`] and the RGBA [`render::PixelBuffer`] |
//! | [`replica`] | Version-guarded replica with a cached committed frame and live gesture preview |
//! | [`color`] | Hex colour parsing |
//! | [`consts`] | Shared numeric constants (default surface size, brush minimum) |

pub mod color;
pub mod consts;
pub mod render;
pub mod replica;

pub use render::{PixelBuffer, render};
pub use replica::{ApplyOutcome, Replica};
