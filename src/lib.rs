#![warn(missing_docs)]

//! <div class="warning">
//!
//! Note: API is unstable, and may change in `0.x` versions.
//!
//! </div>
//!
//! # As a library
//!
//! Two independent clients, each doing one request per call:
//!
//! - [`nekos`] for the [nekos.best](https://nekos.best) image API.
//! - [`otaku`] for the [otakugifs.xyz](https://otakugifs.xyz) reaction GIF API.
//!
//! Every call returns an owned value, or an [`Error`] of one of the [`ErrorKind`]s.
//! Raw downloads go through [`transport`].
//!
//! See [`otaku::Otaku#example`] and [`nekos::Nekos#example`] for examples.
//!
//! # As a binary
//!
//! In addition to the above, you also need [`cli`] (the `cli` feature) to build the command line.
//!
//! See `main.rs` to know how to assemble these modules as a binary.

pub mod nekos;
pub mod otaku;
pub mod transport;

#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod error;
mod tool;

pub use error::{Error, ErrorKind, Result};
