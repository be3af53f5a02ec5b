//! # instrument-link
//!
//! A portable, no_std Rust codec and transaction engine for the serial link between a host and
//! the microcontroller of a photometric lab instrument (heaters, thermistors, thermopiles,
//! photodiodes, LEDs, fans and cuvette sensors).
//!
//! The host sends fixed 16 byte command frames and the MCU answers with fixed 32 byte telemetry
//! frames. Both carry a two byte header and a trailing additive checksum. This crate provides:
//! - `CommandFrame`: a typed builder for the actuator, duty cycle and calibration fields
//! - `TelemetryFrame`: validation of received bytes and calibrated sensor accessors
//! - `Transaction`: a send/receive cycle with bounded retries and a fixed backoff
//! - helpers for cuvette position detection and state change events
//!
//! ## Crate features
//! | Feature        | Description |
//! |----------------|-------------|
//! | `std`          | Disables `#![no_std]`, replaces `heapless::Vec`s with `std::vec::Vec`s and adds
//! `IoTransport` |
//! | `shared-link`  | Global link guarded by `critical_section::Mutex` |
//! | `defmt-0-3`    | Uses `defmt` logging and derives `defmt::Format` |
//! | `log`          | Uses `log` logging |
//!
//! ## Usage
//!
//! ```rust,ignore
//! use instrument_link::{Actuator, CommandFrame, DutyChannel, Transaction};
//!
//! let mut transaction = Transaction::new(delay, None);
//! let mut command = CommandFrame::new();
//! command.set_actuator(Actuator::WhiteLed, true);
//! command.set_duty_cycle(DutyChannel::White, 128);
//!
//! match transaction.exchange(&mut uart, &mut command) {
//!     Ok(telemetry) => log::info!("thermistor 1: {}", telemetry.thermistor_1()),
//!     Err(err) => log::warn!("link: {}", err),
//! }
//! ```
//!
//! ## Integration Notes
//!
//! - The link carries one outstanding request/response pair; serialize transactions when the
//!   instrument is polled from more than one place (see `shared` behind `shared-link`)
//! - Worst case latency of one send or receive is `attempts * backoff_ms`
//! - The transport must return promptly when no bytes are waiting

#![deny(
    bad_style,
    dead_code,
    improper_ctypes,
    non_shorthand_field_patterns,
    no_mangle_generic_items,
    overflowing_literals,
    path_statements,
    patterns_in_fns_without_body,
    unconditional_recursion,
    unused,
    while_true,
    missing_debug_implementations,
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_extern_crates,
    unused_import_braces,
    unused_qualifications,
    unused_results
)]
#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "shared-link")]
pub use critical_section;

#[cfg(not(feature = "std"))]
pub use heapless;

#[macro_use]
mod fmt;

pub mod bits;
pub mod checksum;
pub mod command;
pub mod consts;
pub mod cuvette;
pub mod error;
pub mod events;
#[cfg(feature = "shared-link")]
pub mod shared;
pub mod telemetry;
pub mod transaction;
pub mod transport;

pub use bits::{Actuator, Button, Cuvette, CuvetteCalibration, DutyChannel, Fan};
pub use command::CommandFrame;
pub use error::{AttemptFailure, FrameError, Phase, TransactionError};
pub use telemetry::{TelemetryFrame, TelemetryFrameBuilder};
pub use transaction::{Transaction, TransactionConfig, TransactionState};
pub use transport::FrameTransport;
