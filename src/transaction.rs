//! One request/response cycle over an unreliable byte stream.
//!
//! This module provides the [`Transaction`] struct, which writes a
//! [`CommandFrame`] to the MCU and reads back a [`TelemetryFrame`], retrying each
//! half independently.
//!
//! ## Retry policy
//!
//! - **Send**: up to `max_attempts` writes. The first write the transport
//!   accepts ends the send.
//! - **Receive**: up to `max_attempts` polls. A poll drains what the transport
//!   has queued and takes the last valid frame in it, skipping noise ahead of
//!   the header. A poll that returns nothing, a transport error, or bytes with
//!   no valid frame all count as one failed attempt. Rejected bytes are
//!   dropped; nothing is carried over to the next poll.
//! - Every failed attempt is followed by a fixed backoff (50 ms by default),
//!   so the worst case for either half is `max_attempts * backoff`.
//!
//! Running out of attempts returns [`TransactionError::RetryExhausted`]; it is
//! never a panic.
//!
//! ## Example
//!
//! ```rust
//! # use embedded_hal_mock::eh1::delay::NoopDelay;
//! # use instrument_link::transport::FrameTransport;
//! # use instrument_link::telemetry::TelemetryFrameBuilder;
//! # struct Echo(Option<[u8; 32]>);
//! # impl FrameTransport for Echo {
//! #     type Error = ();
//! #     fn write(&mut self, _bytes: &[u8]) -> nb::Result<(), ()> { Ok(()) }
//! #     fn read_available(&mut self, buf: &mut [u8]) -> nb::Result<usize, ()> {
//! #         let frame = self.0.take().ok_or(nb::Error::WouldBlock)?;
//! #         buf[..32].copy_from_slice(&frame);
//! #         Ok(32)
//! #     }
//! # }
//! # let mut link = Echo(Some(TelemetryFrameBuilder::new().build().to_bytes()));
//! use instrument_link::bits::Actuator;
//! use instrument_link::command::CommandFrame;
//! use instrument_link::transaction::Transaction;
//!
//! let mut transaction = Transaction::new(NoopDelay::new(), None);
//! let mut command = CommandFrame::new();
//! command.set_actuator(Actuator::WhiteLed, true);
//!
//! let telemetry = transaction.exchange(&mut link, &mut command).unwrap();
//! assert_eq!(telemetry.protocol_version(), 1);
//! ```

use embedded_hal::delay::DelayNs;

use crate::bits::CuvetteCalibration;
use crate::command::CommandFrame;
use crate::consts::{
    DEFAULT_BACKOFF_MS, DEFAULT_RECEIVE_ATTEMPTS, DEFAULT_SEND_ATTEMPTS, DEFAULT_SETTLE_MS,
    RX_MAX_READS, RX_SCRATCH_LEN, TELEMETRY_FRAME_LEN,
};
use crate::cuvette::CuvetteThresholds;
use crate::error::{AttemptFailure, Phase, TransactionError};
use crate::telemetry::TelemetryFrame;
use crate::transport::FrameTransport;

/// Where a [`Transaction`] is in its send/receive cycle.
///
/// ```text
/// Idle → Sending → (Sent | SendFailed) → Receiving → (Received | ReceiveFailed)
/// ```
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum TransactionState {
    /// Nothing has happened yet.
    #[default]
    Idle,
    /// Writing a command frame.
    Sending,
    /// The last send succeeded.
    Sent,
    /// The last send ran out of attempts.
    SendFailed,
    /// Polling for a telemetry frame.
    Receiving,
    /// The last receive produced a valid frame.
    Received,
    /// The last receive ran out of attempts.
    ReceiveFailed,
}

/// Retry and timing settings.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct TransactionConfig {
    /// Write attempts used by [`Transaction::exchange`].
    pub send_attempts: u8,
    /// Read attempts used by [`Transaction::exchange`].
    pub receive_attempts: u8,
    /// Pause after each failed attempt, in milliseconds.
    pub backoff_ms: u32,
    /// Pause between the send and the receive of an exchange, in milliseconds.
    pub settle_ms: u32,
}

impl Default for TransactionConfig {
    fn default() -> Self {
        Self {
            send_attempts: DEFAULT_SEND_ATTEMPTS,
            receive_attempts: DEFAULT_RECEIVE_ATTEMPTS,
            backoff_ms: DEFAULT_BACKOFF_MS,
            settle_ms: DEFAULT_SETTLE_MS,
        }
    }
}

/// Drives send/receive cycles against a [`FrameTransport`].
///
/// The transaction owns the delay provider used for backoff and borrows the
/// transport for the duration of each call. The link carries one outstanding
/// request/response pair, so callers that poll from several places must
/// serialize their transactions (see the `shared` module behind the
/// `shared-link` feature).
///
/// ## Type Parameters
///
/// - `D`: A type implementing [`embedded_hal::delay::DelayNs`], used for the
///   backoff and settle pauses.
#[derive(Debug)]
pub struct Transaction<D: DelayNs> {
    state: TransactionState,
    config: TransactionConfig,
    /// Delay provider
    pub delay: D,

    /// Command frames the transport accepted.
    pub tx_good: u16,

    /// Write attempts that failed.
    pub tx_bad: u16,

    /// Telemetry frames that passed validation.
    pub rx_good: u16,

    /// Received buffers rejected by validation.
    pub rx_bad: u16,
}

impl<D: DelayNs> Transaction<D> {
    /// Creates a new `Transaction`.
    ///
    /// # Arguments
    /// - `delay`: Delay provider for backoff and settle pauses.
    /// - `config`: Retry settings, [`TransactionConfig::default()`] when `None`.
    pub fn new(delay: D, config: Option<TransactionConfig>) -> Self {
        Self {
            state: TransactionState::Idle,
            config: config.unwrap_or_default(),
            delay,
            tx_good: 0,
            tx_bad: 0,
            rx_good: 0,
            rx_bad: 0,
        }
    }

    /// Current state.
    pub fn state(&self) -> TransactionState {
        self.state
    }

    /// Active retry settings.
    pub fn config(&self) -> &TransactionConfig {
        &self.config
    }

    fn set_state(&mut self, state: TransactionState) {
        if self.state != state {
            trace!("transaction {:?} -> {:?}", self.state, state);
            self.state = state;
        }
    }

    /// Finalizes `frame` and writes it, retrying up to `max_attempts` times.
    ///
    /// # Returns
    /// - `Ok(())` on the first write the transport accepts
    /// - `Err(TransactionError::RetryExhausted)` once every attempt failed
    pub fn send<T: FrameTransport>(
        &mut self,
        transport: &mut T,
        frame: &mut CommandFrame,
        max_attempts: u8,
    ) -> Result<(), TransactionError> {
        self.set_state(TransactionState::Sending);
        frame.finalize();
        let bytes = frame.as_bytes();

        let mut last = None;
        for attempt in 1..=max_attempts {
            let failure = match transport.write(&bytes) {
                Ok(()) => {
                    self.tx_good = self.tx_good.saturating_add(1);
                    debug!("command frame sent (attempt {}/{})", attempt, max_attempts);
                    self.set_state(TransactionState::Sent);
                    return Ok(());
                }
                Err(nb::Error::WouldBlock) => AttemptFailure::TransportWriteBusy,
                Err(nb::Error::Other(_)) => AttemptFailure::TransportWriteFailure,
            };
            self.tx_bad = self.tx_bad.saturating_add(1);
            self.back_off(Phase::Send, attempt, max_attempts, failure);
            last = Some(failure);
        }

        self.set_state(TransactionState::SendFailed);
        Err(exhausted(Phase::Send, max_attempts, last))
    }

    /// Polls for a telemetry frame, retrying up to `max_attempts` times.
    ///
    /// Each attempt drains whatever the transport has queued and looks for the
    /// last valid frame in it (see [`TelemetryFrame::scan`]). Bytes of a
    /// failed attempt are dropped, never carried into the next one.
    ///
    /// # Returns
    /// - `Ok(frame)` for the first attempt that yields a valid frame
    /// - `Err(TransactionError::RetryExhausted)` once every attempt failed;
    ///   no decoded value of a rejected buffer is ever returned
    pub fn receive<T: FrameTransport>(
        &mut self,
        transport: &mut T,
        max_attempts: u8,
    ) -> Result<TelemetryFrame, TransactionError> {
        self.set_state(TransactionState::Receiving);
        let mut scratch = [0u8; RX_SCRATCH_LEN];

        let mut last = None;
        for attempt in 1..=max_attempts {
            let failure = match poll(transport, &mut scratch) {
                Err(failure) => failure,
                Ok(len) => match TelemetryFrame::scan(&scratch[..len]) {
                    Ok(frame) => {
                        self.rx_good = self.rx_good.saturating_add(1);
                        debug!(
                            "telemetry frame received (attempt {}/{})",
                            attempt, max_attempts
                        );
                        self.set_state(TransactionState::Received);
                        return Ok(frame);
                    }
                    Err(err) => {
                        self.rx_bad = self.rx_bad.saturating_add(1);
                        AttemptFailure::FrameValidationFailure(err)
                    }
                },
            };
            self.back_off(Phase::Receive, attempt, max_attempts, failure);
            last = Some(failure);
        }

        self.set_state(TransactionState::ReceiveFailed);
        Err(exhausted(Phase::Receive, max_attempts, last))
    }

    /// Runs a full cycle with the configured attempt counts: send, wait
    /// `settle_ms`, receive.
    ///
    /// A failed send skips the receive.
    pub fn exchange<T: FrameTransport>(
        &mut self,
        transport: &mut T,
        frame: &mut CommandFrame,
    ) -> Result<TelemetryFrame, TransactionError> {
        self.send(transport, frame, self.config.send_attempts)?;
        self.delay.delay_ms(self.config.settle_ms);
        self.receive(transport, self.config.receive_attempts)
    }

    /// Resets `frame` and runs an exchange with it, bringing the MCU to a
    /// known state after power-up.
    pub fn power_up_reset<T: FrameTransport>(
        &mut self,
        transport: &mut T,
        frame: &mut CommandFrame,
    ) -> Result<TelemetryFrame, TransactionError> {
        frame.reset();
        self.exchange(transport, frame)
    }

    /// Runs an empty-chamber cuvette calibration and derives the blocked
    /// thresholds from the reply.
    ///
    /// Sets [`CuvetteCalibration::Empty`] on `frame`, exchanges it and scales
    /// the returned cuvette readings by `factor`. The calibration request is
    /// cleared from `frame` afterwards whether or not the exchange succeeded,
    /// so later frames do not repeat it.
    pub fn calibrate_empty_chamber<T: FrameTransport>(
        &mut self,
        transport: &mut T,
        frame: &mut CommandFrame,
        factor: f64,
    ) -> Result<CuvetteThresholds, TransactionError> {
        frame.set_cuvette_calibration(CuvetteCalibration::Empty);
        let reply = self.exchange(transport, frame);
        frame.set_cuvette_calibration(CuvetteCalibration::None);
        reply.map(|telemetry| CuvetteThresholds::from_empty_chamber(&telemetry, factor))
    }

    fn back_off(&mut self, phase: Phase, attempt: u8, max_attempts: u8, failure: AttemptFailure) {
        warn!(
            "{} attempt {}/{} failed: {}",
            phase, attempt, max_attempts, failure
        );
        self.delay.delay_ms(self.config.backoff_ms);
    }
}

/// Reads one attempt's worth of bytes into `scratch` and returns how many are
/// valid.
///
/// A read that fills the window means more may be queued. The transport is
/// then read until it reports nothing, shifting older bytes out so the window
/// holds the newest ones.
fn poll<T: FrameTransport>(
    transport: &mut T,
    scratch: &mut [u8; RX_SCRATCH_LEN],
) -> Result<usize, AttemptFailure> {
    let len = match transport.read_available(scratch) {
        Ok(0) | Err(nb::Error::WouldBlock) => return Err(AttemptFailure::TransportReadEmpty),
        Ok(n) => n.min(RX_SCRATCH_LEN),
        Err(nb::Error::Other(_)) => return Err(AttemptFailure::TransportReadFailure),
    };
    if len < RX_SCRATCH_LEN {
        return Ok(len);
    }

    let mut dropped = 0usize;
    for _ in 1..RX_MAX_READS {
        let mut more = [0u8; TELEMETRY_FRAME_LEN];
        let n = match transport.read_available(&mut more) {
            Ok(n) => n.min(TELEMETRY_FRAME_LEN),
            Err(_) => 0,
        };
        if n == 0 {
            break;
        }
        scratch.copy_within(n.., 0);
        scratch[RX_SCRATCH_LEN - n..].copy_from_slice(&more[..n]);
        dropped += n;
    }
    if dropped > 0 {
        debug!("dropped {} stale byte(s) ahead of the newest window", dropped);
    }
    Ok(RX_SCRATCH_LEN)
}

fn exhausted(phase: Phase, attempts: u8, last: Option<AttemptFailure>) -> TransactionError {
    warn!("{} gave up after {} attempt(s)", phase, attempts);
    TransactionError::RetryExhausted {
        phase,
        attempts,
        last,
    }
}
