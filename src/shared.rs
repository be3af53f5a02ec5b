//! A link shared between callers through `critical_section`.
//!
//! The MCU link carries one outstanding request/response pair. When several
//! places in a program poll the instrument (a main loop and a timer interrupt,
//! say) they go through one global [`SharedLink`], and each call to
//! [`with_shared_link`] runs a whole cycle inside a critical section so no two
//! cycles interleave on the wire.
//!
//! # Example
//! ```rust,ignore
//! use instrument_link::shared::{SharedLink, shared_link_init, shared_link_setup, with_shared_link};
//!
//! static LINK: SharedLink<Uart, Delay> = shared_link_init();
//!
//! fn main() {
//!     shared_link_setup(&LINK, uart, Transaction::new(delay, None));
//!     let telemetry = with_shared_link(&LINK, |link| link.exchange(&mut command));
//! }
//! ```

use core::cell::RefCell;
use critical_section::Mutex;
use embedded_hal::delay::DelayNs;

use crate::command::CommandFrame;
use crate::error::TransactionError;
use crate::telemetry::TelemetryFrame;
use crate::transaction::Transaction;
use crate::transport::FrameTransport;

/// A transport together with the transaction that drives it.
#[derive(Debug)]
pub struct Link<T: FrameTransport, D: DelayNs> {
    /// The byte link
    pub transport: T,
    /// Retry state and counters for the link
    pub transaction: Transaction<D>,
}

impl<T: FrameTransport, D: DelayNs> Link<T, D> {
    /// Bundles a transport with its transaction.
    pub fn new(transport: T, transaction: Transaction<D>) -> Self {
        Self {
            transport,
            transaction,
        }
    }

    /// Runs [`Transaction::exchange`] over this link's transport.
    pub fn exchange(&mut self, frame: &mut CommandFrame) -> Result<TelemetryFrame, TransactionError> {
        self.transaction.exchange(&mut self.transport, frame)
    }
}

/// Global storage for a [`Link`].
pub type SharedLink<T, D> = Mutex<RefCell<Option<Link<T, D>>>>;

/// Creates an empty [`SharedLink`], usable in a `static` initializer.
pub const fn shared_link_init<T: FrameTransport, D: DelayNs>() -> SharedLink<T, D> {
    Mutex::new(RefCell::new(None))
}

/// Installs `transport` and `transaction` into `global`, replacing any link
/// already there.
pub fn shared_link_setup<T: FrameTransport, D: DelayNs>(
    global: &'static SharedLink<T, D>,
    transport: T,
    transaction: Transaction<D>,
) {
    critical_section::with(|cs| {
        let _ = global
            .borrow(cs)
            .replace(Some(Link::new(transport, transaction)));
    });
}

/// Runs `f` on the installed link inside a critical section.
///
/// # Returns
/// * `None` if [`shared_link_setup`] has not been called yet
/// * `Some(result)` otherwise
pub fn with_shared_link<T: FrameTransport, D: DelayNs, R>(
    global: &'static SharedLink<T, D>,
    f: impl FnOnce(&mut Link<T, D>) -> R,
) -> Option<R> {
    critical_section::with(|cs| global.borrow(cs).borrow_mut().as_mut().map(f))
}
