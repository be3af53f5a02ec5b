//! Error types for frame validation and transactions.
//!
//! Nothing here is fatal. A [`FrameError`] rejects one buffer, an
//! [`AttemptFailure`] costs one retry, and a [`TransactionError`] is returned
//! to the caller once the retries are spent. The caller owns escalation.

use thiserror::Error;

/// Why a byte buffer was rejected as a frame.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Error)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum FrameError {
    /// The buffer is not exactly one frame long.
    #[error("expected a {expected} byte frame, got {actual} bytes")]
    Length {
        /// Required frame length
        expected: usize,
        /// Length of the rejected buffer
        actual: usize,
    },
    /// The two leading marker bytes are wrong.
    #[error("header mismatch: expected {expected:02x?}, got {actual:02x?}")]
    HeaderMismatch {
        /// Fixed marker bytes for this frame type
        expected: [u8; 2],
        /// Marker bytes found in the buffer
        actual: [u8; 2],
    },
    /// The trailing checksum byte does not match the frame contents.
    #[error("checksum mismatch: computed {expected:#04x}, frame carries {actual:#04x}")]
    ChecksumMismatch {
        /// Checksum computed over the buffer
        expected: u8,
        /// Checksum byte carried by the buffer
        actual: u8,
    },
}

/// The outcome of one failed send or receive attempt.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Error)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum AttemptFailure {
    /// The transport reported a failed or partial write.
    #[error("transport write failed")]
    TransportWriteFailure,
    /// The transport could not accept the write right now.
    #[error("transport busy")]
    TransportWriteBusy,
    /// No bytes were available on a poll.
    #[error("no bytes available")]
    TransportReadEmpty,
    /// The transport reported an error while reading.
    #[error("transport read failed")]
    TransportReadFailure,
    /// Bytes arrived but did not form a valid telemetry frame.
    #[error("invalid frame: {0}")]
    FrameValidationFailure(#[from] FrameError),
}

/// Which half of a transaction cycle failed.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum Phase {
    /// Writing the command frame
    Send,
    /// Reading the telemetry frame
    Receive,
}

impl core::fmt::Display for Phase {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Phase::Send => f.write_str("send"),
            Phase::Receive => f.write_str("receive"),
        }
    }
}

/// Terminal result of a send or receive that ran out of attempts.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Error)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum TransactionError {
    /// Every allowed attempt failed.
    #[error("{phase} gave up after {attempts} attempt(s)")]
    RetryExhausted {
        /// The phase that gave up
        phase: Phase,
        /// Number of attempts made
        attempts: u8,
        /// Failure of the final attempt, `None` when no attempt was allowed
        last: Option<AttemptFailure>,
    },
}

impl TransactionError {
    /// Failure of the final attempt, if any attempt was made.
    pub fn last_failure(&self) -> Option<AttemptFailure> {
        match self {
            TransactionError::RetryExhausted { last, .. } => *last,
        }
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = FrameError::Length {
            expected: 32,
            actual: 5,
        };
        assert_eq!(err.to_string(), "expected a 32 byte frame, got 5 bytes");

        let err = FrameError::ChecksumMismatch {
            expected: 0x12,
            actual: 0x13,
        };
        assert_eq!(
            err.to_string(),
            "checksum mismatch: computed 0x12, frame carries 0x13"
        );

        let err = TransactionError::RetryExhausted {
            phase: Phase::Receive,
            attempts: 3,
            last: Some(AttemptFailure::TransportReadEmpty),
        };
        assert_eq!(err.to_string(), "receive gave up after 3 attempt(s)");
        assert_eq!(err.last_failure(), Some(AttemptFailure::TransportReadEmpty));
    }

    #[test]
    fn test_frame_error_converts_into_attempt_failure() {
        let failure: AttemptFailure = FrameError::HeaderMismatch {
            expected: [0x5a, 0x3c],
            actual: [0x00, 0x3c],
        }
        .into();
        assert!(matches!(
            failure,
            AttemptFailure::FrameValidationFailure(FrameError::HeaderMismatch { .. })
        ));
    }
}
