//! Constants shared by the command and telemetry frame layouts.
//!
//! Both directions of the link exchange fixed-size frames:
//!
//! - **Command frames** (host → MCU) are [`COMMAND_FRAME_LEN`] bytes long and
//!   start with [`COMMAND_HEADER`].
//! - **Telemetry frames** (MCU → host) are [`TELEMETRY_FRAME_LEN`] bytes long and
//!   start with [`TELEMETRY_HEADER`] followed by a protocol version byte.
//!
//! The last byte of either frame is a sum-mod-256 checksum over every other byte
//! (see [`crate::checksum`]).
//!
//! Byte offsets are collected in the [`command_offset`] and [`telemetry_offset`]
//! modules so that no other module indexes a frame with a bare literal.

/// Length (in bytes) of an outgoing command frame, checksum included.
pub const COMMAND_FRAME_LEN: usize = 16;

/// Length (in bytes) of an incoming telemetry frame, checksum included.
pub const TELEMETRY_FRAME_LEN: usize = 32;

/// The two marker bytes that open every command frame.
pub const COMMAND_HEADER: [u8; 2] = [0xc3, 0xa5];

/// The two marker bytes that open every telemetry frame.
pub const TELEMETRY_HEADER: [u8; 2] = [0x5a, 0x3c];

/// Protocol version reported by current MCU firmware.
pub const PROTOCOL_VERSION: u8 = 0x01;

/// Size of the window a receive attempt reads into.
///
/// Twice the frame length, so a frame preceded by noise or by the tail of an
/// earlier frame still fits whole.
pub const RX_SCRATCH_LEN: usize = TELEMETRY_FRAME_LEN * 2;

/// Upper bound on `read_available` calls in one receive attempt.
///
/// Once the window fills, the attempt keeps reading (keeping only the newest
/// [`RX_SCRATCH_LEN`] bytes) until the transport runs dry or this many reads
/// have been made.
pub const RX_MAX_READS: usize = 32;

/// Default number of write attempts per send.
pub const DEFAULT_SEND_ATTEMPTS: u8 = 3;

/// Default number of read attempts per receive.
pub const DEFAULT_RECEIVE_ATTEMPTS: u8 = 3;

/// Default pause after a failed attempt, in milliseconds.
pub const DEFAULT_BACKOFF_MS: u32 = 50;

/// Default pause between a send and the following receive, in milliseconds.
pub const DEFAULT_SETTLE_MS: u32 = 50;

/// Byte offsets inside a command frame.
pub mod command_offset {
    /// Actuator enable mask (which actuator bits this frame may modify).
    pub const ACTUATOR_ENABLE: usize = 3;
    /// Actuator on/off state mask.
    pub const ACTUATOR_STATE: usize = 4;
    /// Duty-cycle channel enable mask.
    pub const DUTY_CYCLE_ENABLE: usize = 5;
    /// White LED PWM duty cycle.
    pub const WHITE_DUTY_CYCLE: usize = 6;
    /// NIR LED PWM duty cycle.
    pub const NIR_DUTY_CYCLE: usize = 7;
    /// Cuvette sensor calibration request bits.
    pub const CUVETTE_CALIBRATION: usize = 8;
    /// Trailing checksum byte.
    pub const CHECKSUM: usize = super::COMMAND_FRAME_LEN - 1;
}

/// Byte offsets inside a telemetry frame.
///
/// Sensor words are little-endian `u16`s; their offsets live on
/// [`SensorWord`](crate::telemetry::SensorWord).
pub mod telemetry_offset {
    /// Protocol version byte.
    pub const PROTOCOL_VERSION: usize = 2;
    /// LED, cuvette presence and lid switch status bits.
    pub const STATUS: usize = 3;
    /// Button state bits.
    pub const BUTTONS: usize = 4;
    /// Fan running bits.
    pub const FANS: usize = 5;
    /// White LED duty cycle as applied by the MCU.
    pub const WHITE_DUTY_READBACK: usize = 22;
    /// NIR LED duty cycle as applied by the MCU.
    pub const NIR_DUTY_READBACK: usize = 23;
    /// Reserved byte, carried through untouched.
    pub const RESERVED: usize = 30;
    /// Trailing checksum byte.
    pub const CHECKSUM: usize = super::TELEMETRY_FRAME_LEN - 1;
}
