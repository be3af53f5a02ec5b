//! Host → MCU command frames.
//!
//! A [`CommandFrame`] is the 16 byte record the host sends every cycle:
//!
//! ```text
//! [0xC3, 0xA5, 0, enable, state, duty_enable, white_duty, nir_duty, cuvette_cal, 0 .. 0, checksum]
//! ```
//!
//! Actuator bits only take effect on the MCU where the matching enable bit is
//! set. Enable bits accumulate: switching an actuator sets its enable bit and
//! nothing but [`reset()`](CommandFrame::reset) or
//! [`clear_actuator_enable_mask()`](CommandFrame::clear_actuator_enable_mask) clears it again.
//!
//! Every mutator recomputes the checksum before returning, so the checksum
//! observed through [`to_bytes()`](CommandFrame::to_bytes) always matches the
//! contents.
//!
//! ## Example
//!
//! ```rust
//! use instrument_link::bits::{Actuator, DutyChannel, Fan};
//! use instrument_link::command::CommandFrame;
//!
//! let mut frame = CommandFrame::new();
//! frame.set_actuator(Actuator::WhiteLed, true);
//! frame.set_duty_cycle(DutyChannel::White, 128);
//! frame.set_actuator(Actuator::Fan(Fan::One), false);
//!
//! assert!(frame.checksum_is_consistent());
//! assert_eq!(frame.actuator_enable_mask(), 0x05);
//! assert_eq!(frame.actuator_state_mask(), 0x01);
//! ```

use crate::bits::{Actuator, CuvetteCalibration, DutyChannel, assign};
use crate::checksum;
use crate::consts::{COMMAND_FRAME_LEN, COMMAND_HEADER, command_offset};
use crate::error::FrameError;

/// Outgoing command frame.
///
/// The header is not stored; it is constant and written on encode.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct CommandFrame {
    actuator_enable: u8,
    actuator_state: u8,
    duty_cycle_enable: u8,
    white_duty_cycle: u8,
    nir_duty_cycle: u8,
    cuvette_calibration: u8,
    checksum: u8,
}

impl Default for CommandFrame {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandFrame {
    /// Creates a frame in the same state [`reset()`](Self::reset) leaves it in.
    pub fn new() -> Self {
        let mut frame = Self {
            actuator_enable: 0,
            actuator_state: 0,
            duty_cycle_enable: 0,
            white_duty_cycle: 0,
            nir_duty_cycle: 0,
            cuvette_calibration: 0,
            checksum: 0,
        };
        frame.update_checksum();
        frame
    }

    /// Zeroes every field, keeping only the header, and recomputes the checksum.
    ///
    /// Enable bits accumulated during the previous cycle are discarded.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Authorizes `actuator` for this frame and sets its requested state.
    ///
    /// The enable bit stays set for every later frame until reset.
    pub fn set_actuator(&mut self, actuator: Actuator, on: bool) {
        let bit = actuator.bit();
        self.actuator_enable |= bit;
        assign(&mut self.actuator_state, bit, on);
        self.update_checksum();
    }

    /// Requests a PWM duty cycle (0-255) for an LED channel.
    pub fn set_duty_cycle(&mut self, channel: DutyChannel, value: u8) {
        self.duty_cycle_enable |= channel.enable_bit();
        match channel {
            DutyChannel::White => self.white_duty_cycle = value,
            DutyChannel::Nir => self.nir_duty_cycle = value,
        }
        self.update_checksum();
    }

    /// Requests (or cancels) a cuvette sensor calibration.
    pub fn set_cuvette_calibration(&mut self, calibration: CuvetteCalibration) {
        self.cuvette_calibration = calibration.bits();
        self.update_checksum();
    }

    /// Clears the actuator enable mask while keeping the requested states.
    ///
    /// The MCU ignores state bits whose enable bit is clear, so actuators stay
    /// as they are until one is set again. The duty-cycle enable mask is left
    /// alone.
    pub fn clear_actuator_enable_mask(&mut self) {
        self.actuator_enable = 0;
        self.update_checksum();
    }

    /// Which actuator bits this frame is authorized to modify.
    pub fn actuator_enable_mask(&self) -> u8 {
        self.actuator_enable
    }

    /// Requested on/off state per actuator bit.
    pub fn actuator_state_mask(&self) -> u8 {
        self.actuator_state
    }

    /// Which duty-cycle channels this frame sets.
    pub fn duty_cycle_enable_mask(&self) -> u8 {
        self.duty_cycle_enable
    }

    /// Requested duty cycle for `channel`.
    pub fn duty_cycle(&self, channel: DutyChannel) -> u8 {
        match channel {
            DutyChannel::White => self.white_duty_cycle,
            DutyChannel::Nir => self.nir_duty_cycle,
        }
    }

    /// Requested cuvette calibration.
    pub fn cuvette_calibration(&self) -> CuvetteCalibration {
        CuvetteCalibration::from_bits(self.cuvette_calibration)
    }

    /// Trailing checksum byte.
    pub fn checksum(&self) -> u8 {
        self.checksum
    }

    /// Recomputes the checksum over the encoded frame and compares it to the stored one.
    pub fn checksum_is_consistent(&self) -> bool {
        checksum::matches(&self.to_bytes())
    }

    /// Recomputes the checksum. Mutators already do this; the transaction
    /// layer calls it once more right before writing.
    pub fn finalize(&mut self) {
        self.update_checksum();
    }

    /// Encodes the frame for transmission.
    pub fn to_bytes(&self) -> [u8; COMMAND_FRAME_LEN] {
        let mut buf = self.body();
        buf[command_offset::CHECKSUM] = self.checksum;
        buf
    }

    /// The finalized byte image handed to the transport.
    pub fn as_bytes(&self) -> [u8; COMMAND_FRAME_LEN] {
        self.to_bytes()
    }

    /// Parses a command frame, as the MCU side of the link would.
    ///
    /// Reserved bytes are not carried over, so re-encoding a frame with
    /// non-zero reserved bytes does not reproduce the input.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FrameError> {
        if bytes.len() != COMMAND_FRAME_LEN {
            return Err(FrameError::Length {
                expected: COMMAND_FRAME_LEN,
                actual: bytes.len(),
            });
        }
        let header = [bytes[0], bytes[1]];
        if header != COMMAND_HEADER {
            return Err(FrameError::HeaderMismatch {
                expected: COMMAND_HEADER,
                actual: header,
            });
        }
        let expected = checksum::compute(&bytes[..command_offset::CHECKSUM]);
        let actual = bytes[command_offset::CHECKSUM];
        if expected != actual {
            return Err(FrameError::ChecksumMismatch { expected, actual });
        }

        let mut frame = Self {
            actuator_enable: bytes[command_offset::ACTUATOR_ENABLE],
            actuator_state: bytes[command_offset::ACTUATOR_STATE],
            duty_cycle_enable: bytes[command_offset::DUTY_CYCLE_ENABLE],
            white_duty_cycle: bytes[command_offset::WHITE_DUTY_CYCLE],
            nir_duty_cycle: bytes[command_offset::NIR_DUTY_CYCLE],
            cuvette_calibration: bytes[command_offset::CUVETTE_CALIBRATION],
            checksum: 0,
        };
        frame.update_checksum();
        Ok(frame)
    }

    // Encoded frame with the checksum position zeroed.
    fn body(&self) -> [u8; COMMAND_FRAME_LEN] {
        let mut buf = [0u8; COMMAND_FRAME_LEN];
        buf[..COMMAND_HEADER.len()].copy_from_slice(&COMMAND_HEADER);
        buf[command_offset::ACTUATOR_ENABLE] = self.actuator_enable;
        buf[command_offset::ACTUATOR_STATE] = self.actuator_state;
        buf[command_offset::DUTY_CYCLE_ENABLE] = self.duty_cycle_enable;
        buf[command_offset::WHITE_DUTY_CYCLE] = self.white_duty_cycle;
        buf[command_offset::NIR_DUTY_CYCLE] = self.nir_duty_cycle;
        buf[command_offset::CUVETTE_CALIBRATION] = self.cuvette_calibration;
        buf
    }

    fn update_checksum(&mut self) {
        self.checksum = checksum::compute(&self.body());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::Fan;

    #[test]
    fn test_new_frame_has_header_and_checksum() {
        let frame = CommandFrame::new();
        let bytes = frame.to_bytes();
        assert_eq!(&bytes[..2], &[0xc3, 0xa5]);
        assert!(bytes[2..15].iter().all(|&b| b == 0));
        assert_eq!(bytes[15], 0x68);
        assert!(frame.checksum_is_consistent());
    }

    #[test]
    fn test_reset_is_idempotent() {
        let mut frame = CommandFrame::new();
        frame.set_actuator(Actuator::NirLed, true);
        frame.set_duty_cycle(DutyChannel::Nir, 77);
        frame.reset();
        let once = frame.to_bytes();
        frame.reset();
        assert_eq!(frame.to_bytes(), once);
        assert_eq!(once, CommandFrame::new().to_bytes());
    }

    #[test]
    fn test_enable_mask_accumulates() {
        let mut frame = CommandFrame::new();
        frame.set_actuator(Actuator::WhiteLed, true);
        frame.set_actuator(Actuator::Fan(Fan::One), false);

        assert_eq!(frame.actuator_enable_mask(), 0x01 | 0x04);
        assert_eq!(frame.actuator_state_mask(), 0x01);

        frame.set_actuator(Actuator::WhiteLed, false);
        assert_eq!(frame.actuator_enable_mask(), 0x05);
        assert_eq!(frame.actuator_state_mask(), 0x00);
    }

    #[test]
    fn test_checksum_consistent_after_every_mutation() {
        let mut frame = CommandFrame::new();
        let steps: [fn(&mut CommandFrame); 7] = [
            |f| f.set_actuator(Actuator::WhiteLed, true),
            |f| f.set_actuator(Actuator::NirLed, true),
            |f| f.set_actuator(Actuator::Fan(Fan::Six), true),
            |f| f.set_duty_cycle(DutyChannel::White, 255),
            |f| f.set_duty_cycle(DutyChannel::Nir, 3),
            |f| f.set_cuvette_calibration(CuvetteCalibration::Empty),
            |f| f.clear_actuator_enable_mask(),
        ];
        for step in steps {
            step(&mut frame);
            assert!(frame.checksum_is_consistent());
        }
    }

    #[test]
    fn test_duty_cycle_layout() {
        let mut frame = CommandFrame::new();
        frame.set_duty_cycle(DutyChannel::White, 0x40);
        frame.set_duty_cycle(DutyChannel::Nir, 0x20);
        let bytes = frame.to_bytes();
        assert_eq!(bytes[5], 0x03);
        assert_eq!(bytes[6], 0x40);
        assert_eq!(bytes[7], 0x20);
        assert_eq!(frame.duty_cycle(DutyChannel::White), 0x40);
        assert_eq!(
            bytes[15],
            0xc3u8
                .wrapping_add(0xa5)
                .wrapping_add(0x03)
                .wrapping_add(0x40)
                .wrapping_add(0x20)
        );
    }

    #[test]
    fn test_clear_actuator_enable_mask_keeps_state_and_duty_enable() {
        let mut frame = CommandFrame::new();
        frame.set_actuator(Actuator::NirLed, true);
        frame.set_duty_cycle(DutyChannel::Nir, 9);
        frame.clear_actuator_enable_mask();
        assert_eq!(frame.actuator_enable_mask(), 0);
        assert_eq!(frame.actuator_state_mask(), 0x02);
        assert_eq!(frame.duty_cycle_enable_mask(), 0x02);
        assert_eq!(frame.duty_cycle(DutyChannel::Nir), 9);
        assert!(frame.checksum_is_consistent());
    }

    #[test]
    fn test_cuvette_calibration_byte() {
        let mut frame = CommandFrame::new();
        frame.set_cuvette_calibration(CuvetteCalibration::Full);
        assert_eq!(frame.to_bytes()[8], 0x02);
        assert_eq!(frame.cuvette_calibration(), CuvetteCalibration::Full);
        frame.set_cuvette_calibration(CuvetteCalibration::None);
        assert_eq!(frame.to_bytes()[8], 0x00);
    }

    #[test]
    fn test_from_bytes_accepts_encoded_frame() {
        let mut frame = CommandFrame::new();
        frame.set_actuator(Actuator::Fan(Fan::Three), true);
        frame.set_duty_cycle(DutyChannel::White, 200);
        let parsed = CommandFrame::from_bytes(&frame.to_bytes()).unwrap();
        assert_eq!(parsed, frame);
    }

    #[test]
    fn test_from_bytes_rejects_bad_frames() {
        let bytes = CommandFrame::new().to_bytes();

        assert_eq!(
            CommandFrame::from_bytes(&bytes[..15]),
            Err(FrameError::Length {
                expected: 16,
                actual: 15
            })
        );

        let mut bad_header = bytes;
        bad_header[1] = 0xa4;
        assert!(matches!(
            CommandFrame::from_bytes(&bad_header),
            Err(FrameError::HeaderMismatch { .. })
        ));

        let mut bad_sum = bytes;
        bad_sum[15] = bad_sum[15].wrapping_add(1);
        assert!(matches!(
            CommandFrame::from_bytes(&bad_sum),
            Err(FrameError::ChecksumMismatch { .. })
        ));
    }
}
