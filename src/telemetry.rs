//! MCU → host telemetry frames.
//!
//! A [`TelemetryFrame`] is the 32 byte record the MCU returns after each
//! command frame. Its layout:
//!
//! | Offset | Field |
//! |--------|-------|
//! | 0-1    | header `0x5A 0x3C` |
//! | 2      | protocol version |
//! | 3      | status: white LED, NIR LED, reserved ×2, cuvette 1-3, lid switch |
//! | 4      | buttons 1-6, reserved ×2 |
//! | 5      | fans 1-6 running, reserved ×2 |
//! | 6-13   | thermistors 1-4 (`u16` LE) |
//! | 14-17  | thermopiles 1-2 (`u16` LE) |
//! | 18-21  | photodiodes 1-2 (`u16` LE) |
//! | 22, 23 | white / NIR duty cycle readback |
//! | 24-29  | cuvette sensors 1-3 (`u16` LE) |
//! | 30     | reserved |
//! | 31     | checksum |
//!
//! A frame can only be obtained from wire bytes through
//! [`TelemetryFrame::from_bytes`], which rejects anything with the wrong length,
//! header or checksum. Decoded values of a rejected buffer are never exposed.
//!
//! The temperature conversions are device calibration constants and are
//! applied exactly as given.

use crate::bits::{
    Button, Cuvette, Fan, STATUS_LID_SWITCH, STATUS_NIR_LED, STATUS_WHITE_LED, assign, is_set,
};
use crate::checksum;
use crate::consts::{
    PROTOCOL_VERSION, TELEMETRY_FRAME_LEN, TELEMETRY_HEADER, telemetry_offset,
};
use crate::error::FrameError;

/// Number of 16-bit sensor words in a telemetry frame.
pub const SENSOR_WORD_COUNT: usize = 11;

/// A 16-bit little-endian sensor word in the telemetry frame.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum SensorWord {
    /// Thermistor 1
    Thermistor1,
    /// Thermistor 2
    Thermistor2,
    /// Thermistor 3
    Thermistor3,
    /// Thermistor 4
    Thermistor4,
    /// Thermopile 1
    Thermopile1,
    /// Thermopile 2
    Thermopile2,
    /// Photodiode 1
    Photodiode1,
    /// Photodiode 2
    Photodiode2,
    /// Cuvette sensor 1
    CuvetteSensor1,
    /// Cuvette sensor 2
    CuvetteSensor2,
    /// Cuvette sensor 3
    CuvetteSensor3,
}

impl SensorWord {
    /// All sensor words, in wire order.
    pub const ALL: [SensorWord; SENSOR_WORD_COUNT] = [
        SensorWord::Thermistor1,
        SensorWord::Thermistor2,
        SensorWord::Thermistor3,
        SensorWord::Thermistor4,
        SensorWord::Thermopile1,
        SensorWord::Thermopile2,
        SensorWord::Photodiode1,
        SensorWord::Photodiode2,
        SensorWord::CuvetteSensor1,
        SensorWord::CuvetteSensor2,
        SensorWord::CuvetteSensor3,
    ];

    /// Byte offset of the low byte.
    pub fn offset(self) -> usize {
        match self {
            SensorWord::Thermistor1 => 6,
            SensorWord::Thermistor2 => 8,
            SensorWord::Thermistor3 => 10,
            SensorWord::Thermistor4 => 12,
            SensorWord::Thermopile1 => 14,
            SensorWord::Thermopile2 => 16,
            SensorWord::Photodiode1 => 18,
            SensorWord::Photodiode2 => 20,
            SensorWord::CuvetteSensor1 => 24,
            SensorWord::CuvetteSensor2 => 26,
            SensorWord::CuvetteSensor3 => 28,
        }
    }

    /// The sensor word for a cuvette slot.
    pub fn cuvette(cuvette: Cuvette) -> Self {
        match cuvette {
            Cuvette::One => SensorWord::CuvetteSensor1,
            Cuvette::Two => SensorWord::CuvetteSensor2,
            Cuvette::Three => SensorWord::CuvetteSensor3,
        }
    }

    fn index(self) -> usize {
        match self {
            SensorWord::Thermistor1 => 0,
            SensorWord::Thermistor2 => 1,
            SensorWord::Thermistor3 => 2,
            SensorWord::Thermistor4 => 3,
            SensorWord::Thermopile1 => 4,
            SensorWord::Thermopile2 => 5,
            SensorWord::Photodiode1 => 6,
            SensorWord::Photodiode2 => 7,
            SensorWord::CuvetteSensor1 => 8,
            SensorWord::CuvetteSensor2 => 9,
            SensorWord::CuvetteSensor3 => 10,
        }
    }
}

// Thermistors 1 and 4.
const THERMISTOR_A_SCALE: f64 = 0.06;
const THERMISTOR_A_OFFSET: f64 = 156.58;
// Thermistors 2 and 3.
const THERMISTOR_B_SCALE: f64 = 0.0058;
const THERMISTOR_B_OFFSET: f64 = 281.5;
const THERMOPILE_ZERO: f64 = 11_748.0; // 0x2DE4
const THERMOPILE_SCALE: f64 = 0.02;
const THERMOPILE_OFFSET: f64 = 38.2;

/// A validated telemetry snapshot.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct TelemetryFrame {
    protocol_version: u8,
    status: u8,
    buttons: u8,
    fans: u8,
    words: [u16; SENSOR_WORD_COUNT],
    white_duty_readback: u8,
    nir_duty_readback: u8,
    reserved: u8,
    checksum: u8,
}

impl TelemetryFrame {
    /// Checks a raw buffer without decoding it.
    ///
    /// Returns `true` only if the buffer is one frame long, both header bytes
    /// match and the checksum matches.
    pub fn is_valid(buffer: &[u8]) -> bool {
        Self::validate(buffer).is_ok()
    }

    /// Like [`is_valid`](Self::is_valid), but reports why a buffer is rejected.
    pub fn validate(buffer: &[u8]) -> Result<(), FrameError> {
        if buffer.len() != TELEMETRY_FRAME_LEN {
            return Err(FrameError::Length {
                expected: TELEMETRY_FRAME_LEN,
                actual: buffer.len(),
            });
        }
        let header = [buffer[0], buffer[1]];
        if header != TELEMETRY_HEADER {
            return Err(FrameError::HeaderMismatch {
                expected: TELEMETRY_HEADER,
                actual: header,
            });
        }
        let expected = checksum::compute(&buffer[..telemetry_offset::CHECKSUM]);
        let actual = buffer[telemetry_offset::CHECKSUM];
        if expected != actual {
            return Err(FrameError::ChecksumMismatch { expected, actual });
        }
        Ok(())
    }

    /// Validates `buffer` and decodes it.
    pub fn from_bytes(buffer: &[u8]) -> Result<Self, FrameError> {
        Self::validate(buffer)?;

        let mut words = [0u16; SENSOR_WORD_COUNT];
        for word in SensorWord::ALL {
            let at = word.offset();
            words[word.index()] = u16::from_le_bytes([buffer[at], buffer[at + 1]]);
        }
        Ok(Self {
            protocol_version: buffer[telemetry_offset::PROTOCOL_VERSION],
            status: buffer[telemetry_offset::STATUS],
            buttons: buffer[telemetry_offset::BUTTONS],
            fans: buffer[telemetry_offset::FANS],
            words,
            white_duty_readback: buffer[telemetry_offset::WHITE_DUTY_READBACK],
            nir_duty_readback: buffer[telemetry_offset::NIR_DUTY_READBACK],
            reserved: buffer[telemetry_offset::RESERVED],
            checksum: buffer[telemetry_offset::CHECKSUM],
        })
    }

    /// Finds the last valid frame inside a received chunk.
    ///
    /// Noise or a partial frame ahead of the reply is skipped: every offset
    /// holding the header is checked with [`validate`](Self::validate) and the
    /// frame at the highest passing offset wins. Nothing outside `buffer` is
    /// considered.
    ///
    /// # Returns
    /// - `Ok(frame)` for the last window that validates
    /// - `Err(FrameError::Length)` if `buffer` is shorter than one frame
    /// - the rejection of the last header candidate when none validates, or a
    ///   header mismatch on the first two bytes when there is no candidate
    pub fn scan(buffer: &[u8]) -> Result<Self, FrameError> {
        if buffer.len() < TELEMETRY_FRAME_LEN {
            return Err(FrameError::Length {
                expected: TELEMETRY_FRAME_LEN,
                actual: buffer.len(),
            });
        }

        let mut rejected = None;
        for start in (0..=buffer.len() - TELEMETRY_FRAME_LEN).rev() {
            let window = &buffer[start..start + TELEMETRY_FRAME_LEN];
            if window[..TELEMETRY_HEADER.len()] != TELEMETRY_HEADER {
                continue;
            }
            match Self::from_bytes(window) {
                Ok(frame) => return Ok(frame),
                Err(err) => {
                    if rejected.is_none() {
                        rejected = Some(err);
                    }
                }
            }
        }

        Err(rejected.unwrap_or(FrameError::HeaderMismatch {
            expected: TELEMETRY_HEADER,
            actual: [buffer[0], buffer[1]],
        }))
    }

    /// Re-encodes the wire image.
    pub fn to_bytes(&self) -> [u8; TELEMETRY_FRAME_LEN] {
        let mut buf = self.body();
        buf[telemetry_offset::CHECKSUM] = self.checksum;
        buf
    }

    fn body(&self) -> [u8; TELEMETRY_FRAME_LEN] {
        let mut buf = [0u8; TELEMETRY_FRAME_LEN];
        buf[..TELEMETRY_HEADER.len()].copy_from_slice(&TELEMETRY_HEADER);
        buf[telemetry_offset::PROTOCOL_VERSION] = self.protocol_version;
        buf[telemetry_offset::STATUS] = self.status;
        buf[telemetry_offset::BUTTONS] = self.buttons;
        buf[telemetry_offset::FANS] = self.fans;
        for word in SensorWord::ALL {
            let at = word.offset();
            buf[at..at + 2].copy_from_slice(&self.words[word.index()].to_le_bytes());
        }
        buf[telemetry_offset::WHITE_DUTY_READBACK] = self.white_duty_readback;
        buf[telemetry_offset::NIR_DUTY_READBACK] = self.nir_duty_readback;
        buf[telemetry_offset::RESERVED] = self.reserved;
        buf
    }

    /// Protocol version declared by the MCU.
    pub fn protocol_version(&self) -> u8 {
        self.protocol_version
    }

    /// Raw value of a sensor word.
    pub fn raw(&self, word: SensorWord) -> u16 {
        self.words[word.index()]
    }

    /// Thermistor 1, °C.
    pub fn thermistor_1(&self) -> f64 {
        thermistor_a(self.raw(SensorWord::Thermistor1))
    }

    /// Thermistor 2, °C.
    pub fn thermistor_2(&self) -> f64 {
        thermistor_b(self.raw(SensorWord::Thermistor2))
    }

    /// Thermistor 3, °C.
    pub fn thermistor_3(&self) -> f64 {
        thermistor_b(self.raw(SensorWord::Thermistor3))
    }

    /// Thermistor 4, °C.
    pub fn thermistor_4(&self) -> f64 {
        thermistor_a(self.raw(SensorWord::Thermistor4))
    }

    /// Thermopile 1, °C.
    pub fn thermopile_1(&self) -> f64 {
        thermopile(self.raw(SensorWord::Thermopile1))
    }

    /// Thermopile 2, °C.
    pub fn thermopile_2(&self) -> f64 {
        thermopile(self.raw(SensorWord::Thermopile2))
    }

    /// Photodiode 1, unscaled.
    pub fn photodiode_1(&self) -> u16 {
        self.raw(SensorWord::Photodiode1)
    }

    /// Photodiode 2, unscaled.
    pub fn photodiode_2(&self) -> u16 {
        self.raw(SensorWord::Photodiode2)
    }

    /// Cuvette sensor 1, unscaled.
    pub fn cuvette_sensor_1(&self) -> u16 {
        self.raw(SensorWord::CuvetteSensor1)
    }

    /// Cuvette sensor 2, unscaled.
    pub fn cuvette_sensor_2(&self) -> u16 {
        self.raw(SensorWord::CuvetteSensor2)
    }

    /// Cuvette sensor 3, unscaled.
    pub fn cuvette_sensor_3(&self) -> u16 {
        self.raw(SensorWord::CuvetteSensor3)
    }

    /// Cuvette sensor reading for a slot, unscaled.
    pub fn cuvette_sensor(&self, cuvette: Cuvette) -> u16 {
        self.raw(SensorWord::cuvette(cuvette))
    }

    /// White LED duty cycle as applied by the MCU.
    pub fn white_duty_cycle_readback(&self) -> u8 {
        self.white_duty_readback
    }

    /// NIR LED duty cycle as applied by the MCU.
    pub fn nir_duty_cycle_readback(&self) -> u8 {
        self.nir_duty_readback
    }

    /// Raw status mask (byte 3).
    pub fn status_mask(&self) -> u8 {
        self.status
    }

    /// Raw button mask (byte 4).
    pub fn button_mask(&self) -> u8 {
        self.buttons
    }

    /// Raw fan mask (byte 5).
    pub fn fan_mask(&self) -> u8 {
        self.fans
    }

    /// Trailing checksum byte.
    pub fn checksum(&self) -> u8 {
        self.checksum
    }

    /// White LED reported on.
    pub fn white_led_on(&self) -> bool {
        is_set(self.status, STATUS_WHITE_LED)
    }

    /// NIR LED reported on.
    pub fn nir_led_on(&self) -> bool {
        is_set(self.status, STATUS_NIR_LED)
    }

    /// The MCU's own cuvette presence bit for a slot.
    pub fn cuvette_present(&self, cuvette: Cuvette) -> bool {
        is_set(self.status, cuvette.status_bit())
    }

    /// Lid switch bit.
    pub fn lid_switch(&self) -> bool {
        is_set(self.status, STATUS_LID_SWITCH)
    }

    /// Whether a front-panel button is held.
    pub fn button_pressed(&self, button: Button) -> bool {
        is_set(self.buttons, button.status_bit())
    }

    /// Whether a fan reports running.
    pub fn fan_running(&self, fan: Fan) -> bool {
        is_set(self.fans, fan.status_bit())
    }
}

fn thermistor_a(raw: u16) -> f64 {
    f64::from(raw) * THERMISTOR_A_SCALE - THERMISTOR_A_OFFSET
}

fn thermistor_b(raw: u16) -> f64 {
    f64::from(raw) * THERMISTOR_B_SCALE - THERMISTOR_B_OFFSET
}

fn thermopile(raw: u16) -> f64 {
    (f64::from(raw) - THERMOPILE_ZERO) * THERMOPILE_SCALE - THERMOPILE_OFFSET
}

/// Assembles telemetry frames the way the MCU would, for simulation and tests.
///
/// Starts from an all-zero frame with the header and the current protocol
/// version. [`build()`](Self::build) computes the checksum.
///
/// ```rust
/// use instrument_link::bits::Fan;
/// use instrument_link::telemetry::{SensorWord, TelemetryFrame, TelemetryFrameBuilder};
///
/// let frame = TelemetryFrameBuilder::new()
///     .word(SensorWord::Thermistor1, 2610)
///     .fan(Fan::One, true)
///     .build();
/// assert!(TelemetryFrame::is_valid(&frame.to_bytes()));
/// assert!(frame.fan_running(Fan::One));
/// ```
#[derive(Clone, Copy, Debug)]
pub struct TelemetryFrameBuilder {
    frame: TelemetryFrame,
}

impl Default for TelemetryFrameBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryFrameBuilder {
    /// A blank frame with header and protocol version set.
    pub fn new() -> Self {
        Self {
            frame: TelemetryFrame {
                protocol_version: PROTOCOL_VERSION,
                status: 0,
                buttons: 0,
                fans: 0,
                words: [0; SENSOR_WORD_COUNT],
                white_duty_readback: 0,
                nir_duty_readback: 0,
                reserved: 0,
                checksum: 0,
            },
        }
    }

    /// Sets the protocol version byte.
    pub fn protocol_version(mut self, version: u8) -> Self {
        self.frame.protocol_version = version;
        self
    }

    /// Sets a raw sensor word.
    pub fn word(mut self, word: SensorWord, raw: u16) -> Self {
        self.frame.words[word.index()] = raw;
        self
    }

    /// Sets the white LED status bit.
    pub fn white_led(mut self, on: bool) -> Self {
        assign(&mut self.frame.status, STATUS_WHITE_LED, on);
        self
    }

    /// Sets the NIR LED status bit.
    pub fn nir_led(mut self, on: bool) -> Self {
        assign(&mut self.frame.status, STATUS_NIR_LED, on);
        self
    }

    /// Sets a cuvette presence bit.
    pub fn cuvette_present(mut self, cuvette: Cuvette, present: bool) -> Self {
        assign(&mut self.frame.status, cuvette.status_bit(), present);
        self
    }

    /// Sets the lid switch bit.
    pub fn lid_switch(mut self, on: bool) -> Self {
        assign(&mut self.frame.status, STATUS_LID_SWITCH, on);
        self
    }

    /// Sets a button bit.
    pub fn button(mut self, button: Button, pressed: bool) -> Self {
        assign(&mut self.frame.buttons, button.status_bit(), pressed);
        self
    }

    /// Sets a fan running bit.
    pub fn fan(mut self, fan: Fan, running: bool) -> Self {
        assign(&mut self.frame.fans, fan.status_bit(), running);
        self
    }

    /// Sets both duty cycle readback bytes.
    pub fn duty_readback(mut self, white: u8, nir: u8) -> Self {
        self.frame.white_duty_readback = white;
        self.frame.nir_duty_readback = nir;
        self
    }

    /// Finalizes the checksum.
    pub fn build(mut self) -> TelemetryFrame {
        self.frame.checksum = checksum::compute(&self.frame.body());
        self.frame
    }
}
