//! Bit assignments for the command and telemetry bitfields.
//!
//! The command frame and the telemetry frame do not share a layout: fan 1 is
//! `0x04` in the command actuator masks but `0x01` in the telemetry fan mask.
//! Each enum here knows its own masks so the frame modules never spell out a
//! bit position.

/// Tests `bit` against `mask`.
///
/// Every status check in the crate goes through this helper, so multi-bit
/// masks are only reported as set when all of their bits are set.
#[inline]
pub(crate) fn is_set(mask: u8, bit: u8) -> bool {
    (mask & bit) == bit
}

/// Sets or clears `bit` in `mask`.
#[inline]
pub(crate) fn assign(mask: &mut u8, bit: u8, on: bool) {
    if on {
        *mask |= bit;
    } else {
        *mask &= !bit;
    }
}

/// One of the six chassis fans.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum Fan {
    /// Fan 1
    One,
    /// Fan 2
    Two,
    /// Fan 3
    Three,
    /// Fan 4
    Four,
    /// Fan 5
    Five,
    /// Fan 6
    Six,
}

impl Fan {
    /// All fans, in bit order.
    pub const ALL: [Fan; 6] = [Fan::One, Fan::Two, Fan::Three, Fan::Four, Fan::Five, Fan::Six];

    fn index(self) -> u8 {
        match self {
            Fan::One => 0,
            Fan::Two => 1,
            Fan::Three => 2,
            Fan::Four => 3,
            Fan::Five => 4,
            Fan::Six => 5,
        }
    }

    /// Bit in the command frame's actuator enable/state masks.
    pub fn command_bit(self) -> u8 {
        0x04 << self.index()
    }

    /// Bit in the telemetry frame's fan mask.
    pub fn status_bit(self) -> u8 {
        0x01 << self.index()
    }
}

/// An actuator the host can switch on or off through a command frame.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum Actuator {
    /// White illumination LED
    WhiteLed,
    /// Near-infrared illumination LED
    NirLed,
    /// One of the chassis fans
    Fan(Fan),
}

impl Actuator {
    /// Bit in the command frame's actuator enable/state masks.
    pub fn bit(self) -> u8 {
        match self {
            Actuator::WhiteLed => 0x01,
            Actuator::NirLed => 0x02,
            Actuator::Fan(fan) => fan.command_bit(),
        }
    }
}

/// An LED channel with a PWM duty cycle.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum DutyChannel {
    /// White LED
    White,
    /// Near-infrared LED
    Nir,
}

impl DutyChannel {
    /// Bit in the command frame's duty-cycle enable mask.
    pub fn enable_bit(self) -> u8 {
        match self {
            DutyChannel::White => 0x01,
            DutyChannel::Nir => 0x02,
        }
    }
}

/// One of the six front-panel buttons.
///
/// Buttons 1-3 run top to bottom on the left column, 4-6 top to bottom on the
/// right column.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum Button {
    /// Top left
    TopLeft,
    /// Middle left
    MiddleLeft,
    /// Bottom left
    BottomLeft,
    /// Top right
    TopRight,
    /// Middle right
    MiddleRight,
    /// Bottom right
    BottomRight,
}

impl Button {
    /// All buttons, in bit order.
    pub const ALL: [Button; 6] = [
        Button::TopLeft,
        Button::MiddleLeft,
        Button::BottomLeft,
        Button::TopRight,
        Button::MiddleRight,
        Button::BottomRight,
    ];

    /// Bit in the telemetry frame's button mask.
    pub fn status_bit(self) -> u8 {
        match self {
            Button::TopLeft => 0x01,
            Button::MiddleLeft => 0x02,
            Button::BottomLeft => 0x04,
            Button::TopRight => 0x08,
            Button::MiddleRight => 0x10,
            Button::BottomRight => 0x20,
        }
    }
}

/// One of the three cuvette slots.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum Cuvette {
    /// Slot 1
    One,
    /// Slot 2
    Two,
    /// Slot 3
    Three,
}

impl Cuvette {
    /// All cuvette slots, in bit order.
    pub const ALL: [Cuvette; 3] = [Cuvette::One, Cuvette::Two, Cuvette::Three];

    /// Bit in the telemetry frame's status mask.
    pub fn status_bit(self) -> u8 {
        match self {
            Cuvette::One => 0x10,
            Cuvette::Two => 0x20,
            Cuvette::Three => 0x40,
        }
    }
}

/// Status mask bit for the white LED.
pub const STATUS_WHITE_LED: u8 = 0x01;
/// Status mask bit for the NIR LED.
pub const STATUS_NIR_LED: u8 = 0x02;
/// Status mask bit for the lid switch.
pub const STATUS_LID_SWITCH: u8 = 0x80;

/// Cuvette sensor calibration request carried in the command frame.
///
/// The MCU samples the cuvette sensors as its empty (or full) reference when
/// the matching bit is set.
#[derive(PartialEq, Eq, Clone, Copy, Default, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum CuvetteCalibration {
    /// No calibration requested.
    #[default]
    None,
    /// Calibrate against an empty chamber.
    Empty,
    /// Calibrate against a full chamber.
    Full,
}

impl CuvetteCalibration {
    /// Request bit for an empty-chamber calibration.
    pub const EMPTY_BIT: u8 = 0x01;
    /// Request bit for a full-chamber calibration.
    pub const FULL_BIT: u8 = 0x02;

    /// Encoded calibration byte.
    pub fn bits(self) -> u8 {
        match self {
            CuvetteCalibration::None => 0,
            CuvetteCalibration::Empty => Self::EMPTY_BIT,
            CuvetteCalibration::Full => Self::FULL_BIT,
        }
    }

    /// Decodes a calibration byte. Both bits set is not a valid request and
    /// decodes as `None`.
    pub fn from_bits(bits: u8) -> Self {
        match (is_set(bits, Self::EMPTY_BIT), is_set(bits, Self::FULL_BIT)) {
            (true, false) => CuvetteCalibration::Empty,
            (false, true) => CuvetteCalibration::Full,
            _ => CuvetteCalibration::None,
        }
    }
}
