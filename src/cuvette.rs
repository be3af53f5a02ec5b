//! Cuvette position detection from the raw cuvette sensor words.
//!
//! The three cuvette sensors read lower when a cuvette blocks them. Thresholds
//! are taken from an empty-chamber reading scaled down by a margin factor: a
//! sensor at or below its threshold counts as blocked.
//!
//! Cuvettes are inserted from slot 1 upwards, so only the prefixes
//! `{}`, `{1}`, `{1, 2}` and `{1, 2, 3}` map to a position; any other blocked
//! set is [`CuvettePosition::Indeterminate`].

use libm::rint;

use crate::bits::Cuvette;
use crate::telemetry::TelemetryFrame;

/// Where the cuvette sits, as judged from the sensor readings.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum CuvettePosition {
    /// No sensor blocked
    Empty,
    /// Only sensor 1 blocked
    One,
    /// Sensors 1 and 2 blocked
    Two,
    /// All three sensors blocked
    Three,
    /// A blocked pattern that no seated cuvette produces
    Indeterminate,
}

/// Per-sensor blocked thresholds.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct CuvetteThresholds {
    /// Threshold for sensors 1, 2 and 3.
    pub sensor: [u16; 3],
}

impl CuvetteThresholds {
    /// Fixed thresholds.
    pub fn new(sensor: [u16; 3]) -> Self {
        Self { sensor }
    }

    /// Derives thresholds from a frame taken with the chamber empty.
    ///
    /// Each threshold is the empty reading times `factor`, rounded to the
    /// nearest integer with ties to even and saturated to the `u16` range.
    pub fn from_empty_chamber(frame: &TelemetryFrame, factor: f64) -> Self {
        let mut sensor = [0u16; 3];
        for (i, cuvette) in Cuvette::ALL.into_iter().enumerate() {
            let scaled = rint(f64::from(frame.cuvette_sensor(cuvette)) * factor);
            sensor[i] = scaled.clamp(0.0, f64::from(u16::MAX)) as u16;
        }
        Self { sensor }
    }

    /// Threshold for one slot.
    pub fn threshold(&self, cuvette: Cuvette) -> u16 {
        match cuvette {
            Cuvette::One => self.sensor[0],
            Cuvette::Two => self.sensor[1],
            Cuvette::Three => self.sensor[2],
        }
    }

    /// Whether the sensor for `cuvette` reads blocked.
    pub fn is_blocked(&self, frame: &TelemetryFrame, cuvette: Cuvette) -> bool {
        frame.cuvette_sensor(cuvette) <= self.threshold(cuvette)
    }

    /// Judges the cuvette position from one frame.
    pub fn position(&self, frame: &TelemetryFrame) -> CuvettePosition {
        let blocked = (
            self.is_blocked(frame, Cuvette::One),
            self.is_blocked(frame, Cuvette::Two),
            self.is_blocked(frame, Cuvette::Three),
        );
        match blocked {
            (false, false, false) => CuvettePosition::Empty,
            (true, false, false) => CuvettePosition::One,
            (true, true, false) => CuvettePosition::Two,
            (true, true, true) => CuvettePosition::Three,
            _ => CuvettePosition::Indeterminate,
        }
    }

    /// All three sensors read above their thresholds.
    pub fn chamber_empty(&self, frame: &TelemetryFrame) -> bool {
        self.position(frame) == CuvettePosition::Empty
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::{SensorWord, TelemetryFrameBuilder};

    fn readings(s1: u16, s2: u16, s3: u16) -> TelemetryFrame {
        TelemetryFrameBuilder::new()
            .word(SensorWord::CuvetteSensor1, s1)
            .word(SensorWord::CuvetteSensor2, s2)
            .word(SensorWord::CuvetteSensor3, s3)
            .build()
    }

    #[test]
    fn test_thresholds_from_empty_chamber() {
        let empty = readings(1000, 2001, 65535);
        let thresholds = CuvetteThresholds::from_empty_chamber(&empty, 0.5);
        assert_eq!(thresholds.sensor, [500, 1000, 32768]);

        // halves go to the even neighbour
        let ties = CuvetteThresholds::from_empty_chamber(&readings(1001, 1003, 5), 0.5);
        assert_eq!(ties.sensor, [500, 502, 2]);

        let clamped = CuvetteThresholds::from_empty_chamber(&empty, 2.0);
        assert_eq!(clamped.threshold(Cuvette::Three), u16::MAX);
    }

    #[test]
    fn test_empty_reference_is_not_blocked() {
        let empty = readings(1000, 1000, 1000);
        let thresholds = CuvetteThresholds::from_empty_chamber(&empty, 0.8);
        assert!(thresholds.chamber_empty(&empty));
    }

    #[test]
    fn test_positions() {
        let thresholds = CuvetteThresholds::new([500, 500, 500]);
        assert_eq!(thresholds.position(&readings(900, 900, 900)), CuvettePosition::Empty);
        assert_eq!(thresholds.position(&readings(500, 900, 900)), CuvettePosition::One);
        assert_eq!(thresholds.position(&readings(100, 200, 900)), CuvettePosition::Two);
        assert_eq!(thresholds.position(&readings(0, 0, 0)), CuvettePosition::Three);
        assert_eq!(
            thresholds.position(&readings(900, 100, 900)),
            CuvettePosition::Indeterminate
        );
        assert!(!thresholds.chamber_empty(&readings(900, 900, 10)));
    }
}
