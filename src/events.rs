//! State change events derived from consecutive telemetry frames.
//!
//! The MCU reports levels, not edges. [`state_events`] compares a frame with
//! the one before it and reports what changed.

#[cfg(not(feature = "std"))]
use heapless::Vec;
#[cfg(feature = "std")]
use std::vec::Vec;

use crate::bits::{Button, Fan};
use crate::telemetry::TelemetryFrame;

/// Upper bound on events produced by one comparison.
///
/// Six buttons, six fans, one lid switch.
pub const MAX_STATE_EVENTS: usize = 13;

/// Events produced by one call to [`state_events`].
#[cfg(not(feature = "std"))]
pub type StateEvents = Vec<StateEvent, MAX_STATE_EVENTS>;

/// Events produced by one call to [`state_events`].
#[cfg(feature = "std")]
pub type StateEvents = Vec<StateEvent>;

/// A change between two telemetry frames.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum StateEvent {
    /// A button went from released to pressed.
    ButtonPressed(Button),
    /// A fan started reporting running.
    FanStarted(Fan),
    /// A fan stopped reporting running.
    FanStopped(Fan),
    /// The lid switch bit changed to the carried value.
    LidSwitchChanged(bool),
}

/// Lists the changes from `previous` to `current`.
///
/// Without a previous frame every pressed button counts as newly pressed and
/// fan or lid levels are not reported, since there is nothing to compare
/// against. Events come out in a fixed order: buttons, fans, lid.
pub fn state_events(previous: Option<&TelemetryFrame>, current: &TelemetryFrame) -> StateEvents {
    let mut events = StateEvents::new();

    for button in Button::ALL {
        let was_pressed = previous.is_some_and(|p| p.button_pressed(button));
        if current.button_pressed(button) && !was_pressed {
            push(&mut events, StateEvent::ButtonPressed(button));
        }
    }

    let Some(previous) = previous else {
        return events;
    };

    for fan in Fan::ALL {
        match (previous.fan_running(fan), current.fan_running(fan)) {
            (false, true) => push(&mut events, StateEvent::FanStarted(fan)),
            (true, false) => push(&mut events, StateEvent::FanStopped(fan)),
            _ => {}
        }
    }

    if previous.lid_switch() != current.lid_switch() {
        push(&mut events, StateEvent::LidSwitchChanged(current.lid_switch()));
    }

    events
}

#[cfg(not(feature = "std"))]
fn push(events: &mut StateEvents, event: StateEvent) {
    // Capacity covers every event one comparison can produce.
    let _ = events.push(event);
}

#[cfg(feature = "std")]
fn push(events: &mut StateEvents, event: StateEvent) {
    events.push(event);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::TelemetryFrameBuilder;

    #[test]
    fn test_first_frame_reports_held_buttons_only() {
        let frame = TelemetryFrameBuilder::new()
            .button(Button::TopRight, true)
            .fan(Fan::One, true)
            .lid_switch(true)
            .build();
        let events = state_events(None, &frame);
        assert_eq!(&events[..], &[StateEvent::ButtonPressed(Button::TopRight)]);
    }

    #[test]
    fn test_held_button_is_not_repeated() {
        let frame = TelemetryFrameBuilder::new()
            .button(Button::MiddleLeft, true)
            .build();
        assert!(state_events(Some(&frame), &frame).is_empty());
    }

    #[test]
    fn test_fan_and_lid_edges() {
        let before = TelemetryFrameBuilder::new()
            .fan(Fan::One, true)
            .fan(Fan::Two, true)
            .build();
        let after = TelemetryFrameBuilder::new()
            .fan(Fan::Two, true)
            .fan(Fan::Five, true)
            .lid_switch(true)
            .button(Button::BottomLeft, true)
            .build();
        let events = state_events(Some(&before), &after);
        assert_eq!(
            &events[..],
            &[
                StateEvent::ButtonPressed(Button::BottomLeft),
                StateEvent::FanStopped(Fan::One),
                StateEvent::FanStarted(Fan::Five),
                StateEvent::LidSwitchChanged(true),
            ]
        );
    }

    #[test]
    fn test_every_edge_at_once_fits() {
        let before = TelemetryFrameBuilder::new()
            .fan(Fan::One, true)
            .fan(Fan::Three, true)
            .fan(Fan::Five, true)
            .build();
        let mut after = TelemetryFrameBuilder::new()
            .fan(Fan::Two, true)
            .fan(Fan::Four, true)
            .fan(Fan::Six, true)
            .lid_switch(true);
        for button in Button::ALL {
            after = after.button(button, true);
        }
        let events = state_events(Some(&before), &after.build());
        assert_eq!(events.len(), MAX_STATE_EVENTS);
    }
}
