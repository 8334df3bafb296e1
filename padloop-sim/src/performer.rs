//! Scripted player on its own thread, standing in for the pad scanner.

use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::Sender;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    PadDown { pad: u8, velocity: u8 },
    PadUp { pad: u8 },
    RecordButton,
    ControlChange { controller: u8, value: u8 },
    PitchBend { value: i16 },
    CycleArpPattern,
    RestartLoop,
}

/// (wait before, event)
type Step = (u64, InputEvent);

/// Records a short phrase, lets it loop, then plays the arpeggiator over it.
fn script() -> Vec<Step> {
    use InputEvent::*;
    vec![
        (200, RecordButton),
        (50, PadDown { pad: 0, velocity: 100 }),
        (180, PadUp { pad: 0 }),
        (20, PadDown { pad: 2, velocity: 90 }),
        (10, ControlChange { controller: 74, value: 40 }),
        (170, PadUp { pad: 2 }),
        (20, PadDown { pad: 4, velocity: 110 }),
        (50, PitchBend { value: 2048 }),
        (100, PitchBend { value: 0 }),
        (30, PadUp { pad: 4 }),
        (220, RecordButton),
        (1_500, RecordButton),
        (300, RestartLoop),
        (400, CycleArpPattern),
        (100, PadDown { pad: 5, velocity: 80 }),
        (0, PadDown { pad: 7, velocity: 80 }),
        (0, PadDown { pad: 9, velocity: 80 }),
        (1_600, PadUp { pad: 5 }),
        (0, PadUp { pad: 7 }),
        (0, PadUp { pad: 9 }),
        (200, CycleArpPattern),
        (0, CycleArpPattern),
        (0, CycleArpPattern),
        (0, CycleArpPattern),
    ]
}

/// Play the script into `tx`. The thread ends when the script does or when
/// the receiver goes away.
pub fn spawn(tx: Sender<InputEvent>) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("performer".into())
        .spawn(move || {
            for (wait_ms, event) in script() {
                if wait_ms > 0 {
                    thread::sleep(Duration::from_millis(wait_ms));
                }
                if tx.send(event).is_err() {
                    return;
                }
            }
            log::debug!(target: "performer", "script finished");
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_balances_pads_and_patterns() {
        let steps = script();
        let downs = steps
            .iter()
            .filter(|(_, e)| matches!(e, InputEvent::PadDown { .. }))
            .count();
        let ups = steps
            .iter()
            .filter(|(_, e)| matches!(e, InputEvent::PadUp { .. }))
            .count();
        assert_eq!(downs, ups);

        // Five patterns: cycling five times returns to off.
        let cycles = steps
            .iter()
            .filter(|(_, e)| *e == InputEvent::CycleArpPattern)
            .count();
        assert_eq!(cycles % 5, 0);
    }
}
