use padloop_core::NoteSink;

/// Sound output that writes every message to the log.
#[derive(Debug, Default)]
pub struct LogSink {
    notes_started: u64,
    panics: u64,
}

impl LogSink {
    pub fn notes_started(&self) -> u64 {
        self.notes_started
    }

    pub fn panics(&self) -> u64 {
        self.panics
    }
}

impl NoteSink for LogSink {
    fn note_on(&mut self, note: u8, velocity: u8) {
        self.notes_started += 1;
        log::info!(target: "sink", "note on  {:3} vel {:3}", note, velocity);
    }

    fn note_off(&mut self, note: u8) {
        log::info!(target: "sink", "note off {:3}", note);
    }

    fn control_change(&mut self, controller: u8, value: u8) {
        log::info!(target: "sink", "cc {:3} = {:3}", controller, value);
    }

    fn pitch_bend(&mut self, value: i16) {
        log::info!(target: "sink", "pitch bend {}", value);
    }

    fn all_notes_off(&mut self) {
        self.panics += 1;
        log::info!(target: "sink", "all notes off");
    }
}
