//! MIDI to note-array converter library
//!
//! This library converts MIDI files into time-quantized arrays of note-name
//! symbols ("C4", "F#3", chords like "C4+E4", or a silence token). Two
//! quantization strategies are provided: a fixed-time grid with a selectable
//! overlap policy, and a beat-relative grid with onset/sustain chord
//! semantics.

pub mod error;
pub mod events;
pub mod grid;
pub mod instruments;
pub mod midi;
pub mod note;
pub mod output;
pub mod tempo;

// Re-export main types for convenience
pub use error::{Error, Result};
pub use events::{extract_note_events, NoteEvent};
pub use grid::{musical_grid_step, resample, resample_chords, resolve_grid_step, Mode, Policy};
pub use instruments::{choose_best_instrument, group_instruments, Instrument};
pub use midi::MidiData;
pub use note::{name_to_pitch, pitch_to_name};
pub use output::{Song, SymbolArray};
pub use tempo::{TempoChange, TempoMap};
