//! Groups extracted notes into per-(track, channel) instruments and picks
//! the "main" one for single-instrument conversions.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::events::NoteEvent;
use crate::midi::MidiData;

/// The standard General MIDI percussion channel.
const DRUM_CHANNEL: u8 = 9;

/// All notes played by one (track, channel) pair.
#[derive(Debug, Clone)]
pub struct Instrument {
    pub track: usize,
    pub channel: u8,
    pub name: Option<String>,
    pub program: Option<u8>,
    pub is_drum: bool,
    pub notes: Vec<NoteEvent>,
}

/// Group sorted note events by (track, channel), in (track, channel) order.
/// A single MIDI track can carry several channels, so one track may yield
/// several instruments.
pub fn group_instruments(midi: &MidiData, events: &[NoteEvent]) -> Vec<Instrument> {
    let mut by_key: HashMap<(usize, u8), Vec<NoteEvent>> = HashMap::new();
    for event in events {
        by_key.entry((event.track, event.channel)).or_default().push(*event);
    }

    let mut keys: Vec<_> = by_key.keys().copied().collect();
    keys.sort();

    keys.into_iter()
        .map(|(track, channel)| {
            let data = &midi.tracks[track];
            Instrument {
                track,
                channel,
                name: data.name.clone(),
                program: data.program,
                is_drum: channel == DRUM_CHANNEL,
                notes: by_key.remove(&(track, channel)).unwrap_or_default(),
            }
        })
        .collect()
}

/// Pick the "main" instrument: prefer non-percussion, then most notes, with
/// ties going to the earliest instrument. All-percussion files fall back to
/// index 0; `None` only when there are no instruments at all.
pub fn choose_best_instrument(instruments: &[Instrument]) -> Option<usize> {
    let mut best: Option<(usize, usize)> = None;
    for (i, inst) in instruments.iter().enumerate() {
        if inst.is_drum {
            continue;
        }
        if best.map_or(true, |(_, count)| inst.notes.len() > count) {
            best = Some((i, inst.notes.len()));
        }
    }
    match best {
        Some((i, _)) => Some(i),
        None if instruments.is_empty() => None,
        None => Some(0),
    }
}

/// Resolve an explicit instrument selection, or fall back to the heuristic.
pub fn select_instrument(instruments: &[Instrument], index: Option<usize>) -> Result<Option<usize>> {
    match index {
        Some(i) if i < instruments.len() => Ok(Some(i)),
        Some(i) => Err(Error::InvalidInstrumentIndex {
            index: i,
            count: instruments.len(),
        }),
        None => Ok(choose_best_instrument(instruments)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inst(channel: u8, note_count: usize) -> Instrument {
        let note = NoteEvent {
            start_seconds: 0.0,
            end_seconds: 1.0,
            pitch: 60,
            velocity: 80,
            channel,
            track: 0,
        };
        Instrument {
            track: 0,
            channel,
            name: None,
            program: None,
            is_drum: channel == DRUM_CHANNEL,
            notes: vec![note; note_count],
        }
    }

    #[test]
    fn test_prefers_most_notes() {
        let instruments = vec![inst(0, 3), inst(1, 10), inst(2, 5)];
        assert_eq!(choose_best_instrument(&instruments), Some(1));
    }

    #[test]
    fn test_skips_drums() {
        let instruments = vec![inst(9, 100), inst(1, 2)];
        assert_eq!(choose_best_instrument(&instruments), Some(1));
    }

    #[test]
    fn test_tie_goes_to_first() {
        let instruments = vec![inst(0, 5), inst(1, 5)];
        assert_eq!(choose_best_instrument(&instruments), Some(0));
    }

    #[test]
    fn test_all_drums_falls_back_to_zero() {
        let instruments = vec![inst(9, 4)];
        assert_eq!(choose_best_instrument(&instruments), Some(0));
    }

    #[test]
    fn test_empty() {
        assert_eq!(choose_best_instrument(&[]), None);
    }

    #[test]
    fn test_select_out_of_range() {
        let instruments = vec![inst(0, 1)];
        let err = select_instrument(&instruments, Some(3)).unwrap_err();
        assert_eq!(
            err,
            Error::InvalidInstrumentIndex { index: 3, count: 1 }
        );
    }

    #[test]
    fn test_select_explicit_allows_drums() {
        let instruments = vec![inst(9, 4), inst(0, 1)];
        assert_eq!(select_instrument(&instruments, Some(0)).unwrap(), Some(0));
    }
}
