//! Matches note-on/note-off pairs into closed intervals in seconds.

use serde::Serialize;
use std::collections::HashMap;

use crate::midi::{MessageKind, MidiData};
use crate::tempo::{TempoMap, DEFAULT_US_PER_BEAT};

/// A note sounding over a closed interval of wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NoteEvent {
    pub start_seconds: f64,
    pub end_seconds: f64,
    pub pitch: u8,
    pub velocity: u8,
    pub channel: u8,
    pub track: usize,
}

/// Extract closed note intervals from a decoded file.
///
/// A note-on is matched to the next note-off (or velocity-zero note-on) with
/// the same (track, channel, pitch). A second note-on arriving before the
/// first is terminated overwrites it, abandoning the earlier onset. Notes
/// still sounding after all tracks end are closed at the file's final tick.
/// Zero-duration intervals are dropped.
///
/// The result is sorted ascending by (start, end, track, channel, pitch), a
/// total order independent of the original message sequence.
pub fn extract_note_events(midi: &MidiData) -> Vec<NoteEvent> {
    let tempo_map = TempoMap::build(
        &midi.tempo_changes(),
        midi.ticks_per_beat,
        DEFAULT_US_PER_BEAT,
    );

    let mut events = Vec::new();
    // (track, channel, pitch) -> (start_tick, start_seconds, velocity)
    let mut active: HashMap<(usize, u8, u8), (u64, f64, u8)> = HashMap::new();

    for (track, data) in midi.tracks.iter().enumerate() {
        for msg in &data.messages {
            match msg.kind {
                MessageKind::NoteOn {
                    channel,
                    pitch,
                    velocity,
                } if velocity > 0 => {
                    let start_seconds = tempo_map.seconds_at(msg.tick);
                    active.insert((track, channel, pitch), (msg.tick, start_seconds, velocity));
                }
                MessageKind::NoteOn { channel, pitch, .. }
                | MessageKind::NoteOff { channel, pitch } => {
                    if let Some((_, start_seconds, velocity)) =
                        active.remove(&(track, channel, pitch))
                    {
                        let end_seconds = tempo_map.seconds_at(msg.tick);
                        if end_seconds > start_seconds {
                            events.push(NoteEvent {
                                start_seconds,
                                end_seconds,
                                pitch,
                                velocity,
                                channel,
                                track,
                            });
                        }
                    }
                }
                MessageKind::Tempo { .. } => {}
            }
        }
    }

    // Close hanging notes at the end of the file.
    let end_seconds = tempo_map.seconds_at(midi.max_tick());
    for ((track, channel, pitch), (_, start_seconds, velocity)) in active.drain() {
        if end_seconds > start_seconds {
            events.push(NoteEvent {
                start_seconds,
                end_seconds,
                pitch,
                velocity,
                channel,
                track,
            });
        }
    }

    events.sort_by(|a, b| {
        a.start_seconds
            .total_cmp(&b.start_seconds)
            .then(a.end_seconds.total_cmp(&b.end_seconds))
            .then(a.track.cmp(&b.track))
            .then(a.channel.cmp(&b.channel))
            .then(a.pitch.cmp(&b.pitch))
    });
    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::midi::{TimedMessage, TrackData};

    fn on(tick: u64, pitch: u8, velocity: u8) -> TimedMessage {
        TimedMessage {
            tick,
            kind: MessageKind::NoteOn {
                channel: 0,
                pitch,
                velocity,
            },
        }
    }

    fn off(tick: u64, pitch: u8) -> TimedMessage {
        TimedMessage {
            tick,
            kind: MessageKind::NoteOff { channel: 0, pitch },
        }
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "{} != {}",
            actual,
            expected
        );
    }

    fn midi_with(messages: Vec<TimedMessage>) -> MidiData {
        let final_tick = messages.last().map(|m| m.tick).unwrap_or(0);
        MidiData {
            ticks_per_beat: 480,
            tracks: vec![TrackData {
                messages,
                name: None,
                program: None,
                final_tick,
            }],
        }
    }

    #[test]
    fn test_simple_pair() {
        let midi = midi_with(vec![on(0, 60, 90), off(480, 60)]);
        let events = extract_note_events(&midi);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].pitch, 60);
        assert_eq!(events[0].velocity, 90);
        assert_close(events[0].start_seconds, 0.0);
        assert_close(events[0].end_seconds, 0.5);
    }

    #[test]
    fn test_velocity_zero_note_on_terminates() {
        let midi = midi_with(vec![on(0, 60, 90), on(480, 60, 0)]);
        let events = extract_note_events(&midi);
        assert_eq!(events.len(), 1);
        assert_close(events[0].end_seconds, 0.5);
    }

    #[test]
    fn test_zero_duration_dropped() {
        let midi = midi_with(vec![on(100, 60, 90), off(100, 60)]);
        assert!(extract_note_events(&midi).is_empty());
    }

    #[test]
    fn test_hanging_note_closed_at_final_tick() {
        let mut midi = midi_with(vec![on(0, 60, 90)]);
        midi.tracks[0].final_tick = 960;
        let events = extract_note_events(&midi);
        assert_eq!(events.len(), 1);
        assert_close(events[0].end_seconds, 1.0);
    }

    #[test]
    fn test_duplicate_note_on_overwrites() {
        // The first onset is abandoned; only the second one is closed.
        let midi = midi_with(vec![on(0, 60, 50), on(240, 60, 90), off(480, 60)]);
        let events = extract_note_events(&midi);
        assert_eq!(events.len(), 1);
        assert_close(events[0].start_seconds, 0.25);
        assert_eq!(events[0].velocity, 90);
    }

    #[test]
    fn test_off_without_on_ignored() {
        let midi = midi_with(vec![off(480, 60)]);
        assert!(extract_note_events(&midi).is_empty());
    }

    #[test]
    fn test_sorted_output() {
        let midi = midi_with(vec![
            on(480, 64, 80),
            on(0, 72, 80),
            off(960, 64),
            off(960, 72),
        ]);
        let events = extract_note_events(&midi);
        assert_eq!(events.len(), 2);
        assert!(events[0].start_seconds <= events[1].start_seconds);
        assert_eq!(events[0].pitch, 72);
        assert_eq!(events[1].pitch, 64);
    }

    #[test]
    fn test_tempo_change_affects_timing() {
        let mut messages = vec![on(0, 60, 90)];
        messages.insert(
            0,
            TimedMessage {
                tick: 0,
                kind: MessageKind::Tempo {
                    us_per_beat: 1_000_000,
                },
            },
        );
        messages.push(off(480, 60));
        let midi = midi_with(messages);
        let events = extract_note_events(&midi);
        assert_close(events[0].end_seconds, 1.0);
    }
}
