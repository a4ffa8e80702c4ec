use anyhow::{Context, Result};
use midly::{MetaMessage, MidiMessage, Smf, Timing, TrackEventKind};
use std::path::Path;

use crate::tempo::{TempoChange, DEFAULT_US_PER_BEAT};

/// A decoded MIDI message at an absolute tick position within its track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimedMessage {
    pub tick: u64,
    pub kind: MessageKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    NoteOn { channel: u8, pitch: u8, velocity: u8 },
    NoteOff { channel: u8, pitch: u8 },
    Tempo { us_per_beat: u32 },
}

/// One track's messages plus the metadata used for instrument labeling.
#[derive(Debug, Clone, Default)]
pub struct TrackData {
    pub messages: Vec<TimedMessage>,
    pub name: Option<String>,
    pub program: Option<u8>,
    /// Tick of the track's last event, metas included.
    pub final_tick: u64,
}

/// A MIDI file decoded into per-track absolute-tick message streams.
pub struct MidiData {
    pub ticks_per_beat: u32,
    pub tracks: Vec<TrackData>,
}

impl MidiData {
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)
            .with_context(|| format!("Failed to read MIDI file: {}", path.display()))?;
        Self::from_bytes(&data)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let smf = Smf::parse(bytes).context("Failed to parse MIDI file")?;

        let ticks_per_beat = match smf.header.timing {
            Timing::Metrical(tpb) => tpb.as_int() as u32,
            Timing::Timecode(fps, subframe) => {
                // Convert timecode to ticks per beat approximation
                (fps.as_f32() * subframe as f32 * 4.0) as u32
            }
        };

        let mut tracks = Vec::with_capacity(smf.tracks.len());
        for track in &smf.tracks {
            let mut tick = 0u64;
            let mut data = TrackData::default();

            for event in track {
                tick += event.delta.as_int() as u64;

                match event.kind {
                    TrackEventKind::Midi { channel, message } => {
                        let channel = channel.as_int();
                        match message {
                            MidiMessage::NoteOn { key, vel } => {
                                data.messages.push(TimedMessage {
                                    tick,
                                    kind: MessageKind::NoteOn {
                                        channel,
                                        pitch: key.as_int(),
                                        velocity: vel.as_int(),
                                    },
                                });
                            }
                            MidiMessage::NoteOff { key, .. } => {
                                data.messages.push(TimedMessage {
                                    tick,
                                    kind: MessageKind::NoteOff {
                                        channel,
                                        pitch: key.as_int(),
                                    },
                                });
                            }
                            MidiMessage::ProgramChange { program } => {
                                data.program = Some(program.as_int());
                            }
                            _ => {}
                        }
                    }
                    TrackEventKind::Meta(MetaMessage::Tempo(tempo)) => {
                        data.messages.push(TimedMessage {
                            tick,
                            kind: MessageKind::Tempo {
                                us_per_beat: tempo.as_int(),
                            },
                        });
                    }
                    TrackEventKind::Meta(MetaMessage::TrackName(name)) => {
                        if let Ok(name_str) = std::str::from_utf8(name) {
                            // Trim null bytes and surrounding whitespace
                            let cleaned = name_str.trim_end_matches('\0').trim();
                            if !cleaned.is_empty() {
                                data.name = Some(cleaned.to_string());
                            }
                        }
                    }
                    _ => {}
                }
            }

            data.final_tick = tick;
            tracks.push(data);
        }

        Ok(MidiData {
            ticks_per_beat,
            tracks,
        })
    }

    /// All tempo changes across all tracks, in track-then-tick encounter
    /// order (the tempo map's dedup relies on that order).
    pub fn tempo_changes(&self) -> Vec<TempoChange> {
        let mut changes = Vec::new();
        for track in &self.tracks {
            for msg in &track.messages {
                if let MessageKind::Tempo { us_per_beat } = msg.kind {
                    changes.push(TempoChange {
                        tick: msg.tick,
                        us_per_beat,
                    });
                }
            }
        }
        changes
    }

    /// The first tempo event found scanning tracks in order, or the 120 BPM
    /// default. Used for musical grid steps, which stay fixed-time even when
    /// the piece later changes tempo.
    pub fn initial_tempo(&self) -> u32 {
        for track in &self.tracks {
            for msg in &track.messages {
                if let MessageKind::Tempo { us_per_beat } = msg.kind {
                    return us_per_beat;
                }
            }
        }
        DEFAULT_US_PER_BEAT
    }

    /// Greatest absolute tick observed across all tracks.
    pub fn max_tick(&self) -> u64 {
        self.tracks.iter().map(|t| t.final_tick).max().unwrap_or(0)
    }
}
