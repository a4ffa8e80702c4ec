//! Resamples note intervals onto a regular grid of symbol cells.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::events::NoteEvent;
use crate::note::pitch_to_name;

/// Tie-break policy when several notes overlap one grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Earliest start, original order as secondary tie-break.
    First,
    /// Maximum pitch.
    Highest,
    /// Minimum pitch.
    Lowest,
    /// Maximum velocity, ties broken by higher pitch.
    Loudest,
}

impl FromStr for Policy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "first" => Ok(Policy::First),
            "highest" => Ok(Policy::Highest),
            "lowest" => Ok(Policy::Lowest),
            "loudest" => Ok(Policy::Loudest),
            _ => Err(Error::InvalidPolicy(s.to_string())),
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Policy::First => "first",
            Policy::Highest => "highest",
            Policy::Lowest => "lowest",
            Policy::Loudest => "loudest",
        };
        f.write_str(name)
    }
}

/// How the beat-relative variant fills its grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// A note marks only the step where it starts.
    Onset,
    /// A note marks every step while it is held.
    Sustain,
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "onset" => Ok(Mode::Onset),
            "sustain" => Ok(Mode::Sustain),
            _ => Err(Error::InvalidMode(s.to_string())),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Mode::Onset => "onset",
            Mode::Sustain => "sustain",
        })
    }
}

/// Resample note events onto a fixed-time grid, one symbol per cell.
///
/// Cell `i` covers the half-open range `[i*step, (i+1)*step)`; every event
/// overlapping that range is a candidate and `policy` picks the winner.
/// Cells with no active event emit `silence`.
pub fn resample(
    events: &[NoteEvent],
    step_seconds: f64,
    policy: Policy,
    silence: &str,
) -> Result<Vec<String>> {
    if events.is_empty() {
        return Ok(Vec::new());
    }

    let t_end = events
        .iter()
        .map(|e| e.end_seconds)
        .fold(0.0, f64::max);
    let cells = (t_end / step_seconds).ceil() as usize;

    let mut sorted: Vec<&NoteEvent> = events.iter().collect();
    sorted.sort_by(|a, b| a.start_seconds.total_cmp(&b.start_seconds));

    // Single forward sweep: admit events starting before the cell's upper
    // bound, evict events ending at or before its lower bound. Equivalent to
    // testing the full overlap predicate per cell.
    let mut active: Vec<&NoteEvent> = Vec::new();
    let mut next = 0;
    let mut out = Vec::with_capacity(cells);

    for cell in 0..cells {
        let lower = cell as f64 * step_seconds;
        let upper = lower + step_seconds;

        while next < sorted.len() && sorted[next].start_seconds < upper {
            active.push(sorted[next]);
            next += 1;
        }
        active.retain(|e| e.end_seconds > lower);

        match choose_note(&active, policy) {
            Some(pitch) => out.push(pitch_to_name(pitch)?),
            None => out.push(silence.to_string()),
        }
    }

    Ok(out)
}

/// Pick one pitch from the active set, or `None` when it is empty.
fn choose_note(active: &[&NoteEvent], policy: Policy) -> Option<u8> {
    match policy {
        Policy::First => active.first().map(|e| e.pitch),
        Policy::Highest => active.iter().map(|e| e.pitch).max(),
        Policy::Lowest => active.iter().map(|e| e.pitch).min(),
        Policy::Loudest => active
            .iter()
            .max_by_key(|e| (e.velocity, e.pitch))
            .map(|e| e.pitch),
    }
}

/// Resample notes onto a beat-relative grid with chord symbols.
///
/// Timestamps round to the nearest step. In sustain mode a note whose start
/// and end round to the same step still occupies exactly one step. Chord
/// members are joined ascending by pitch.
pub fn resample_chords(
    notes: &[NoteEvent],
    step_seconds: f64,
    mode: Mode,
    silence: &str,
    joiner: &str,
) -> Result<Vec<String>> {
    if notes.is_empty() {
        return Ok(Vec::new());
    }

    // Keyed by pitch number, so joining the set yields true pitch order
    // rather than lexical name order.
    let mut steps: BTreeMap<usize, BTreeSet<u8>> = BTreeMap::new();
    let mut max_step = 0usize;

    for note in notes {
        let start_step = (note.start_seconds / step_seconds).round() as usize;
        match mode {
            Mode::Onset => {
                steps.entry(start_step).or_default().insert(note.pitch);
                max_step = max_step.max(start_step);
            }
            Mode::Sustain => {
                let mut end_step = (note.end_seconds / step_seconds).round() as usize;
                if end_step <= start_step {
                    end_step = start_step + 1;
                }
                for step in start_step..end_step {
                    steps.entry(step).or_default().insert(note.pitch);
                }
                max_step = max_step.max(end_step - 1);
            }
        }
    }

    let mut out = Vec::with_capacity(max_step + 1);
    for step in 0..=max_step {
        match steps.get(&step) {
            Some(pitches) => {
                let names = pitches
                    .iter()
                    .map(|&p| pitch_to_name(p))
                    .collect::<Result<Vec<_>>>()?;
                out.push(names.join(joiner));
            }
            None => out.push(silence.to_string()),
        }
    }

    Ok(out)
}

/// Resolve the step duration for the fixed-time variant: exactly one of a
/// musical grid token or a step length in milliseconds must be given.
pub fn resolve_grid_step(
    grid: Option<&str>,
    grid_ms: Option<f64>,
    us_per_beat: u32,
) -> Result<f64> {
    match (grid, grid_ms) {
        (Some(grid), None) => musical_grid_step(grid, us_per_beat),
        (None, Some(ms)) if ms > 0.0 => Ok(ms / 1000.0),
        (None, Some(ms)) => Err(Error::InvalidGridSpec(format!(
            "grid milliseconds must be positive, got {}",
            ms
        ))),
        _ => Err(Error::InvalidGridSpec(
            "choose exactly one: a musical grid or a fixed grid in milliseconds".to_string(),
        )),
    }
}

/// Step duration in seconds for a musical grid token at a given tempo.
///
/// The grid stays fixed-time even if the piece changes tempo later.
pub fn musical_grid_step(grid: &str, us_per_beat: u32) -> Result<f64> {
    let seconds_per_beat = us_per_beat as f64 / 1_000_000.0;
    let divisor = match grid.trim().to_lowercase().as_str() {
        "quarter" | "1/4" => 1.0,
        "8th" | "eighth" | "1/8" => 2.0,
        "16th" | "sixteenth" | "1/16" => 4.0,
        "32nd" | "1/32" => 8.0,
        other => return Err(Error::InvalidGridSpec(format!("unsupported musical grid: {}", other))),
    };
    Ok(seconds_per_beat / divisor)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(start: f64, end: f64, pitch: u8, velocity: u8) -> NoteEvent {
        NoteEvent {
            start_seconds: start,
            end_seconds: end,
            pitch,
            velocity,
            channel: 0,
            track: 0,
        }
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("highest".parse::<Policy>().unwrap(), Policy::Highest);
        assert_eq!(" Loudest ".parse::<Policy>().unwrap(), Policy::Loudest);
        assert!(matches!(
            "median".parse::<Policy>(),
            Err(Error::InvalidPolicy(_))
        ));
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("onset".parse::<Mode>().unwrap(), Mode::Onset);
        assert_eq!("SUSTAIN".parse::<Mode>().unwrap(), Mode::Sustain);
        assert!(matches!("legato".parse::<Mode>(), Err(Error::InvalidMode(_))));
    }

    #[test]
    fn test_overlap_policies() {
        // A and B overlap in cell 0; only B reaches cell 1.
        let a = event(0.0, 1.0, 60, 50);
        let b = event(0.5, 1.5, 72, 100);
        let events = [a, b];

        let highest = resample(&events, 1.0, Policy::Highest, "SIL").unwrap();
        assert_eq!(highest, vec!["C5", "C5"]);

        let lowest = resample(&events, 1.0, Policy::Lowest, "SIL").unwrap();
        assert_eq!(lowest, vec!["C4", "C5"]);

        let loudest = resample(&events, 1.0, Policy::Loudest, "SIL").unwrap();
        assert_eq!(loudest, vec!["C5", "C5"]);

        let first = resample(&events, 1.0, Policy::First, "SIL").unwrap();
        assert_eq!(first, vec!["C4", "C5"]);
    }

    #[test]
    fn test_silence_cells() {
        let events = [event(0.0, 0.5, 60, 80), event(2.0, 2.5, 64, 80)];
        let out = resample(&events, 0.5, Policy::Highest, ".").unwrap();
        assert_eq!(out, vec!["C4", ".", ".", ".", "E4"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(resample(&[], 0.5, Policy::Highest, "SIL").unwrap().is_empty());
        assert!(resample_chords(&[], 0.5, Mode::Onset, " ", "+")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_resample_is_pure() {
        let events = [event(0.0, 1.0, 60, 50), event(0.5, 1.5, 72, 100)];
        let once = resample(&events, 0.25, Policy::Loudest, "SIL").unwrap();
        let twice = resample(&events, 0.25, Policy::Loudest, "SIL").unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_chord_onset() {
        let notes = [event(0.0, 1.0, 60, 80), event(0.0, 1.0, 64, 80)];
        let out = resample_chords(&notes, 0.25, Mode::Onset, " ", "+").unwrap();
        assert_eq!(out[0], "C4+E4");
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_chord_sorted_by_pitch_not_name() {
        // Lexically "C#4" < "C4", but 61 > 60.
        let notes = [event(0.0, 1.0, 61, 80), event(0.0, 1.0, 60, 80)];
        let out = resample_chords(&notes, 0.25, Mode::Onset, " ", "+").unwrap();
        assert_eq!(out[0], "C4+C#4");
    }

    #[test]
    fn test_sustain_fills_held_steps() {
        let notes = [event(0.0, 1.0, 60, 80)];
        let out = resample_chords(&notes, 0.25, Mode::Sustain, " ", "+").unwrap();
        assert_eq!(out, vec!["C4", "C4", "C4", "C4"]);
    }

    #[test]
    fn test_sustain_zero_width_occupies_one_step() {
        // Start and end both round to step 0.
        let notes = [event(0.0, 0.05, 60, 80)];
        let out = resample_chords(&notes, 0.25, Mode::Sustain, " ", "+").unwrap();
        assert_eq!(out, vec!["C4"]);
    }

    #[test]
    fn test_onset_rounds_to_nearest() {
        // 0.24 with step 0.25 rounds to step 1, not step 0.
        let notes = [event(0.24, 0.5, 60, 80)];
        let out = resample_chords(&notes, 0.25, Mode::Onset, ".", "+").unwrap();
        assert_eq!(out, vec![".", "C4"]);
    }

    #[test]
    fn test_grid_selection_requires_exactly_one() {
        assert!(matches!(
            resolve_grid_step(None, None, 500_000),
            Err(Error::InvalidGridSpec(_))
        ));
        assert!(matches!(
            resolve_grid_step(Some("16th"), Some(10.0), 500_000),
            Err(Error::InvalidGridSpec(_))
        ));
    }

    #[test]
    fn test_grid_ms_must_be_positive() {
        assert!(matches!(
            resolve_grid_step(None, Some(0.0), 500_000),
            Err(Error::InvalidGridSpec(_))
        ));
        assert!(matches!(
            resolve_grid_step(None, Some(-5.0), 500_000),
            Err(Error::InvalidGridSpec(_))
        ));
    }

    #[test]
    fn test_grid_resolution() {
        assert_eq!(resolve_grid_step(Some("16th"), None, 500_000).unwrap(), 0.125);
        assert_eq!(resolve_grid_step(None, Some(10.0), 500_000).unwrap(), 0.01);
    }

    #[test]
    fn test_musical_grid_tokens() {
        assert_eq!(musical_grid_step("quarter", 500_000).unwrap(), 0.5);
        assert_eq!(musical_grid_step("8th", 500_000).unwrap(), 0.25);
        assert_eq!(musical_grid_step("1/16", 500_000).unwrap(), 0.125);
        assert_eq!(musical_grid_step("32nd", 500_000).unwrap(), 0.0625);
        assert!(matches!(
            musical_grid_step("64th", 500_000),
            Err(Error::InvalidGridSpec(_))
        ));
    }
}
