//! Piecewise-linear tick -> seconds conversion built from tempo changes.

/// 120 BPM, the MIDI default when a file carries no tempo event.
pub const DEFAULT_US_PER_BEAT: u32 = 500_000;

/// A raw tempo event: at `tick`, the tempo becomes `us_per_beat`
/// microseconds per quarter note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TempoChange {
    pub tick: u64,
    pub us_per_beat: u32,
}

/// One segment of the tempo map, with cumulative elapsed seconds
/// precomputed at its start.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TempoSegment {
    pub start_tick: u64,
    pub us_per_beat: u32,
    pub seconds_at_start: f64,
}

/// Converts absolute tick positions to elapsed wall-clock seconds.
///
/// Segments are sorted ascending by start tick and partition the full tick
/// range: ticks before the first explicit change fall into a synthesized
/// default-tempo segment at tick 0, and ticks past the last change
/// extrapolate with the last segment's tempo.
#[derive(Debug, Clone)]
pub struct TempoMap {
    ticks_per_beat: u32,
    segments: Vec<TempoSegment>,
}

impl TempoMap {
    /// Build a tempo map from the tempo changes of a file.
    ///
    /// A change at tick 0 with `default_us_per_beat` is always seeded first,
    /// so files without an early tempo event start at the default. When
    /// several changes share a tick, the last one encountered wins.
    pub fn build(changes: &[TempoChange], ticks_per_beat: u32, default_us_per_beat: u32) -> Self {
        let mut all = Vec::with_capacity(changes.len() + 1);
        all.push(TempoChange {
            tick: 0,
            us_per_beat: default_us_per_beat,
        });
        all.extend_from_slice(changes);
        // Stable sort keeps encounter order within a tick, so the dedup
        // below keeps the last-seen change.
        all.sort_by_key(|c| c.tick);

        let mut dedup: Vec<TempoChange> = Vec::with_capacity(all.len());
        for change in all {
            match dedup.last_mut() {
                Some(last) if last.tick == change.tick => *last = change,
                _ => dedup.push(change),
            }
        }

        let mut segments = Vec::with_capacity(dedup.len());
        let mut seconds = 0.0;
        let mut prev = dedup[0];
        segments.push(TempoSegment {
            start_tick: prev.tick,
            us_per_beat: prev.us_per_beat,
            seconds_at_start: seconds,
        });
        for change in &dedup[1..] {
            seconds += ticks_to_seconds(change.tick - prev.tick, ticks_per_beat, prev.us_per_beat);
            segments.push(TempoSegment {
                start_tick: change.tick,
                us_per_beat: change.us_per_beat,
                seconds_at_start: seconds,
            });
            prev = *change;
        }

        TempoMap {
            ticks_per_beat,
            segments,
        }
    }

    /// Elapsed seconds at an absolute tick position.
    pub fn seconds_at(&self, tick: u64) -> f64 {
        // Rightmost segment whose start tick is <= the query tick. The
        // seeded tick-0 segment guarantees at least one qualifies.
        let idx = self.segments.partition_point(|s| s.start_tick <= tick) - 1;
        let seg = &self.segments[idx];
        seg.seconds_at_start
            + ticks_to_seconds(tick - seg.start_tick, self.ticks_per_beat, seg.us_per_beat)
    }

    pub fn segments(&self) -> &[TempoSegment] {
        &self.segments
    }
}

/// Duration in seconds of `delta_ticks` at a fixed tempo.
pub fn ticks_to_seconds(delta_ticks: u64, ticks_per_beat: u32, us_per_beat: u32) -> f64 {
    let seconds_per_tick = (us_per_beat as f64 / 1_000_000.0) / ticks_per_beat as f64;
    delta_ticks as f64 * seconds_per_tick
}
