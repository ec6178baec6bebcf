//! Global tempo map: tick ordered Set Tempo changes and tick/time conversion.

use crate::smf::Tick;

/// 120 BPM, in effect before the first tempo change
pub const DEFAULT_TEMPO: u32 = 500_000;

const MICROS_PER_MINUTE: f64 = 60_000_000.0;
const MICROS_PER_SECOND: f64 = 1_000_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TempoChange {
    pub tick: Tick,
    pub microseconds_per_quarter: u32,
}

impl TempoChange {
    pub fn new(tick: Tick, microseconds_per_quarter: u32) -> Self {
        Self {
            tick,
            microseconds_per_quarter,
        }
    }

    pub fn bpm(&self) -> f64 {
        bpm_from_micros(self.microseconds_per_quarter)
    }
}

pub fn bpm_from_micros(microseconds_per_quarter: u32) -> f64 {
    MICROS_PER_MINUTE / f64::from(microseconds_per_quarter)
}

/// Number of ticks covering `seconds` at a constant `bpm`
pub fn ticks_for_seconds(seconds: f64, bpm: f64, ppq: u16) -> Tick {
    (seconds * bpm / 60.0 * f64::from(ppq)).round() as Tick
}

/// Tempo changes of one loaded file, sorted ascending by tick.
///
/// Each file owns its map, so loading a second file never disturbs the
/// first one's timing.
#[derive(Debug, Clone, PartialEq)]
pub struct TempoMap {
    ppq: u16,
    changes: Vec<TempoChange>,
}

impl TempoMap {
    /// Builds the map from unordered per-track contributions. Changes on the
    /// same tick keep their contribution order, so the later one wins.
    pub fn new(ppq: u16, mut changes: Vec<TempoChange>) -> Self {
        changes.sort_by_key(|change| change.tick);
        Self { ppq, changes }
    }

    pub fn ppq(&self) -> u16 {
        self.ppq
    }

    pub fn changes(&self) -> &[TempoChange] {
        &self.changes
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Tempo in effect at `tick`. Negative ticks (pre-roll) use the first
    /// change so the count-in runs at the opening tempo.
    pub fn tempo_at_tick(&self, tick: Tick) -> u32 {
        if tick < 0 {
            return self
                .changes
                .first()
                .map_or(DEFAULT_TEMPO, |c| c.microseconds_per_quarter);
        }
        let idx = self.changes.partition_point(|c| c.tick <= tick);
        match idx {
            0 => DEFAULT_TEMPO,
            n => self.changes[n - 1].microseconds_per_quarter,
        }
    }

    pub fn microseconds_per_tick(&self, tick: Tick) -> f64 {
        f64::from(self.tempo_at_tick(tick)) / f64::from(self.ppq)
    }

    /// Wall clock time of `target_tick`, measured from tick 0. Each segment
    /// between changes is timed at the tempo in effect over that segment.
    pub fn time_in_seconds(&self, target_tick: Tick) -> f64 {
        if target_tick < 0 {
            return self.segment_seconds(target_tick, self.tempo_at_tick(target_tick));
        }

        let mut seconds = 0.0;
        let mut last_tick: Tick = 0;
        let mut tempo = DEFAULT_TEMPO;
        for change in &self.changes {
            if change.tick > target_tick {
                break;
            }
            seconds += self.segment_seconds(change.tick - last_tick, tempo);
            last_tick = change.tick;
            tempo = change.microseconds_per_quarter;
        }
        seconds + self.segment_seconds(target_tick - last_tick, tempo)
    }

    /// Inverse of [`TempoMap::time_in_seconds`], rounded down to a whole tick
    pub fn tick_at_seconds(&self, seconds: f64) -> Tick {
        if seconds < 0.0 {
            return self.ticks_in(seconds, self.tempo_at_tick(-1));
        }

        let mut elapsed = 0.0;
        let mut last_tick: Tick = 0;
        let mut tempo = DEFAULT_TEMPO;
        for change in &self.changes {
            let segment = self.segment_seconds(change.tick - last_tick, tempo);
            if elapsed + segment > seconds {
                break;
            }
            elapsed += segment;
            last_tick = change.tick;
            tempo = change.microseconds_per_quarter;
        }
        last_tick + self.ticks_in(seconds - elapsed, tempo)
    }

    fn ticks_in(&self, seconds: f64, tempo: u32) -> Tick {
        (seconds * f64::from(self.ppq) * MICROS_PER_SECOND / f64::from(tempo)).floor() as Tick
    }

    fn segment_seconds(&self, delta_ticks: Tick, tempo: u32) -> f64 {
        delta_ticks as f64 * f64::from(tempo) / (f64::from(self.ppq) * MICROS_PER_SECOND)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_tempo_map() -> TempoMap {
        TempoMap::new(
            480,
            vec![TempoChange::new(960, 250_000), TempoChange::new(0, 500_000)],
        )
    }

    #[test]
    fn test_empty_map_uses_default_everywhere() {
        let map = TempoMap::new(480, Vec::new());
        for tick in [-5000, -1, 0, 1, 480, 1_000_000] {
            assert_eq!(map.tempo_at_tick(tick), DEFAULT_TEMPO);
        }
        assert!((map.time_in_seconds(960) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_changes_are_sorted() {
        let map = two_tempo_map();
        assert_eq!(map.changes()[0].tick, 0);
        assert_eq!(map.changes()[1].tick, 960);
    }

    #[test]
    fn test_tempo_at_tick_boundaries() {
        let map = TempoMap::new(480, vec![TempoChange::new(100, 400_000)]);
        assert_eq!(map.tempo_at_tick(99), DEFAULT_TEMPO);
        assert_eq!(map.tempo_at_tick(100), 400_000);
        assert_eq!(map.tempo_at_tick(5000), 400_000);
        assert_eq!(map.tempo_at_tick(-1), 400_000);
    }

    #[test]
    fn test_time_in_seconds_piecewise() {
        let map = two_tempo_map();
        assert!((map.time_in_seconds(960) - 1.0).abs() < 1e-9);
        assert!((map.time_in_seconds(1920) - 1.5).abs() < 1e-9);
        assert!((map.time_in_seconds(480) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_time_in_seconds_is_monotonic() {
        let map = TempoMap::new(
            96,
            vec![
                TempoChange::new(0, 600_000),
                TempoChange::new(50, 200_000),
                TempoChange::new(51, 1_000_000),
                TempoChange::new(400, 300_000),
            ],
        );
        let mut previous = map.time_in_seconds(-200);
        for tick in -199..1000 {
            let now = map.time_in_seconds(tick);
            assert!(now >= previous, "time went backwards at tick {}", tick);
            previous = now;
        }
    }

    #[test]
    fn test_tick_at_seconds_inverts_time() {
        let map = two_tempo_map();
        assert_eq!(map.tick_at_seconds(1.0), 960);
        assert_eq!(map.tick_at_seconds(1.5), 1920);
        assert_eq!(map.tick_at_seconds(0.25), 240);
    }

    #[test]
    fn test_bpm_helpers() {
        assert!((bpm_from_micros(DEFAULT_TEMPO) - 120.0).abs() < 1e-9);
        assert_eq!(ticks_for_seconds(3.0, 120.0, 480), 2880);
    }
}
