use crate::timer::CancellableTimer;
use log::debug;
use std::fmt;
use std::time::{Duration, Instant};

/// How long a burst stays on screen before it dismisses itself
pub const BURST_DURATION: Duration = Duration::from_millis(3200);
pub const DEFAULT_PIECE_COUNT: usize = 140;

pub const CONFETTI_COLORS: [&str; 7] = [
    "#facc15", "#f97316", "#22d3ee", "#38bdf8", "#a855f7", "#34d399", "#f472b6",
];

/// Rolling 31-multiplier hash over UTF-16 code units, wrapping at 32 bits.
pub fn hash_seed(value: &str) -> u32 {
    value
        .encode_utf16()
        .fold(0u32, |hash, unit| hash.wrapping_mul(31).wrapping_add(unit as u32))
}

/// Small deterministic PRNG (mulberry32 mixing) producing floats in `[0, 1)`.
#[derive(Debug, Clone)]
pub struct SeededRng {
    state: u32,
}

impl SeededRng {
    pub fn new(seed: u32) -> Self {
        Self {
            state: if seed == 0 { 1 } else { seed },
        }
    }

    pub fn next_f64(&mut self) -> f64 {
        self.state = self.state.wrapping_add(0x6d2b_79f5);
        let seed = self.state;
        let mut t = (seed ^ (seed >> 15)).wrapping_mul(1 | seed);
        t = t.wrapping_add((t ^ (t >> 7)).wrapping_mul(61 | t)) ^ t;
        (t ^ (t >> 14)) as f64 / 4_294_967_296.0
    }
}

/// Decorative particle. Sizes are in cells/pixels, `left` in percent of the
/// width, `drift` in percent of the viewport width, times in milliseconds.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfettiPiece {
    pub id: usize,
    pub left: f64,
    pub delay: f64,
    pub duration: f64,
    pub width: f64,
    pub height: f64,
    pub color: &'static str,
    pub drift: f64,
    pub rotate_start: f64,
    pub rotate_end: f64,
}

/// Where a piece is at a given moment of its fall
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PieceFrame {
    /// horizontal position in percent of the width
    pub x: f64,
    /// vertical position as a fraction of the height; starts slightly above the top
    pub y: f64,
    pub rotation: f64,
}

impl ConfettiPiece {
    /// None before the piece's delay has passed and after its animation ended.
    pub fn frame_at(&self, elapsed_ms: f64) -> Option<PieceFrame> {
        let local = elapsed_ms - self.delay;
        if local < 0.0 || local > self.duration {
            return None;
        }
        let progress = local / self.duration;
        Some(PieceFrame {
            x: self.left + self.drift * progress,
            y: -0.1 + 1.2 * progress,
            rotation: self.rotate_start + (self.rotate_end - self.rotate_start) * progress,
        })
    }

    pub fn rgb(&self) -> (u8, u8, u8) {
        parse_hex(self.color).unwrap_or((255, 255, 255))
    }
}

impl PieceFrame {
    /// Terminal glyph approximating a thin rectangle at this rotation
    pub fn glyph(&self) -> char {
        let angle = self.rotation.rem_euclid(180.0);
        match (angle / 45.0).round() as u32 % 4 {
            0 => '|',
            1 => '/',
            2 => '─',
            _ => '\\',
        }
    }
}

fn parse_hex(color: &str) -> Option<(u8, u8, u8)> {
    let hex = color.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(hex.get(range)?, 16).ok();
    Some((channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

/// Pure function of `(seed, count)`.
pub fn create_confetti_pieces(seed: &str, count: usize) -> Vec<ConfettiPiece> {
    let mut rng = SeededRng::new(hash_seed(seed));

    (0..count)
        .map(|id| {
            let width = 6.0 + rng.next_f64() * 8.0;
            let height = width * (1.4 + rng.next_f64() * 0.6);
            let rotate_start = rng.next_f64() * 360.0;
            let rotate_end = rotate_start + (rng.next_f64() - 0.5) * 900.0;
            let color = CONFETTI_COLORS
                [((rng.next_f64() * CONFETTI_COLORS.len() as f64) as usize).min(6)];

            ConfettiPiece {
                id,
                color,
                delay: rng.next_f64() * 160.0,
                duration: 2400.0 + rng.next_f64() * 1400.0,
                left: rng.next_f64() * 100.0,
                drift: (rng.next_f64() - 0.5) * 42.0,
                width,
                height,
                rotate_start,
                rotate_end,
            }
        })
        .collect()
}

/// One celebration: a fixed layout plus a self-dismiss timer.
///
/// The completion callback runs at most once, and never once the burst is disposed or dropped.
pub struct ConfettiBurst {
    pub seed: String,
    pub pieces: Vec<ConfettiPiece>,
    pub started_at: Instant,
    timer: CancellableTimer,
    on_done: Option<Box<dyn FnOnce(&str)>>,
}

impl ConfettiBurst {
    pub fn new<F>(seed: impl Into<String>, count: usize, started_at: Instant, on_done: F) -> Self
    where
        F: FnOnce(&str) + 'static,
    {
        let seed = seed.into();
        Self {
            pieces: create_confetti_pieces(&seed, count),
            seed,
            started_at,
            timer: CancellableTimer::new(started_at, BURST_DURATION),
            on_done: Some(Box::new(on_done)),
        }
    }

    /// Returns true when this poll completed the burst.
    pub fn poll(&mut self, now: Instant) -> bool {
        if !self.timer.poll(now) {
            return false;
        }
        if let Some(on_done) = self.on_done.take() {
            on_done(&self.seed);
        }
        true
    }

    pub fn is_done(&self) -> bool {
        !self.timer.is_pending()
    }

    pub fn elapsed_ms(&self, now: Instant) -> f64 {
        now.saturating_duration_since(self.started_at).as_secs_f64() * 1000.0
    }

    pub fn dispose(mut self) {
        self.cancel();
    }

    fn cancel(&mut self) {
        self.timer.cancel();
        self.on_done = None;
    }
}

impl Drop for ConfettiBurst {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl fmt::Debug for ConfettiBurst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfettiBurst")
            .field("seed", &self.seed)
            .field("pieces", &self.pieces.len())
            .field("timer", &self.timer)
            .finish_non_exhaustive()
    }
}

/// Bursts currently on screen; each one runs and dismisses independently
#[derive(Debug)]
pub struct Celebrations {
    bursts: Vec<ConfettiBurst>,
    piece_count: usize,
}

impl Celebrations {
    pub fn new() -> Self {
        Self::with_piece_count(DEFAULT_PIECE_COUNT)
    }

    pub fn with_piece_count(piece_count: usize) -> Self {
        Self {
            bursts: Vec::new(),
            piece_count,
        }
    }

    pub fn trigger(&mut self, seed: impl Into<String>, now: Instant) {
        let burst = ConfettiBurst::new(seed, self.piece_count, now, |seed| {
            debug!("Confetti burst {} finished", seed);
        });
        self.bursts.push(burst);
    }

    /// Poll every burst and drop the finished ones. Returns how many finished.
    pub fn update(&mut self, now: Instant) -> usize {
        let finished = self
            .bursts
            .iter_mut()
            .map(|burst| burst.poll(now))
            .filter(|done| *done)
            .count();
        self.bursts.retain(|burst| !burst.is_done());
        finished
    }

    /// Dispose everything still on screen; no pending callback will run.
    pub fn clear(&mut self) {
        for burst in self.bursts.drain(..) {
            burst.dispose();
        }
    }

    pub fn bursts(&self) -> &[ConfettiBurst] {
        &self.bursts
    }

    pub fn is_active(&self) -> bool {
        !self.bursts.is_empty()
    }
}

impl Default for Celebrations {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_hash_seed_is_deterministic() {
        assert_eq!(hash_seed(""), 0);
        assert_eq!(hash_seed("a"), 97);
        assert_eq!(hash_seed("ab"), 97 * 31 + 98);
        assert_eq!(hash_seed("s-abc123"), hash_seed("s-abc123"));
        assert_ne!(hash_seed("s-abc123"), hash_seed("s-abc124"));
    }

    #[test]
    fn test_rng_same_seed_same_sequence() {
        let mut a = SeededRng::new(42);
        let mut b = SeededRng::new(42);
        for _ in 0..1000 {
            let value = a.next_f64();
            assert_eq!(value.to_bits(), b.next_f64().to_bits());
            assert!((0.0..1.0).contains(&value));
        }
    }

    #[test]
    fn test_rng_zero_seed_behaves_like_one() {
        let mut zero = SeededRng::new(0);
        let mut one = SeededRng::new(1);
        assert_eq!(zero.next_f64(), one.next_f64());
    }

    #[test]
    fn test_pieces_are_reproducible() {
        let first = create_confetti_pieces("celebrate", 140);
        let second = create_confetti_pieces("celebrate", 140);
        assert_eq!(first, second);
        assert_eq!(first.len(), 140);
    }

    #[test]
    fn test_different_seeds_give_different_layouts() {
        let first = create_confetti_pieces("seed-one", 20);
        let second = create_confetti_pieces("seed-two", 20);
        assert_ne!(first, second);
    }

    #[test]
    fn test_piece_ranges() {
        for piece in create_confetti_pieces("ranges", 500) {
            assert!((6.0..14.0).contains(&piece.width));
            let ratio = piece.height / piece.width;
            assert!((1.4..2.0 + 1e-9).contains(&ratio));
            assert!((0.0..360.0).contains(&piece.rotate_start));
            let delta = piece.rotate_end - piece.rotate_start;
            assert!((-450.0..450.0).contains(&delta));
            assert!((0.0..100.0).contains(&piece.left));
            assert!((-21.0..21.0).contains(&piece.drift));
            assert!((0.0..160.0).contains(&piece.delay));
            assert!((2400.0..3800.0).contains(&piece.duration));
            assert!(CONFETTI_COLORS.contains(&piece.color));
        }
    }

    #[test]
    fn test_piece_ids_follow_index() {
        let pieces = create_confetti_pieces("ids", 5);
        let ids: Vec<usize> = pieces.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_frame_at_respects_delay_and_duration() {
        let piece = ConfettiPiece {
            id: 0,
            left: 50.0,
            delay: 100.0,
            duration: 2000.0,
            width: 8.0,
            height: 12.0,
            color: CONFETTI_COLORS[0],
            drift: 10.0,
            rotate_start: 0.0,
            rotate_end: 90.0,
        };

        assert!(piece.frame_at(50.0).is_none());
        let start = piece.frame_at(100.0).unwrap();
        assert_eq!(start.x, 50.0);
        assert_eq!(start.glyph(), '|');
        let end = piece.frame_at(2100.0).unwrap();
        assert_eq!(end.x, 60.0);
        assert_eq!(end.glyph(), '─');
        assert!(piece.frame_at(2101.0).is_none());
    }

    #[test]
    fn test_piece_rgb() {
        let piece = &create_confetti_pieces("rgb", 1)[0];
        let (r, g, b) = piece.rgb();
        assert_eq!(format!("#{r:02x}{g:02x}{b:02x}"), piece.color);
    }

    #[test]
    fn test_burst_fires_once_after_duration() {
        let start = Instant::now();
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let mut burst = ConfettiBurst::new("once", 10, start, move |_| {
            counter.set(counter.get() + 1);
        });

        assert!(!burst.poll(start + Duration::from_millis(3199)));
        assert_eq!(calls.get(), 0);
        assert!(burst.poll(start + Duration::from_millis(3200)));
        assert!(!burst.poll(start + Duration::from_millis(6400)));
        assert_eq!(calls.get(), 1);
        assert!(burst.is_done());
    }

    #[test]
    fn test_disposed_burst_never_calls_back() {
        let start = Instant::now();
        let calls = Rc::new(Cell::new(0));
        let counter = calls.clone();
        let burst = ConfettiBurst::new("early", 10, start, move |_| {
            counter.set(counter.get() + 1);
        });

        burst.dispose();
        assert_eq!(calls.get(), 0);
        // the callback closure (and its Rc clone) is gone
        assert_eq!(Rc::strong_count(&calls), 1);
    }

    #[test]
    fn test_celebrations_run_independently() {
        let start = Instant::now();
        let mut celebrations = Celebrations::with_piece_count(4);

        celebrations.trigger("first", start);
        celebrations.trigger("second", start + Duration::from_millis(1000));
        assert_eq!(celebrations.bursts().len(), 2);

        assert_eq!(celebrations.update(start + Duration::from_millis(3200)), 1);
        assert_eq!(celebrations.bursts().len(), 1);
        assert_eq!(celebrations.bursts()[0].seed, "second");

        assert_eq!(celebrations.update(start + Duration::from_millis(4200)), 1);
        assert!(!celebrations.is_active());
    }

    #[test]
    fn test_celebrations_clear_disposes_pending() {
        let start = Instant::now();
        let mut celebrations = Celebrations::with_piece_count(4);
        celebrations.trigger("pending", start);

        celebrations.clear();
        assert!(!celebrations.is_active());
        assert_eq!(celebrations.update(start + Duration::from_secs(10)), 0);
    }
}
