use rand::rngs::{StdRng, ThreadRng};
use rand::{Rng, SeedableRng};

/// Source of sparkle origins and color picks
pub trait PlacementSource {
    /// Origin of a `size`-wide sparkle inside a `width` x `height` grid
    fn origin(&mut self, width: usize, height: usize, size: usize) -> (usize, usize);

    /// Index of the color a sparkle takes, chosen among the active entries
    fn color_index(&mut self, active_colors: &[bool]) -> usize;
}

/// Uniform placement over any `rand` generator
pub struct RandomPlacement<R: Rng> {
    rng: R,
}

impl RandomPlacement<ThreadRng> {
    /// Unseeded source for the live animation
    pub fn unseeded() -> Self {
        Self {
            rng: rand::thread_rng(),
        }
    }
}

impl RandomPlacement<StdRng> {
    /// Deterministic source, used for preset thumbnails keyed by preset id
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl<R: Rng> PlacementSource for RandomPlacement<R> {
    fn origin(&mut self, width: usize, height: usize, size: usize) -> (usize, usize) {
        // A sparkle as large as the grid has exactly one valid origin
        let span_x = width.saturating_sub(size).max(1);
        let span_y = height.saturating_sub(size).max(1);
        (self.rng.gen_range(0..span_x), self.rng.gen_range(0..span_y))
    }

    fn color_index(&mut self, active_colors: &[bool]) -> usize {
        let active: Vec<usize> = active_colors
            .iter()
            .enumerate()
            .filter(|(_, &a)| a)
            .map(|(i, _)| i)
            .collect();
        if active.is_empty() {
            // Nothing active: fall back to the whole palette
            self.rng.gen_range(0..active_colors.len().max(1))
        } else {
            active[self.rng.gen_range(0..active.len())]
        }
    }
}
