use crate::palette::{PALETTE, MATRIX_HEIGHT, MATRIX_WIDTH};
use crate::placement::{PlacementSource, RandomPlacement};
use crate::settings::Configuration;
use rand::rngs::ThreadRng;
use std::time::Duration;

/// Bounds of the dampened tick interval, in milliseconds
pub const MIN_INTERVAL_MS: u64 = 15;
pub const MAX_INTERVAL_MS: u64 = 3000;

/// One twinkling particle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sparkle {
    pub x: usize,
    pub y: usize,
    pub color_index: usize,
}

/// Row-major color matrix, `None` = LED off
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    width: usize,
    height: usize,
    cells: Vec<Option<u32>>,
}

impl Grid {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![None; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn clear(&mut self) {
        self.cells.fill(None);
    }

    /// Get the color at (x, y)
    pub fn get(&self, x: usize, y: usize) -> Option<u32> {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            None
        }
    }

    /// Paint a `size` x `size` block, clipping whatever falls outside
    pub fn paint_block(&mut self, x: usize, y: usize, size: usize, rgb: u32) {
        for py in y..(y + size).min(self.height) {
            for px in x..(x + size).min(self.width) {
                self.cells[py * self.width + px] = Some(rgb);
            }
        }
    }

    /// Number of lit cells
    pub fn lit_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }
}

/// Identifies one run of the simulator, so a stale stop can't kill a newer run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulatorHandle(u64);

/// Dampened tick interval for a configuration.
///
/// Dense or large sparkles slow the cadence down a little so fast speeds
/// don't turn into noise. Monotonic in both count and size, clamped to
/// [`MIN_INTERVAL_MS`, `MAX_INTERVAL_MS`].
pub fn effective_interval_ms(speed: u32, num_sparkles: u32, sparkle_size: u32) -> u64 {
    let speed = speed.max(1) as f64;
    let density = (num_sparkles as f64).powf(0.1) * (sparkle_size as f64).powf(0.1);
    let interval = speed * (1.0 + density / 1.5);
    (interval.round() as u64).clamp(MIN_INTERVAL_MS, MAX_INTERVAL_MS)
}

pub fn effective_interval(config: &Configuration) -> Duration {
    Duration::from_millis(effective_interval_ms(
        config.speed,
        config.num_sparkles,
        config.sparkle_size,
    ))
}

/// Sparkle animation state
pub struct SparkleSimulator<P: PlacementSource = RandomPlacement<ThreadRng>> {
    grid: Grid,
    sparkles: Vec<Sparkle>,
    config: Configuration,
    generation: u64,
    running: bool,
    paint_ops: usize,
    source: P,
}

impl SparkleSimulator {
    /// Live simulator on the device-sized matrix
    pub fn new() -> Self {
        Self::with_source(MATRIX_WIDTH, MATRIX_HEIGHT, RandomPlacement::unseeded())
    }
}

impl Default for SparkleSimulator {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: PlacementSource> SparkleSimulator<P> {
    pub fn with_source(width: usize, height: usize, source: P) -> Self {
        Self {
            grid: Grid::new(width, height),
            sparkles: Vec::new(),
            config: Configuration::default(),
            generation: 0,
            running: false,
            paint_ops: 0,
            source,
        }
    }

    /// Seed a fresh sparkle set for `config` and paint the first frame
    pub fn start(&mut self, config: &Configuration) -> SimulatorHandle {
        self.generation += 1;
        self.config = config.clone();
        let size = config.sparkle_size as usize;
        let (width, height) = (self.grid.width, self.grid.height);

        self.sparkles = (0..config.num_sparkles)
            .map(|_| {
                let (x, y) = self.source.origin(width, height, size);
                let color_index = self.source.color_index(&config.active_colors);
                Sparkle { x, y, color_index }
            })
            .collect();

        self.running = true;
        self.repaint();
        SimulatorHandle(self.generation)
    }

    /// Relocate and recolor every sparkle, then rebuild the grid
    pub fn tick(&mut self) -> &Grid {
        if self.running {
            let size = self.config.sparkle_size as usize;
            let (width, height) = (self.grid.width, self.grid.height);
            for sparkle in &mut self.sparkles {
                let (x, y) = self.source.origin(width, height, size);
                sparkle.x = x;
                sparkle.y = y;
                sparkle.color_index = self.source.color_index(&self.config.active_colors);
            }
            self.repaint();
        }
        &self.grid
    }

    /// Stop the run identified by `handle`; handles from older runs are ignored
    pub fn stop(&mut self, handle: SimulatorHandle) {
        if handle.0 == self.generation {
            self.running = false;
        }
    }

    fn repaint(&mut self) {
        let size = self.config.sparkle_size as usize;
        self.grid.clear();
        self.paint_ops = 0;
        for sparkle in &self.sparkles {
            let rgb = PALETTE[sparkle.color_index % PALETTE.len()];
            self.grid.paint_block(sparkle.x, sparkle.y, size, rgb);
            self.paint_ops += 1;
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    #[cfg(test)]
    pub fn sparkles(&self) -> &[Sparkle] {
        &self.sparkles
    }

    #[cfg(test)]
    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Sparkles painted in the last rebuild
    pub fn paint_ops(&self) -> usize {
        self.paint_ops
    }

    pub fn interval(&self) -> Duration {
        effective_interval(&self.config)
    }
}

/// Deterministic single frame for a preset thumbnail
pub fn preview(config: &Configuration, seed: u64) -> Grid {
    let mut sim = SparkleSimulator::with_source(
        MATRIX_WIDTH,
        MATRIX_HEIGHT,
        RandomPlacement::seeded(seed),
    );
    sim.start(config);
    sim.grid
}
