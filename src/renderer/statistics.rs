use std::time::{Duration, Instant};

/// Per-frame counters collected while atoms are binned, plus timing.
#[derive(Debug, Clone)]
pub struct FrameStatistics {
    atoms: usize,
    vertices: usize,
    polygons: usize,
    frame_duration: Duration,
    frames: u64,

    last_update: Instant,
    window_frames: u32,
    window_time: Duration,
    fps: f32,
}

impl Default for FrameStatistics {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameStatistics {
    #[must_use]
    pub fn new() -> Self {
        Self {
            atoms: 0,
            vertices: 0,
            polygons: 0,
            frame_duration: Duration::ZERO,
            frames: 0,
            last_update: Instant::now(),
            window_frames: 0,
            window_time: Duration::ZERO,
            fps: 0.0,
        }
    }

    /// Zeroes the per-frame counters.
    pub fn reset(&mut self) {
        self.atoms = 0;
        self.vertices = 0;
        self.polygons = 0;
    }

    pub fn add(&mut self, atoms: usize, vertices: usize, polygons: usize) {
        self.atoms += atoms;
        self.vertices += vertices;
        self.polygons += polygons;
    }

    /// Records the duration of a finished frame and refreshes the rolling
    /// frames-per-second once a second has accumulated.
    pub fn finish_frame(&mut self, duration: Duration) {
        self.frame_duration = duration;
        self.frames += 1;
        self.window_frames += 1;

        let now = Instant::now();
        self.window_time += now - self.last_update;
        self.last_update = now;

        if self.window_time.as_secs_f32() >= 1.0 {
            self.fps = self.window_frames as f32 / self.window_time.as_secs_f32();
            self.window_time = Duration::ZERO;
            self.window_frames = 0;
        }
    }

    pub fn atom_count(&self) -> usize {
        self.atoms
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices
    }

    pub fn polygon_count(&self) -> usize {
        self.polygons
    }

    pub fn frame_duration(&self) -> Duration {
        self.frame_duration
    }

    /// Frames completed since creation.
    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }
}
