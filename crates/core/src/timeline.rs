use serde::{Deserialize, Serialize};

/// Timing of an animation plugin. Times are in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimelineConfig {
    /// Length of one cycle.
    pub duration: f32,
    /// Delay before the first cycle.
    pub start: f32,
    /// Repeat forever. A looping timeline never settles.
    pub looping: bool,
    /// Cycles to play when not looping.
    pub cycles: u32,
    /// Restart on its own after settling.
    pub rewind: bool,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            duration: 1000.0,
            start: 0.0,
            looping: false,
            cycles: 1,
            rewind: false,
        }
    }
}

impl TimelineConfig {
    pub fn new(duration: f32) -> Self {
        Self {
            duration,
            ..Self::default()
        }
    }

    pub fn looping(mut self) -> Self {
        self.looping = true;
        self
    }

    pub fn starting_at(mut self, start: f32) -> Self {
        self.start = start;
        self
    }
}

/// Where a timeline stands after a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Phase {
    /// Still inside the start delay.
    Pending,
    /// Progress through the current cycle, `0.0..=1.0`.
    Active(f32),
    /// Finished; nothing to do until rewound.
    Done,
}

impl Phase {
    pub fn ratio(self) -> Option<f32> {
        match self {
            Phase::Active(ratio) => Some(ratio),
            Phase::Pending | Phase::Done => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Running,
    /// The last cycle completed this frame; one settle frame follows.
    Reached,
    Settled,
}

/// Elapsed-time accumulator shared by the animation plugins.
///
/// A bounded timeline reports `Active(1.0)` on the frame its last cycle
/// completes, then once more as a settle frame so accumulated rounding never
/// leaves a plugin short of its target, and `Done` after that.
#[derive(Debug, Clone)]
pub struct Timeline {
    config: TimelineConfig,
    elapsed: f32,
    stage: Stage,
}

impl Timeline {
    pub fn new(config: TimelineConfig) -> Self {
        Self {
            config,
            elapsed: 0.0,
            stage: Stage::Running,
        }
    }

    pub fn config(&self) -> &TimelineConfig {
        &self.config
    }

    /// Time accumulated since the last rewind, start delay included.
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn is_done(&self) -> bool {
        self.stage == Stage::Settled && !self.config.rewind
    }

    /// Forget all accumulated time.
    pub fn rewind(&mut self) {
        self.elapsed = 0.0;
        self.stage = Stage::Running;
    }

    /// Accumulate one frame's `delta` and report the phase for this frame.
    pub fn advance(&mut self, delta: f32) -> Phase {
        match self.stage {
            Stage::Running => {}
            Stage::Reached => {
                self.stage = Stage::Settled;
                return Phase::Active(1.0);
            }
            Stage::Settled if self.config.rewind => self.rewind(),
            Stage::Settled => return Phase::Done,
        }

        self.elapsed += delta.max(0.0);
        if self.elapsed < self.config.start {
            return Phase::Pending;
        }
        let progress = (self.elapsed - self.config.start) / self.config.duration.max(f32::EPSILON);
        if self.config.looping {
            return Phase::Active(progress.fract());
        }
        if progress >= self.config.cycles.max(1) as f32 {
            self.stage = Stage::Reached;
            return Phase::Active(1.0);
        }
        Phase::Active(progress.fract())
    }
}
