//! Frames per second counter

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::time::{Duration, Instant};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Counts frames and snapshots the count once per second.
#[derive(Debug, Clone)]
pub struct FpsCounter {
    frames: u32,
    window_start: Instant,
    fps: Option<u32>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl FpsCounter {
    pub fn new(now: Instant) -> Self {
        Self {
            frames: 0,
            window_start: now,
            fps: None
        }
    }

    /// Count a frame. Returns the new snapshot when a second has passed since the last one.
    pub fn tick(&mut self, now: Instant) -> Option<u32> {
        self.frames += 1;

        if now.saturating_duration_since(self.window_start) > Duration::from_secs(1) {
            self.fps = Some(self.frames);
            self.frames = 0;
            self.window_start = now;

            self.fps
        }
        else {
            None
        }
    }

    /// Frames counted in the last full second, `None` until the first second has passed.
    pub fn fps(&self) -> Option<u32> {
        self.fps
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_fps() {
        let t0 = Instant::now();
        let mut fps = FpsCounter::new(t0);

        for i in 1..=10 {
            assert_eq!(fps.tick(t0 + Duration::from_millis(i * 100)), None);
        }
        assert_eq!(fps.fps(), None);

        assert_eq!(fps.tick(t0 + Duration::from_millis(1050)), Some(11));
        assert_eq!(fps.fps(), Some(11));

        assert_eq!(fps.tick(t0 + Duration::from_millis(1500)), None);
        assert_eq!(fps.fps(), Some(11));
    }
}
