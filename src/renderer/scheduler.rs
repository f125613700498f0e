//! Frame scheduling for canvas repaints
//!
//! Render requests are coalesced: any number of requests between two ticks
//! produce exactly one paint.

/// Coalesces render requests into one paint per tick
#[derive(Debug, Default, Clone)]
pub struct RenderScheduler {
    /// Whether a paint is pending for the next tick
    requested: bool,
    /// Requests absorbed into the pending paint
    coalesced: u64,
    /// Paints handed out so far
    frames: u64,
}

impl RenderScheduler {
    /// Create a new render scheduler
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask for a paint on the next tick.
    ///
    /// Returns `true` if this request scheduled the paint, `false` if one
    /// was already pending.
    pub fn request(&mut self) -> bool {
        if self.requested {
            self.coalesced += 1;
            log::trace!("render already scheduled, coalescing request");
            return false;
        }
        self.requested = true;
        true
    }

    pub fn is_pending(&self) -> bool {
        self.requested
    }

    /// Consume the pending request, returning the frame number to paint
    pub fn take(&mut self) -> Option<u64> {
        if !self.requested {
            return None;
        }
        self.requested = false;
        self.frames += 1;
        if self.coalesced > 0 {
            log::debug!(
                "painting frame {} for {} coalesced requests",
                self.frames,
                self.coalesced + 1
            );
            self.coalesced = 0;
        }
        Some(self.frames)
    }

    /// Number of frames painted
    pub fn frame_count(&self) -> u64 {
        self.frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requests_coalesce() {
        let mut scheduler = RenderScheduler::new();
        assert!(scheduler.request());
        assert!(!scheduler.request());
        assert!(!scheduler.request());
        assert!(scheduler.is_pending());

        assert_eq!(scheduler.take(), Some(1));
        assert_eq!(scheduler.take(), None);
        assert!(!scheduler.is_pending());
    }

    #[test]
    fn test_frames_count_up() {
        let mut scheduler = RenderScheduler::new();
        scheduler.request();
        scheduler.take();
        scheduler.request();
        assert_eq!(scheduler.take(), Some(2));
        assert_eq!(scheduler.frame_count(), 2);
    }
}
