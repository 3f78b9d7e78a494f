/// Asks the platform for the next display frame.
///
/// The platform answers by calling [`crate::CubeText::frame`] with the frame
/// time. `cancel` withdraws a request that has not fired yet.
pub trait FrameScheduler {
    fn request_frame(&mut self);

    fn cancel(&mut self);
}

/// Scheduler driven by hand: records requests and lets the caller take them.
#[derive(Debug, Default)]
pub struct ManualScheduler {
    pending: bool,
    requests: usize,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Consume the outstanding request, if any.
    pub fn take(&mut self) -> bool {
        std::mem::take(&mut self.pending)
    }

    /// Requests made so far, including withdrawn ones.
    pub fn requests(&self) -> usize {
        self.requests
    }
}

impl FrameScheduler for ManualScheduler {
    fn request_frame(&mut self) {
        self.pending = true;
        self.requests += 1;
    }

    fn cancel(&mut self) {
        self.pending = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_withdraws_request() {
        let mut scheduler = ManualScheduler::new();
        scheduler.request_frame();
        assert!(scheduler.is_pending());
        scheduler.cancel();
        assert!(!scheduler.take());
        assert_eq!(scheduler.requests(), 1);
    }
}
