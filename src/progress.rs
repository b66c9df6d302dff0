// src/progress.rs
// Percentage reporting side channel for the transcoders.

/// Reports land on multiples of this percentage.
pub const PROGRESS_STEP: u8 = 5;

/// Optional progress callback, invoked with a non-decreasing percentage.
pub type ProgressFn<'a> = Option<&'a mut dyn FnMut(u8)>;

/// Turns "bytes done out of total" into at most one callback per 5% step.
pub(crate) struct Progress<'a> {
    callback: ProgressFn<'a>,
    total: u64,
    last: Option<u8>,
}

impl<'a> Progress<'a> {
    pub(crate) fn new(total: u64, callback: ProgressFn<'a>) -> Self {
        Self { callback, total, last: None }
    }

    pub(crate) fn update(&mut self, done: u64) {
        let Some(cb) = self.callback.as_mut() else { return };
        let pct = if self.total == 0 { 100 } else { (done.min(self.total) * 100 / self.total) as u8 };
        let step = pct - pct % PROGRESS_STEP;
        if self.last.is_some_and(|l| step <= l) { return; }
        self.last = Some(step);
        (*cb)(step);
    }

    pub(crate) fn finish(&mut self) { self.update(self.total); }
}
