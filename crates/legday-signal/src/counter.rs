//! Repetition counter with a one-shot completion hook

use tracing::info;

/// Default number of squats to finish a session
pub const DEFAULT_TARGET_REPS: u32 = 30;

/// Called once when the target is reached
pub type CompletionHook = Box<dyn FnOnce() + Send + 'static>;

/// What happened to a repetition signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepetitionOutcome {
    /// Counted; target not reached yet
    Counted(u32),
    /// Counted and the target was reached with this one
    Completed(u32),
    /// Target already reached; signal dropped
    Ignored,
}

/// Counts completed repetitions up to a target
pub struct RepetitionCounter {
    current: u32,
    target: u32,
    completed: bool,
    hook: Option<CompletionHook>,
}

impl RepetitionCounter {
    pub fn new(target: u32) -> Self {
        RepetitionCounter {
            current: 0,
            target: target.max(1),
            completed: false,
            hook: None,
        }
    }

    /// Register the completion hook, replacing any previous one
    pub fn on_complete<F>(&mut self, hook: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.hook = Some(Box::new(hook));
    }

    /// Drop a registered hook without running it
    pub fn clear_hook(&mut self) {
        self.hook = None;
    }

    pub fn record_repetition(&mut self) -> RepetitionOutcome {
        if self.completed {
            return RepetitionOutcome::Ignored;
        }

        self.current += 1;
        if self.current < self.target {
            return RepetitionOutcome::Counted(self.current);
        }

        self.completed = true;
        info!(count = self.current, "repetition target reached");
        if let Some(hook) = self.hook.take() {
            hook();
        }
        RepetitionOutcome::Completed(self.current)
    }

    pub fn current(&self) -> u32 {
        self.current
    }

    pub fn target(&self) -> u32 {
        self.target
    }

    pub fn is_complete(&self) -> bool {
        self.completed
    }

    /// Fraction of the target done, 0.0 ..= 1.0
    pub fn progress(&self) -> f64 {
        self.current as f64 / self.target as f64
    }

    /// Back to zero for a new session; the hook is dropped
    pub fn reset(&mut self) {
        self.current = 0;
        self.completed = false;
        self.hook = None;
    }
}

impl Default for RepetitionCounter {
    fn default() -> Self {
        Self::new(DEFAULT_TARGET_REPS)
    }
}

impl std::fmt::Debug for RepetitionCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepetitionCounter")
            .field("current", &self.current)
            .field("target", &self.target)
            .field("completed", &self.completed)
            .field("hook", &self.hook.is_some())
            .finish()
    }
}
