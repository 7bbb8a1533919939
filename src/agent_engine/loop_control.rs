use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::config::PlanConfig;
use crate::errors::{DeskPilotError, DeskPilotResult};

/// Cooperative cancellation flag shared between the plan worker and
/// whoever may want to stop it. Only checked between steps.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> DeskPilotResult<()> {
        if self.is_cancelled() {
            Err(DeskPilotError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Decides whether a plan keeps going after step results.
pub struct LoopController {
    max_consecutive_failures: u32,
    abort_on_failure: bool,
    consecutive_failures: u32,
    failure_count: u32,
}

impl LoopController {
    pub fn new(config: &PlanConfig) -> Self {
        Self {
            max_consecutive_failures: config.max_consecutive_failures,
            abort_on_failure: config.abort_on_failure,
            consecutive_failures: 0,
            failure_count: 0,
        }
    }

    pub fn record(&mut self, success: bool) {
        if success {
            self.consecutive_failures = 0;
        } else {
            self.consecutive_failures += 1;
            self.failure_count += 1;
        }
    }

    pub fn failure_count(&self) -> u32 {
        self.failure_count
    }

    pub fn should_stop(&self) -> bool {
        if self.abort_on_failure && self.consecutive_failures > 0 {
            return true;
        }
        self.max_consecutive_failures > 0 && self.consecutive_failures >= self.max_consecutive_failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan_config(max: u32, abort: bool) -> PlanConfig {
        PlanConfig {
            step_delay_ms: 0,
            max_consecutive_failures: max,
            abort_on_failure: abort,
        }
    }

    #[test]
    fn token_clones_share_state() {
        let token = CancellationToken::new();
        let other = token.clone();
        assert!(token.check().is_ok());
        other.cancel();
        assert!(token.is_cancelled());
        assert!(matches!(token.check(), Err(DeskPilotError::Cancelled)));
    }

    #[test]
    fn successes_reset_the_consecutive_count() {
        let mut ctrl = LoopController::new(&plan_config(2, false));
        ctrl.record(false);
        ctrl.record(true);
        ctrl.record(false);
        assert!(!ctrl.should_stop());
        ctrl.record(false);
        assert!(ctrl.should_stop());
        assert_eq!(ctrl.failure_count(), 3);
    }

    #[test]
    fn zero_disables_the_limit() {
        let mut ctrl = LoopController::new(&plan_config(0, false));
        for _ in 0..100 {
            ctrl.record(false);
        }
        assert!(!ctrl.should_stop());
    }

    #[test]
    fn abort_on_failure_stops_at_first_failure() {
        let mut ctrl = LoopController::new(&plan_config(0, true));
        ctrl.record(true);
        assert!(!ctrl.should_stop());
        ctrl.record(false);
        assert!(ctrl.should_stop());
    }
}
