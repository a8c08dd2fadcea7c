//! Telemetry-loss detection
//!
//! Classifies the source as idle when no packet has arrived within the
//! timeout. The consumer decides what to draw while idle; this policy only
//! keeps the animation phase continuous across repeated checks.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Idle detection settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IdleConfig {
    /// Seconds without telemetry before the source counts as idle
    pub timeout_secs: f64,
}

impl Default for IdleConfig {
    fn default() -> Self {
        Self { timeout_secs: 2.0 }
    }
}

/// Result of one idle check
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IdleStatus {
    pub idle: bool,
    /// Time since the current idle phase started
    pub phase: Duration,
}

#[derive(Debug, Clone)]
pub struct IdlePolicy {
    timeout: Duration,
    last_idle_start: Instant,
}

impl IdlePolicy {
    pub fn new(config: &IdleConfig, now: Instant) -> Self {
        Self {
            timeout: Duration::try_from_secs_f64(config.timeout_secs.max(0.0))
                .unwrap_or(Duration::MAX),
            last_idle_start: now,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// True when the last packet is older than the timeout (or never arrived)
    pub fn is_idle(&self, last_telemetry_at: Option<Instant>, now: Instant) -> bool {
        match last_telemetry_at {
            Some(at) => now.saturating_duration_since(at) > self.timeout,
            None => true,
        }
    }

    /// Classify and advance the phase clock.
    ///
    /// While idle, the phase start moves forward at most once per elapsed
    /// timeout, never on every call.
    pub fn check(&mut self, last_telemetry_at: Option<Instant>, now: Instant) -> IdleStatus {
        let idle = self.is_idle(last_telemetry_at, now);
        if idle && now.saturating_duration_since(self.last_idle_start) > self.timeout {
            self.last_idle_start = now;
        }
        IdleStatus {
            idle,
            phase: now.saturating_duration_since(self.last_idle_start),
        }
    }

    /// Telemetry arrived: restart the phase clock
    pub fn mark_telemetry(&mut self, now: Instant) {
        self.last_idle_start = now;
    }

    pub fn last_idle_start(&self) -> Instant {
        self.last_idle_start
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    #[test]
    fn test_idle_after_timeout() {
        let now = Instant::now() + secs(10.0);
        let policy = IdlePolicy::new(&IdleConfig::default(), now);

        assert!(policy.is_idle(Some(now - secs(3.0)), now));
        assert!(!policy.is_idle(Some(now - secs(1.0)), now));
    }

    #[test]
    fn test_idle_before_first_packet() {
        let now = Instant::now();
        let policy = IdlePolicy::new(&IdleConfig::default(), now);
        assert!(policy.is_idle(None, now));
    }

    #[test]
    fn test_repeated_checks_keep_phase() {
        let t0 = Instant::now();
        let mut policy = IdlePolicy::new(&IdleConfig::default(), t0);
        policy.mark_telemetry(t0);

        // Idle from 2s on; the phase clock resets once, then keeps running
        let first = policy.check(Some(t0), t0 + secs(2.5));
        assert!(first.idle);
        assert_eq!(first.phase, Duration::ZERO);
        let reset_at = policy.last_idle_start();

        for step in 1..=15 {
            let status = policy.check(Some(t0), t0 + secs(2.5 + step as f64 * 0.1));
            assert!(status.idle);
            assert_eq!(policy.last_idle_start(), reset_at);
        }

        let later = policy.check(Some(t0), t0 + secs(4.6));
        assert_eq!(later.phase, Duration::ZERO);
        assert_eq!(policy.last_idle_start(), t0 + secs(4.6));
    }

    #[test]
    fn test_active_source_never_resets_phase() {
        let t0 = Instant::now();
        let mut policy = IdlePolicy::new(&IdleConfig::default(), t0);

        let status = policy.check(Some(t0 + secs(9.0)), t0 + secs(10.0));
        assert!(!status.idle);
        assert_eq!(policy.last_idle_start(), t0);
        assert_eq!(status.phase, secs(10.0));
    }

    #[test]
    fn test_mark_telemetry_restarts_phase() {
        let t0 = Instant::now();
        let mut policy = IdlePolicy::new(&IdleConfig::default(), t0);
        policy.mark_telemetry(t0 + secs(5.0));
        assert_eq!(policy.last_idle_start(), t0 + secs(5.0));
    }
}
