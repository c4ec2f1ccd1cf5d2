//! Live evaluation for a single mission context.
//!
//! At most one evaluation runs at a time: a cycle requested while another is
//! in flight is skipped, not queued. Each cycle freezes its own copy of the
//! config and latest telemetry before any numerical work starts.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::analysis::{run_risk_analyses_with, AnalysisMode};
use crate::doctrine::Decision;
use crate::error::{AirdropError, Result};
use crate::mission::EvaluationConfig;
use crate::pipeline::{evaluate_raw, hit_probability_probe, EvaluationSnapshot};
use crate::stability::enrich_snapshot;

/// One carrier state update from a telemetry feed. Its age is measured from
/// receipt, so no source timestamp is carried.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TelemetryFrame {
    pub position: Vector3<f64>, // meters
    pub velocity: Vector3<f64>, // m/s
    #[serde(default)]
    pub wind_mean: Option<Vector3<f64>>,
    #[serde(default)]
    pub wind_std: Option<f64>,
}

impl TelemetryFrame {
    /// Config with the carrier state (and wind, when reported) replaced
    pub fn apply_to(&self, config: &EvaluationConfig) -> EvaluationConfig {
        let environment = config.environment;
        config.with_uav_state(self.position, self.velocity).with_wind(
            self.wind_mean.unwrap_or(environment.wind_mean),
            self.wind_std.unwrap_or(environment.wind_std),
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EvaluationState {
    Ready,
    Running,
    Evaluated,
    Error(String),
}

#[derive(Debug)]
pub enum CycleOutcome {
    /// Another evaluation was still in flight
    Skipped,
    Evaluated(Box<EvaluationSnapshot>),
    Failed(AirdropError),
}

/// State carried from one cycle to the next
#[derive(Debug, Clone, Copy, Default)]
struct CycleMemory {
    previous_decision: Option<Decision>,
    wind_gradient: Option<f64>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Clears the in-flight flag when the cycle ends, including on panic
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct LiveEvaluator {
    config: Mutex<EvaluationConfig>,
    telemetry: Mutex<Option<(TelemetryFrame, Instant)>>,
    analysis_mode: Option<AnalysisMode>,
    in_flight: AtomicBool,
    memory: Mutex<CycleMemory>,
    state: Mutex<EvaluationState>,
}

impl LiveEvaluator {
    pub fn new(config: EvaluationConfig, analysis_mode: Option<AnalysisMode>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config: Mutex::new(config),
            telemetry: Mutex::new(None),
            analysis_mode,
            in_flight: AtomicBool::new(false),
            memory: Mutex::new(CycleMemory::default()),
            state: Mutex::new(EvaluationState::Ready),
        })
    }

    /// Replace the mission config; takes effect from the next cycle
    pub fn update_config(&self, config: EvaluationConfig) -> Result<()> {
        config.validate()?;
        *lock(&self.config) = config;
        Ok(())
    }

    pub fn update_telemetry(&self, frame: TelemetryFrame) {
        *lock(&self.telemetry) = Some((frame, Instant::now()));
    }

    pub fn state(&self) -> EvaluationState {
        lock(&self.state).clone()
    }

    pub fn previous_decision(&self) -> Option<Decision> {
        lock(&self.memory).previous_decision
    }

    pub fn wind_gradient(&self) -> Option<f64> {
        lock(&self.memory).wind_gradient
    }

    pub fn is_running(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Run one cycle unless one is already in flight.
    ///
    /// Failures move the evaluator to `Error` without retrying and leave the
    /// remembered decision untouched.
    pub fn try_run_cycle(&self) -> CycleOutcome {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("evaluation in flight; cycle skipped");
            return CycleOutcome::Skipped;
        }
        let _guard = InFlightGuard(&self.in_flight);

        *lock(&self.state) = EvaluationState::Running;
        match self.run_cycle() {
            Ok(snapshot) => {
                *lock(&self.state) = EvaluationState::Evaluated;
                CycleOutcome::Evaluated(Box::new(snapshot))
            }
            Err(err) => {
                warn!(error = %err, "live evaluation failed");
                *lock(&self.state) = EvaluationState::Error(err.to_string());
                CycleOutcome::Failed(err)
            }
        }
    }

    fn run_cycle(&self) -> Result<EvaluationSnapshot> {
        // Freeze inputs
        let base = *lock(&self.config);
        let telemetry = *lock(&self.telemetry);
        let memory = *lock(&self.memory);

        let config = telemetry.map_or(base, |(frame, _)| frame.apply_to(&base));
        let telemetry_age_s = telemetry.map(|(_, received)| received.elapsed().as_secs_f64());

        let mut snapshot = evaluate_raw(&config, telemetry_age_s)?;
        enrich_snapshot(&mut snapshot, memory.previous_decision);

        let mut wind_gradient = memory.wind_gradient;
        if let Some(mode) = self.analysis_mode {
            match run_risk_analyses_with(&snapshot, &config, mode, memory.wind_gradient, hit_probability_probe) {
                Ok(outcome) => {
                    if outcome.updated_gradient.is_some() {
                        wind_gradient = outcome.updated_gradient;
                    }
                    snapshot = snapshot.with_analyses(outcome.analyses);
                }
                Err(err) => warn!(error = %err, mode = %mode, "risk analyses failed; base snapshot kept"),
            }
        }

        *lock(&self.memory) = CycleMemory {
            previous_decision: Some(snapshot.decision),
            wind_gradient,
        };
        info!(
            p_hit = snapshot.p_hit,
            decision = %snapshot.decision,
            hysteresis = snapshot.hysteresis_applied,
            "live cycle evaluated"
        );
        Ok(snapshot)
    }
}

/// Periodic driver running [`LiveEvaluator::try_run_cycle`] on a background thread
pub struct LiveLoop {
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl LiveLoop {
    pub fn spawn<S>(evaluator: Arc<LiveEvaluator>, period: Duration, mut sink: S) -> Self
    where
        S: FnMut(CycleOutcome) + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_flag = Arc::clone(&stop);

        let handle = thread::spawn(move || {
            while !stop_flag.load(Ordering::Relaxed) {
                let started = Instant::now();
                sink(evaluator.try_run_cycle());

                let elapsed = started.elapsed();
                if elapsed > period {
                    warn!(
                        elapsed_ms = elapsed.as_millis() as u64,
                        period_ms = period.as_millis() as u64,
                        "live cycle overran its period"
                    );
                } else {
                    thread::sleep(period - elapsed);
                }
            }
        });

        Self {
            stop,
            handle: Some(handle),
        }
    }

    /// Signal the loop to stop and wait for the current cycle to finish
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for LiveLoop {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    fn small_config() -> EvaluationConfig {
        EvaluationConfig::default().with_sample_count(60)
    }

    fn frame(altitude: f64) -> TelemetryFrame {
        TelemetryFrame {
            position: Vector3::new(0.0, 0.0, altitude),
            velocity: Vector3::new(20.0, 0.0, 0.0),
            wind_mean: None,
            wind_std: Some(0.5),
        }
    }

    #[test]
    fn test_cycle_evaluates_and_remembers_decision() {
        let evaluator = LiveEvaluator::new(small_config(), None).unwrap();
        assert_eq!(evaluator.state(), EvaluationState::Ready);

        let snapshot = match evaluator.try_run_cycle() {
            CycleOutcome::Evaluated(s) => s,
            other => panic!("expected evaluation, got {other:?}"),
        };
        assert_eq!(evaluator.state(), EvaluationState::Evaluated);
        assert_eq!(evaluator.previous_decision(), Some(snapshot.decision));
        assert!(!evaluator.is_running());
    }

    #[test]
    fn test_cycle_skipped_while_in_flight() {
        let evaluator = LiveEvaluator::new(small_config(), None).unwrap();
        evaluator.in_flight.store(true, Ordering::Release);
        assert!(matches!(evaluator.try_run_cycle(), CycleOutcome::Skipped));
        assert_eq!(evaluator.state(), EvaluationState::Ready);
        evaluator.in_flight.store(false, Ordering::Release);
        assert!(matches!(evaluator.try_run_cycle(), CycleOutcome::Evaluated(_)));
    }

    #[test]
    fn test_telemetry_is_merged() {
        let evaluator = LiveEvaluator::new(small_config(), None).unwrap();
        evaluator.update_telemetry(frame(120.0));
        let snapshot = match evaluator.try_run_cycle() {
            CycleOutcome::Evaluated(s) => s,
            other => panic!("expected evaluation, got {other:?}"),
        };
        // Fresh telemetry scores higher confidence than the config-only path
        let offline = crate::pipeline::evaluate(&frame(120.0).apply_to(&small_config()), None).unwrap();
        assert_eq!(snapshot.impact_points, offline.impact_points);
        assert!(snapshot.confidence_index > offline.confidence_index);
    }

    #[test]
    fn test_failure_keeps_previous_decision() {
        let evaluator = LiveEvaluator::new(small_config(), None).unwrap();
        assert!(matches!(evaluator.try_run_cycle(), CycleOutcome::Evaluated(_)));
        let previous = evaluator.previous_decision();

        let mut bad = frame(100.0);
        bad.wind_std = Some(-1.0);
        evaluator.update_telemetry(bad);
        assert!(matches!(evaluator.try_run_cycle(), CycleOutcome::Failed(_)));
        assert!(matches!(evaluator.state(), EvaluationState::Error(_)));
        assert_eq!(evaluator.previous_decision(), previous);
        assert!(!evaluator.is_running());
    }

    #[test]
    fn test_invalid_config_update_rejected() {
        let evaluator = LiveEvaluator::new(small_config(), None).unwrap();
        assert!(evaluator.update_config(small_config().with_sample_count(0)).is_err());
        assert!(LiveEvaluator::new(small_config().with_dt(0.0), None).is_err());
    }

    #[test]
    fn test_fast_analyses_track_gradient() {
        let evaluator = LiveEvaluator::new(small_config(), Some(AnalysisMode::Fast)).unwrap();
        let snapshot = match evaluator.try_run_cycle() {
            CycleOutcome::Evaluated(s) => s,
            other => panic!("expected evaluation, got {other:?}"),
        };
        let live = snapshot.analyses.sensitivity_live.unwrap();
        assert_eq!(evaluator.wind_gradient(), Some(live.wind_gradient_smoothed));
    }

    #[test]
    fn test_live_loop_runs_and_stops() {
        let evaluator = Arc::new(LiveEvaluator::new(small_config(), None).unwrap());
        let (tx, rx) = mpsc::channel();
        let live = LiveLoop::spawn(Arc::clone(&evaluator), Duration::from_millis(5), move |outcome| {
            let _ = tx.send(outcome);
        });

        for _ in 0..2 {
            let outcome = rx.recv_timeout(Duration::from_secs(60)).unwrap();
            assert!(matches!(outcome, CycleOutcome::Evaluated(_)));
        }
        live.stop();
        assert!(!evaluator.is_running());
        assert!(evaluator.previous_decision().is_some());
    }
}
