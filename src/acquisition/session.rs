// src/acquisition/session.rs
//! Timeout-bounded acquisition session
//!
//! A session initializes the chip (reset, the six configuration registers in
//! fixed order, synch) and then polls STATUS and the ECG FIFO until the
//! sample buffer is full or the wall-clock window closes. It runs once;
//! every exit path hands back the buffer and the recorded warnings.

use crate::acquisition::buffer::SampleBuffer;
use crate::config::EcgSettings;
use crate::device::{DecodeMode, Max30003};
use crate::error::{EcgError, EcgResult};
use crate::hal::SpiTransport;
use crate::registers::DeviceConfiguration;
use std::fmt;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Lifecycle of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Idle,
    Initializing,
    Polling,
    Done,
    TimedOut,
    Failed,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Done | SessionState::TimedOut | SessionState::Failed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Initializing => "initializing",
            SessionState::Polling => "polling",
            SessionState::Done => "done",
            SessionState::TimedOut => "timed out",
            SessionState::Failed => "failed",
        };
        write!(f, "{}", name)
    }
}

/// Outcome of a session, complete or partial
#[derive(Debug)]
pub struct AcquisitionReport {
    pub samples: SampleBuffer,
    /// Configuration fallbacks and FIFO overflow episodes, in order
    pub warnings: Vec<EcgError>,
    pub state: SessionState,
    /// Time spent polling
    pub elapsed: Duration,
    pub iterations: u64,
    /// Poll iterations that saw EOVF set
    pub overflow_count: u64,
}

/// Session ended without filling the buffer
#[derive(Error, Debug)]
#[error("acquisition {}: {error}", .report.state)]
pub struct SessionFailure {
    #[source]
    pub error: EcgError,
    pub report: AcquisitionReport,
}

impl SessionFailure {
    /// Whether the partial buffer is usable (timeouts only)
    pub fn is_partial(&self) -> bool {
        self.report.state == SessionState::TimedOut
    }
}

/// One acquisition run on one device
pub struct AcquisitionSession<T> {
    device: Max30003<T>,
    config: DeviceConfiguration,
    decode_mode: DecodeMode,
    poll_interval: Option<Duration>,
    state: SessionState,
    warnings: Vec<EcgError>,
}

impl<T: SpiTransport> AcquisitionSession<T> {
    pub fn new(device: Max30003<T>, config: DeviceConfiguration) -> Self {
        Self {
            device,
            config,
            decode_mode: DecodeMode::default(),
            poll_interval: None,
            state: SessionState::Idle,
            warnings: Vec::new(),
        }
    }

    /// Validate settings, build register words and carry their fallback
    /// warnings into the report
    pub fn from_settings(transport: T, settings: &EcgSettings) -> EcgResult<Self> {
        Self::with_settings(Max30003::new(transport), settings)
    }

    /// [`AcquisitionSession::from_settings`] for an already wrapped device
    pub fn with_settings(device: Max30003<T>, settings: &EcgSettings) -> EcgResult<Self> {
        settings.validate()?;
        let (config, warnings) = settings.device_configuration();

        Ok(Self::new(device, config)
            .with_decode_mode(settings.acquisition.decode_mode)
            .with_poll_interval(settings.acquisition.poll_interval())
            .with_warnings(warnings))
    }

    pub fn with_decode_mode(mut self, mode: DecodeMode) -> Self {
        self.decode_mode = mode;
        self
    }

    /// `None` busy-polls
    pub fn with_poll_interval(mut self, interval: Option<Duration>) -> Self {
        self.poll_interval = interval.filter(|d| !d.is_zero());
        self
    }

    /// Warnings raised before the session, reported first
    pub fn with_warnings(mut self, warnings: Vec<EcgError>) -> Self {
        self.warnings.extend(warnings);
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn configuration(&self) -> &DeviceConfiguration {
        &self.config
    }

    pub fn into_device(self) -> Max30003<T> {
        self.device
    }

    /// Initialize the chip and collect samples
    pub fn run(&mut self) -> Result<AcquisitionReport, SessionFailure> {
        if self.state != SessionState::Idle {
            let error = EcgError::invalid_parameter(
                "session",
                format!("session already {}, start a new one", self.state),
            );
            return Err(SessionFailure {
                error,
                report: AcquisitionReport {
                    samples: SampleBuffer::empty(),
                    warnings: Vec::new(),
                    state: self.state,
                    elapsed: Duration::ZERO,
                    iterations: 0,
                    overflow_count: 0,
                },
            });
        }

        let mut report = AcquisitionReport {
            samples: SampleBuffer::empty(),
            warnings: std::mem::take(&mut self.warnings),
            state: SessionState::Initializing,
            elapsed: Duration::ZERO,
            iterations: 0,
            overflow_count: 0,
        };
        self.state = SessionState::Initializing;

        match SampleBuffer::with_capacity(self.config.sample_count) {
            Ok(buffer) => report.samples = buffer,
            Err(error) => return Err(self.fail(error, report)),
        }

        info!(
            samples = self.config.sample_count,
            timeout = ?self.config.effective_timeout(),
            mode = %self.decode_mode,
            "initializing MAX30003"
        );
        if let Err(error) = self.initialize() {
            return Err(self.fail(error, report));
        }

        self.state = SessionState::Polling;
        report.state = SessionState::Polling;
        info!("polling ECG FIFO");

        match self.poll(&mut report) {
            Ok(()) => {
                self.state = SessionState::Done;
                report.state = SessionState::Done;
                info!(
                    samples = report.samples.len(),
                    iterations = report.iterations,
                    elapsed = ?report.elapsed,
                    "acquisition complete"
                );
                Ok(report)
            }
            Err(error @ EcgError::Timeout { .. }) => {
                self.state = SessionState::TimedOut;
                report.state = SessionState::TimedOut;
                warn!(%error, "acquisition window closed");
                Err(SessionFailure { error, report })
            }
            Err(error) => Err(self.fail(error, report)),
        }
    }

    fn fail(&mut self, error: EcgError, mut report: AcquisitionReport) -> SessionFailure {
        self.state = SessionState::Failed;
        report.state = SessionState::Failed;
        error!(%error, "acquisition failed");
        SessionFailure { error, report }
    }

    fn initialize(&mut self) -> EcgResult<()> {
        self.device.software_reset()?;
        for (address, value) in self.config.init_writes() {
            self.device.write_register(address, value)?;
        }
        self.device.synchronize()
    }

    fn poll(&mut self, report: &mut AcquisitionReport) -> EcgResult<()> {
        let timeout = self.config.effective_timeout();
        let start = Instant::now();
        let mut overflowing = false;

        while !report.samples.is_full() {
            report.elapsed = start.elapsed();
            if report.elapsed >= timeout {
                return Err(EcgError::Timeout {
                    collected: report.samples.len(),
                    target: report.samples.capacity(),
                    elapsed: report.elapsed,
                });
            }
            report.iterations += 1;

            let status = self.device.read_status()?;
            if status.fifo_overflow() {
                report.overflow_count += 1;
                if !overflowing {
                    let warning = EcgError::FifoOverflow {
                        iteration: report.iterations,
                        collected: report.samples.len(),
                    };
                    warn!(%warning, "ECG FIFO overflow");
                    report.warnings.push(warning);
                }
            }
            overflowing = status.fifo_overflow();

            let fifo_ready = match self.decode_mode {
                DecodeMode::Compatible => true,
                DecodeMode::Strict => status.fifo_interrupt(),
            };
            if fifo_ready {
                let sample = self.device.read_fifo_sample()?;
                if sample.is_accepted(self.decode_mode) {
                    // Loop condition guarantees room
                    let _ = report.samples.push(sample.value());
                } else {
                    debug!(etag = ?sample.etag(), iteration = report.iterations, "FIFO word skipped");
                }
            }

            if let Some(interval) = self.poll_interval {
                std::thread::sleep(interval);
            }
        }

        report.elapsed = start.elapsed();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::status::flags;
    use crate::hal::{Fault, Max30003Simulator};
    use crate::registers::{address, EcgGain};

    fn config(samples: usize) -> DeviceConfiguration {
        DeviceConfiguration {
            sample_count: samples,
            timeout: Duration::from_millis(200),
            ..DeviceConfiguration::default()
        }
    }

    #[test]
    fn test_collects_target_count() {
        let mut sim = Max30003Simulator::new();
        sim.push_samples([1, -2, 3]);
        let mut session = AcquisitionSession::new(Max30003::new(&mut sim), config(3));

        let report = session.run().unwrap();
        assert_eq!(report.state, SessionState::Done);
        assert_eq!(report.samples.len(), 3);
        assert_eq!(report.samples[1] >> 14, -2);
        assert!(report.warnings.is_empty());
        assert_eq!(session.state(), SessionState::Done);
    }

    #[test]
    fn test_init_sequence_order() {
        let mut sim = Max30003Simulator::new();
        sim.push_samples([9]);
        let cfg = config(1).with(EcgGain::V160);
        AcquisitionSession::new(Max30003::new(&mut sim), cfg.clone()).run().unwrap();

        let addresses: Vec<u8> = sim.writes().iter().map(|(a, _)| *a).collect();
        assert_eq!(
            addresses,
            vec![
                address::SW_RST,
                address::CNFG_GEN,
                address::CNFG_CAL,
                address::CNFG_EMUX,
                address::CNFG_ECG,
                address::CNFG_RTOR1,
                address::MNGR_INT,
                address::SYNCH,
            ]
        );
        assert_eq!(sim.writes()[4].1, cfg.cnfg_ecg);
    }

    #[test]
    fn test_zero_words_are_skipped_in_compatible_mode() {
        let mut sim = Max30003Simulator::new();
        sim.push_samples([0, 4, 0, 5]);
        let report = AcquisitionSession::new(Max30003::new(&mut sim), config(2))
            .run()
            .unwrap();
        let values: Vec<i32> = report.samples.iter().map(|v| v >> 14).collect();
        assert_eq!(values, vec![4, 5]);
    }

    #[test]
    fn test_timeout_returns_partial_buffer() {
        let mut sim = Max30003Simulator::new();
        sim.push_samples([7]);
        let mut cfg = config(4);
        cfg.timeout = Duration::from_millis(20);

        let failure = AcquisitionSession::new(Max30003::new(&mut sim), cfg)
            .run()
            .unwrap_err();
        assert!(failure.is_partial());
        assert_eq!(failure.report.state, SessionState::TimedOut);
        assert_eq!(failure.report.samples.len(), 1);
        match failure.error {
            EcgError::Timeout { collected, target, .. } => {
                assert_eq!(collected, 1);
                assert_eq!(target, 4);
            }
            other => panic!("Expected timeout, got {:?}", other),
        }
    }

    #[test]
    fn test_overflow_recorded_once_per_episode() {
        let mut sim = Max30003Simulator::new();
        sim.script_status([flags::EOVF, flags::EOVF | flags::EINT, 0, flags::EOVF]);
        sim.push_samples([1, 2, 3, 4]);

        let report = AcquisitionSession::new(Max30003::new(&mut sim), config(4))
            .run()
            .unwrap();
        assert_eq!(report.overflow_count, 3);
        let overflows: Vec<u64> = report
            .warnings
            .iter()
            .filter_map(|w| match w {
                EcgError::FifoOverflow { iteration, .. } => Some(*iteration),
                _ => None,
            })
            .collect();
        assert_eq!(overflows, vec![1, 4]);
    }

    #[test]
    fn test_bus_failure_during_init_fails_session() {
        let mut sim = Max30003Simulator::new();
        sim.inject(Fault::WriteTo(address::CNFG_EMUX));
        let failure = AcquisitionSession::new(Max30003::new(&mut sim), config(1))
            .run()
            .unwrap_err();

        assert_eq!(failure.report.state, SessionState::Failed);
        assert!(failure.error.is_fatal());
        assert_eq!(sim.read_count(address::STATUS), 0);
    }

    #[test]
    fn test_session_runs_once() {
        let mut sim = Max30003Simulator::new();
        sim.push_samples([1]);
        let mut session = AcquisitionSession::new(Max30003::new(&mut sim), config(1));
        session.run().unwrap();

        let failure = session.run().unwrap_err();
        assert!(matches!(failure.error, EcgError::InvalidParameter { parameter: "session", .. }));
        assert_eq!(failure.report.state, SessionState::Done);
    }

    #[test]
    fn test_strict_mode_waits_for_interrupt() {
        let mut sim = Max30003Simulator::new();
        sim.script_status([0, 0]);
        sim.push_samples([0, 6]);

        let report = AcquisitionSession::new(Max30003::new(&mut sim), config(2))
            .with_decode_mode(DecodeMode::Strict)
            .run()
            .unwrap();
        let values: Vec<i32> = report.samples.iter().map(|v| v >> 14).collect();
        assert_eq!(values, vec![0, 6]);
        assert_eq!(report.iterations, 4);
    }

    #[test]
    fn test_failure_display_names_state() {
        let mut sim = Max30003Simulator::new();
        sim.fail_reads_of(address::STATUS);
        let failure = AcquisitionSession::new(Max30003::new(&mut sim), config(1))
            .run()
            .unwrap_err();
        assert!(failure.to_string().starts_with("acquisition failed: bus read failed"));
    }
}
