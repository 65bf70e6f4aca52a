//! Fixed-rate tick scheduler driving the whole pipeline

use crate::classifier::StateClassifier;
use crate::config::RuntimeConfig;
use neurocast_core::{
    AcquisitionSource, BandPowerSummary, BandPowers, CastError, CastResult, FeatureVector,
    MentalStateEstimate, SampleWindow, SessionInfo,
};
use neurocast_dispatch::OutputDispatcher;
use neurocast_processing::{
    AggregatorConfig, FeatureAggregator, SignalConditioner, SpectralAnalyzer,
};
use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{info, warn};

/// Scheduler lifecycle; transitions are one-way
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    Stopping,
    Stopped,
}

/// Commands accepted while the scheduler is running
#[derive(Debug, Clone)]
pub enum SchedulerCommand {
    Stop,
}

/// Everything one tick produced, broadcast to subscribers.
///
/// Carries the conditioned channel windows so visual consumers can render
/// traces without re-running the filter chains.
#[derive(Debug, Clone)]
pub struct TickOutcome {
    /// Monotonic tick counter, starting at 1
    pub tick: u64,
    /// Conditioned window per channel, layout order
    pub conditioned: Vec<Vec<f32>>,
    /// Full band table integrated per EEG channel, layout order
    pub band_powers: Vec<BandPowers>,
    /// Cross-channel band-power summary
    pub summary: BandPowerSummary,
    /// Feature vector fed to the models
    pub features: FeatureVector,
    /// Mental-state scores for this tick
    pub estimate: MentalStateEstimate,
}

/// Owns every pipeline stage and runs them in sequence once per tick.
///
/// Ticks never overlap: the whole pipeline runs inline in one task, and a
/// tick that overruns its interval delays the next one rather than stacking.
/// Per-tick failures skip the tick; only a lost acquisition session stops
/// the run.
pub struct Scheduler {
    config: RuntimeConfig,
    session: SessionInfo,
    source: Box<dyn AcquisitionSource>,
    conditioner: SignalConditioner,
    analyzer: SpectralAnalyzer,
    aggregator: FeatureAggregator,
    classifier: StateClassifier,
    dispatcher: OutputDispatcher,
    outcome_tx: broadcast::Sender<TickOutcome>,
    command_tx: mpsc::Sender<SchedulerCommand>,
    command_rx: mpsc::Receiver<SchedulerCommand>,
    state: SchedulerState,
    window_samples: usize,
    tick_count: u64,
}

impl Scheduler {
    pub fn new(
        config: RuntimeConfig,
        source: Box<dyn AcquisitionSource>,
        classifier: StateClassifier,
        dispatcher: OutputDispatcher,
    ) -> CastResult<Self> {
        config.validate()?;

        let sampling_rate = source.sampling_rate();
        let conditioner = SignalConditioner::new(config.conditioner.clone(), sampling_rate)?;
        let analyzer = SpectralAnalyzer::new(config.spectral.clone(), sampling_rate)?;
        let aggregator = FeatureAggregator::new(AggregatorConfig {
            composition: config.composition,
            history_capacity: config.history_capacity(),
        })?;

        let window_samples = (config.window_secs * sampling_rate) as usize;
        if window_samples < analyzer.nfft() {
            return Err(CastError::ConfigurationError {
                message: format!(
                    "Window of {} samples cannot cover one FFT segment of {}",
                    window_samples,
                    analyzer.nfft()
                ),
            });
        }

        let session = SessionInfo::new(source.channel_layout().clone(), sampling_rate);
        let (outcome_tx, _) = broadcast::channel(16);
        let (command_tx, command_rx) = mpsc::channel(8);

        Ok(Scheduler {
            config,
            session,
            source,
            conditioner,
            analyzer,
            aggregator,
            classifier,
            dispatcher,
            outcome_tx,
            command_tx,
            command_rx,
            state: SchedulerState::Idle,
            window_samples,
            tick_count: 0,
        })
    }

    /// Receiver for per-tick results; lagging subscribers miss outcomes,
    /// they never stall the pipeline
    pub fn subscribe(&self) -> broadcast::Receiver<TickOutcome> {
        self.outcome_tx.subscribe()
    }

    /// Handle for sending commands from other tasks
    pub fn control_handle(&self) -> mpsc::Sender<SchedulerCommand> {
        self.command_tx.clone()
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn session(&self) -> &SessionInfo {
        &self.session
    }

    /// Drive the pipeline until stopped or the session is lost.
    ///
    /// Models are prepared before the first tick; teardown releases models
    /// and closes the source exactly once regardless of how the loop ends.
    pub async fn run(&mut self) -> CastResult<()> {
        if self.state != SchedulerState::Idle {
            return Err(CastError::ConfigurationError {
                message: format!("Scheduler cannot start from state {:?}", self.state),
            });
        }

        self.classifier.prepare_all()?;
        self.state = SchedulerState::Running;
        info!(
            session = %self.session.id,
            interval_ms = self.config.tick_interval_ms,
            window_samples = self.window_samples,
            "Pipeline started"
        );

        let mut ticker = interval(Duration::from_millis(self.config.tick_interval_ms));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let run_result = loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.run_tick() {
                        Ok(()) => {}
                        Err(e) if e.is_fatal() => {
                            warn!(error = %e, "Acquisition session lost, stopping pipeline");
                            break Err(e);
                        }
                        Err(e) => {
                            warn!(tick = self.tick_count, error = %e, "Tick skipped");
                        }
                    }
                }
                command = self.command_rx.recv() => {
                    match command {
                        Some(SchedulerCommand::Stop) | None => break Ok(()),
                    }
                }
            }
        };

        self.state = SchedulerState::Stopping;
        self.classifier.release_all();
        if let Err(e) = self.source.close() {
            warn!(error = %e, "Acquisition close failed during shutdown");
        }
        self.state = SchedulerState::Stopped;
        info!(ticks = self.tick_count, "Pipeline stopped");

        run_result
    }

    /// One full pipeline pass: snapshot, condition, analyze, classify,
    /// dispatch, broadcast
    fn run_tick(&mut self) -> CastResult<()> {
        self.tick_count += 1;

        // Over-fetch so the window always has fresh data to truncate into
        let snapshot = self.source.latest_samples(self.window_samples * 2)?;
        let window = SampleWindow::from_snapshot(snapshot, self.window_samples)?;

        let mut conditioned = Vec::with_capacity(self.session.layout.len());
        for channel in self.session.layout.channels() {
            let raw = window.channel(channel.index)?;
            match self.conditioner.apply(channel.kind, raw) {
                Ok(filtered) => conditioned.push(filtered),
                Err(e) => {
                    warn!(channel = %channel.name, error = %e, "Conditioning failed, substituting zeros");
                    conditioned.push(vec![0.0; raw.len()]);
                }
            }
        }

        let eeg: Vec<Vec<f32>> = self
            .session
            .layout
            .eeg_indices()
            .iter()
            .map(|&i| conditioned[i].clone())
            .collect();

        // Full per-channel band table, for display consumers that read the
        // overlapping mu/smr ranges
        let mut band_powers = Vec::with_capacity(eeg.len());
        for samples in &eeg {
            match self.analyzer.band_powers(samples) {
                Ok(powers) => band_powers.push(powers),
                Err(e) => {
                    warn!(error = %e, "Band integration failed, substituting zeros");
                    band_powers.push(BandPowers::zeros(self.analyzer.channel_bands()));
                }
            }
        }

        let summary = self.analyzer.summarize(&eeg)?;
        let features = self.aggregator.build(&summary);
        self.aggregator.push_history(features.clone());
        let estimate = self.classifier.predict_all(&features);

        let mut values: Vec<(String, f32)> = estimate
            .fresh_values()
            .map(|(name, v)| (name.to_string(), v))
            .collect();
        if self.config.dispatch_band_means {
            for (band, mean) in summary.named_means() {
                values.push((format!("band/{}", band), mean));
            }
        }
        let refs: Vec<(&str, f32)> = values.iter().map(|(n, v)| (n.as_str(), *v)).collect();
        self.dispatcher.dispatch(&refs);

        // Ignore the send error when nobody is subscribed
        let _ = self.outcome_tx.send(TickOutcome {
            tick: self.tick_count,
            conditioned,
            band_powers,
            summary,
            features,
            estimate,
        });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::BandRatioModel;
    use neurocast_core::{ChannelKind, ChannelLayout, StateModel, StateScore};
    use neurocast_dispatch::{DispatchPolicy, MemorySink};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::time::sleep;

    const FS: f32 = 250.0;

    /// Acquisition fake: fixed sine on EEG channels, silence elsewhere
    struct SineSource {
        layout: ChannelLayout,
        closes: Arc<AtomicUsize>,
        fail_after: Option<usize>,
        calls: usize,
    }

    impl SineSource {
        fn new(closes: Arc<AtomicUsize>) -> Self {
            SineSource {
                layout: ChannelLayout::headset_8ch(),
                closes,
                fail_after: None,
                calls: 0,
            }
        }
    }

    impl AcquisitionSource for SineSource {
        fn channel_layout(&self) -> &ChannelLayout {
            &self.layout
        }

        fn sampling_rate(&self) -> f32 {
            FS
        }

        fn latest_samples(&mut self, n: usize) -> CastResult<Vec<Vec<f32>>> {
            self.calls += 1;
            if let Some(limit) = self.fail_after {
                if self.calls > limit {
                    return Err(CastError::SessionLost {
                        reason: "Headset disconnected".to_string(),
                    });
                }
            }
            let channels = self
                .layout
                .channels()
                .iter()
                .map(|ch| {
                    if ch.kind == ChannelKind::Eeg {
                        (0..n)
                            .map(|i| {
                                20.0 * (2.0 * std::f32::consts::PI * 10.0 * i as f32 / FS).sin()
                            })
                            .collect()
                    } else {
                        vec![0.0; n]
                    }
                })
                .collect();
            Ok(channels)
        }

        fn close(&mut self) -> CastResult<()> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct CountingModel {
        prepares: Arc<AtomicUsize>,
        releases: Arc<AtomicUsize>,
    }

    impl StateModel for CountingModel {
        fn state_name(&self) -> &str {
            "counting"
        }
        fn prepare(&mut self) -> CastResult<()> {
            self.prepares.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        fn predict(&mut self, _features: &FeatureVector) -> CastResult<f32> {
            Ok(0.5)
        }
        fn release(&mut self) -> CastResult<()> {
            self.releases.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn fast_config() -> RuntimeConfig {
        RuntimeConfig {
            window_secs: 2.0,
            tick_interval_ms: 10,
            ..RuntimeConfig::default()
        }
    }

    #[tokio::test]
    async fn test_run_produces_outcomes_and_stops_cleanly() {
        let closes = Arc::new(AtomicUsize::new(0));
        let prepares = Arc::new(AtomicUsize::new(0));
        let releases = Arc::new(AtomicUsize::new(0));

        let classifier = StateClassifier::new(vec![
            Box::new(BandRatioModel::relaxation().unwrap()),
            Box::new(CountingModel {
                prepares: Arc::clone(&prepares),
                releases: Arc::clone(&releases),
            }),
        ]);

        let sink = MemorySink::new();
        let batches = sink.batches();
        let mut dispatcher = OutputDispatcher::new(2);
        dispatcher.add_sink(Box::new(sink), DispatchPolicy::Continuous);

        let mut scheduler = Scheduler::new(
            fast_config(),
            Box::new(SineSource::new(Arc::clone(&closes))),
            classifier,
            dispatcher,
        )
        .unwrap();

        let mut outcomes = scheduler.subscribe();
        let control = scheduler.control_handle();
        let handle = tokio::spawn(async move { scheduler.run().await });

        let outcome = outcomes.recv().await.unwrap();
        assert_eq!(outcome.tick, 1);
        assert_eq!(outcome.conditioned.len(), 14);

        // Full band table per EEG channel, including the overlapping ranges
        assert_eq!(outcome.band_powers.len(), 8);
        for powers in &outcome.band_powers {
            let mu = powers.get("mu").unwrap();
            let smr = powers.get("smr").unwrap();
            assert!(mu > 0.0, "10Hz tone sits inside mu, got {}", mu);
            assert!(mu > smr, "mu {} should exceed smr {}", mu, smr);
        }

        // 10Hz tone lands in alpha, so relaxation should be high
        match outcome.estimate.get("relaxation") {
            Some(StateScore::Fresh(v)) => assert!(v > 0.6, "relaxation {}", v),
            other => panic!("expected fresh relaxation score, got {:?}", other),
        }

        sleep(Duration::from_millis(50)).await;
        control.send(SchedulerCommand::Stop).await.unwrap();
        handle.await.unwrap().unwrap();

        assert_eq!(closes.load(Ordering::SeqCst), 1);
        assert_eq!(prepares.load(Ordering::SeqCst), 1);
        assert_eq!(releases.load(Ordering::SeqCst), 1);
        assert!(!batches.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_band_means_dispatched_as_topics() {
        let closes = Arc::new(AtomicUsize::new(0));
        let sink = MemorySink::new();
        let batches = sink.batches();
        let mut dispatcher = OutputDispatcher::new(2);
        dispatcher.add_sink(Box::new(sink), DispatchPolicy::Continuous);

        let classifier =
            StateClassifier::new(vec![Box::new(BandRatioModel::relaxation().unwrap())]);
        let config = RuntimeConfig {
            dispatch_band_means: true,
            ..fast_config()
        };
        let mut scheduler = Scheduler::new(
            config,
            Box::new(SineSource::new(Arc::clone(&closes))),
            classifier,
            dispatcher,
        )
        .unwrap();

        let mut outcomes = scheduler.subscribe();
        let control = scheduler.control_handle();
        let handle = tokio::spawn(async move { scheduler.run().await });

        outcomes.recv().await.unwrap();
        control.send(SchedulerCommand::Stop).await.unwrap();
        handle.await.unwrap().unwrap();

        let batches = batches.lock().unwrap();
        let topics: Vec<&str> = batches[0].iter().map(|m| m.topic.as_str()).collect();
        assert!(topics.contains(&"relaxation"));
        for band in ["delta", "theta", "alpha", "beta", "gamma"] {
            let topic = format!("band/{}", band);
            assert!(topics.contains(&topic.as_str()), "missing topic {}", topic);
        }
    }

    #[tokio::test]
    async fn test_session_lost_stops_run_with_error() {
        let closes = Arc::new(AtomicUsize::new(0));
        let mut source = SineSource::new(Arc::clone(&closes));
        source.fail_after = Some(2);

        let classifier =
            StateClassifier::new(vec![Box::new(BandRatioModel::relaxation().unwrap())]);
        let mut scheduler = Scheduler::new(
            fast_config(),
            Box::new(source),
            classifier,
            OutputDispatcher::new(2),
        )
        .unwrap();

        let result = scheduler.run().await;
        assert!(matches!(result, Err(CastError::SessionLost { .. })));
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stopped_scheduler_cannot_restart() {
        let closes = Arc::new(AtomicUsize::new(0));
        let classifier =
            StateClassifier::new(vec![Box::new(BandRatioModel::relaxation().unwrap())]);
        let mut scheduler = Scheduler::new(
            fast_config(),
            Box::new(SineSource::new(Arc::clone(&closes))),
            classifier,
            OutputDispatcher::new(2),
        )
        .unwrap();

        let control = scheduler.control_handle();
        control.send(SchedulerCommand::Stop).await.unwrap();
        scheduler.run().await.unwrap();

        assert!(matches!(
            scheduler.run().await,
            Err(CastError::ConfigurationError { .. })
        ));
        // Teardown ran during the first stop only
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_window_shorter_than_fft_segment_rejected() {
        let closes = Arc::new(AtomicUsize::new(0));
        let classifier =
            StateClassifier::new(vec![Box::new(BandRatioModel::relaxation().unwrap())]);
        let config = RuntimeConfig {
            // 0.5s at 250Hz is 125 samples, below the 256-sample segment
            window_secs: 0.5,
            ..RuntimeConfig::default()
        };
        let result = Scheduler::new(
            config,
            Box::new(SineSource::new(closes)),
            classifier,
            OutputDispatcher::new(2),
        );
        assert!(matches!(result, Err(CastError::ConfigurationError { .. })));
    }
}
