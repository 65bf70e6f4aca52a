//! Neurocast pipeline entry point: synthetic headset to OSC control stream

use anyhow::Result;
use neurocast_dispatch::{DispatchPolicy, OscSink, OutputDispatcher, UdpBatchSink};
use neurocast_runtime::{
    BandRatioModel, RuntimeConfig, Scheduler, SchedulerCommand, StateClassifier,
};
use neurocast_simulation::{BoardConfig, SyntheticBoard};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let config = match std::env::args().nth(1) {
        Some(path) => {
            info!(path = %path, "Loading configuration");
            RuntimeConfig::from_json(&std::fs::read_to_string(&path)?)?
        }
        None => RuntimeConfig::default(),
    };

    let board = SyntheticBoard::new(BoardConfig {
        real_time: true,
        ..BoardConfig::default()
    })?;

    let mut dispatcher = OutputDispatcher::new(config.precision);
    // The OSC control stream is always-on: consumers expect a value every
    // tick even when it is unchanged
    dispatcher.add_sink(
        Box::new(OscSink::new(&config.osc_target, &config.osc_address)?),
        DispatchPolicy::Continuous,
    );
    if let Some(target) = &config.batch_target {
        dispatcher.add_sink(
            Box::new(UdpBatchSink::new(target)?),
            DispatchPolicy::Deduplicated,
        );
    }

    let classifier = StateClassifier::new(vec![
        Box::new(BandRatioModel::relaxation()?),
        Box::new(BandRatioModel::concentration()?),
    ]);

    let mut scheduler = Scheduler::new(config, Box::new(board), classifier, dispatcher)?;
    info!(session = %scheduler.session().id, "Session opened");

    let control = scheduler.control_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown requested");
            let _ = control.send(SchedulerCommand::Stop).await;
        }
    });

    scheduler.run().await?;
    Ok(())
}
