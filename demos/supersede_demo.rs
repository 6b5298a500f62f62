//! Supersede Demo
//!
//! Starts a long stimulation operation, retunes the channel mid-run, and
//! supersedes the operation with `update`. The first handle reports
//! `Cancelled`, the replacement runs its own full duration, and the session
//! is torn down cleanly.

use std::time::Duration;
use stim_core::config::SupervisorSettings;
use stim_core::device::simulated::{SimulatedSession, SimulatedSessionConfig};
use stim_core::{
    ChannelConfig, StimulationDuration, StimulationMode, StimulationRequest,
    StimulationSupervisor,
};

async fn ticker(duration: Duration, label: &str) {
    let started = tokio::time::Instant::now();
    let mut tick = tokio::time::interval(Duration::from_secs(1));
    while started.elapsed() < duration {
        tick.tick().await;
        println!("[{label}] tick at {:?}", started.elapsed());
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("stim-core Supersede Demo");
    println!("========================");

    let session = SimulatedSession::open(SimulatedSessionConfig::default())?;
    let log = session.command_log();
    let supervisor = StimulationSupervisor::new(session, SupervisorSettings::default())?;

    let mut channel = ChannelConfig::new(1).with_name("Calf");
    channel.amplitude_ma = 25.0;
    channel.pulse_width_us = 100;
    channel.frequency_hz = 50.0;
    channel.ramp_pulses = Some(16);

    println!("Initializing stimulation channels...");
    supervisor.initialize(std::slice::from_ref(&channel)).await?;

    println!("Starting initial stimulation for 10 seconds...");
    let mut first = supervisor
        .start(StimulationRequest::new(
            std::slice::from_ref(&channel),
            StimulationDuration::seconds(10.0),
            true,
        ))
        .await?;

    let ticker_task = tokio::spawn(ticker(Duration::from_secs(12), "Stimulation Ticker"));

    // Let the initial operation run for 3 seconds before superseding it.
    tokio::time::sleep(Duration::from_secs(3)).await;
    println!("Retuning channel and requesting an update...");

    channel.amplitude_ma = 15.0;
    channel.pulse_width_us = 200;
    channel.frequency_hz = 10.0;
    channel.mode = StimulationMode::Triplet;

    let mut second = supervisor
        .update(StimulationRequest::new(
            std::slice::from_ref(&channel),
            StimulationDuration::seconds(8.0),
            true,
        ))
        .await?;

    println!("First operation outcome:  {:?}", first.wait().await);
    println!("Second operation outcome: {:?}", second.wait().await);
    ticker_task.await?;

    println!("Ending stimulation...");
    supervisor.end().await?;

    println!("Closing device session...");
    supervisor.close().await?;

    println!();
    println!("Commands observed by the device:");
    for command in log.lock().iter() {
        println!("  {command:?}");
    }

    Ok(())
}
