//! relay-agent: run one cooperative mission agent
//!
//! Usage: `relay-agent -I <instance> [--config relay.toml] [--auto-arm]`
//!
//! Instance `n` flies the simulated vehicle with system ID `n`, listens for
//! peers on the peer port of `n`, and hands off to agent `n + 1` when it
//! reaches its destination.

use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tokio::sync::mpsc;
use tracing::{error, info};

use relay_trail::agent::{Agent, AgentEvent, AgentOptions, EVENT_QUEUE_CAPACITY, RunSummary};
use relay_trail::cli::Cli;
use relay_trail::diagnostics;
use relay_trail::error::{AgentError, Result};
use relay_trail::link::LinkConfig;
use relay_trail::parameters::AgentParams;
use relay_trail::peer::{self, UdpPeerChannel};
use relay_trail::scheduler::{IntervalScheduler, LockstepScheduler, Scheduler};
use relay_trail_core::{AgentId, MissionController};
use relay_trail_sitl::{GcsLink, SimVehicle};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let params = match cli.params() {
        Ok(params) => params,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let _log_guard = diagnostics::init_logging(&params.log, cli.verbose);

    match run(&cli, &params).await {
        Ok(summary) => {
            info!(
                ticks = summary.ticks,
                missions = summary.missions_completed,
                total_energy_j = summary.total_energy_j,
                "Done"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli, params: &AgentParams) -> Result<RunSummary> {
    params.validate()?;

    let link = LinkConfig::for_instance(cli.instance);
    info!(
        instance = link.instance,
        vehicle = %link.vehicle,
        net_port = link.net_port,
        "Link resolved"
    );
    if cli.instance == 0 {
        return Err(AgentError::InvalidArgument(
            "instance 0 selects the serial flight controller, which this build does not drive; \
             use -I 1 or higher for a simulated vehicle"
                .to_string(),
        ));
    }

    let instance = AgentId(cli.instance);
    let (channel, receiver) = UdpPeerChannel::bind(params.peer_directory(), instance).await?;

    let (tx, rx) = mpsc::channel(EVENT_QUEUE_CAPACITY);
    peer::spawn_forwarder(receiver, tx.clone());

    let vehicle = SimVehicle::new(params.sim_config(instance))?;
    tx.send(AgentEvent::Attach(vehicle))
        .await
        .map_err(|_| AgentError::QueueClosed)?;
    drop(tx);

    let controller = MissionController::new(params.mission_config(), params.plan(), channel);
    let options = AgentOptions {
        max_ticks: cli.max_ticks,
        max_missions: cli.max_missions,
        auto_arm: cli.auto_arm,
    };
    let mut agent = Agent::new(controller, rx, options);
    if let Some(port) = cli.gcs_port {
        let gcs = GcsLink::new(cli.instance, port)?;
        info!(port, "Mirroring telemetry to ground station");
        agent = agent.with_mirror(Box::new(gcs));
    }

    let period = Duration::from_millis(u64::from(params.mission.tick_period_ms));
    let mut scheduler: Box<dyn Scheduler> = if cli.lockstep {
        Box::new(LockstepScheduler::new(period))
    } else {
        Box::new(IntervalScheduler::new(period))
    };

    let shutdown = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    Ok(agent.run(scheduler.as_mut(), shutdown).await)
}
