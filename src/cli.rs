//! Command-line surface of the console.

use std::{path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use callops_orchestrator::{
    CallGateway, CallSession, HttpGateway, NoopTransport, PollPhase, Synchronizer,
};
use callops_protocol::{CallId, CallSessionRequest, DashboardSummary};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use crate::{
    config::{ConsoleConfig, Overrides},
    render,
};

#[derive(Debug, Parser)]
#[command(name = "callops", version, about = "Operations console for AI driver calls")]
pub struct Cli {
    /// YAML configuration file.
    #[arg(long, global = true, env = "CALLOPS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Backend origin, e.g. http://localhost:8000.
    #[arg(long, global = true, env = "CALLOPS_BACKEND_URL")]
    pub backend_url: Option<String>,

    /// Poll interval for watch commands, in milliseconds.
    #[arg(long, global = true)]
    pub poll_interval_ms: Option<u64>,

    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log as JSON lines.
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            backend_url: self.backend_url.clone(),
            poll_interval_ms: self.poll_interval_ms,
            log_level: self.log_level.clone(),
            log_json: self.log_json,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Inspect call records.
    Calls {
        #[command(subcommand)]
        action: CallsAction,
    },
    /// Summary of recent activity.
    Dashboard {
        /// Keep polling and reprint on every change.
        #[arg(long)]
        watch: bool,
    },
    /// Request a test call session and print its ticket.
    Trigger(TriggerArgs),
}

#[derive(Debug, Subcommand)]
pub enum CallsAction {
    /// List all calls, newest first.
    List,
    /// Show one call with its transcript.
    Show { id: String },
    /// Follow one call until it completes or fails.
    Watch { id: String },
}

#[derive(Debug, Args)]
pub struct TriggerArgs {
    #[arg(long)]
    pub config_id: String,
    #[arg(long)]
    pub driver: String,
    #[arg(long)]
    pub load: String,
}

/// Execute `command` against the configured backend.
pub async fn run(command: Command, config: &ConsoleConfig) -> Result<()> {
    let gateway = HttpGateway::new(&config.orchestrator.gateway)
        .context("Failed to create backend client")?;
    let gateway: Arc<dyn CallGateway> = Arc::new(gateway);
    info!(backend = %config.orchestrator.gateway.base_url, "Using backend");

    match command {
        Command::Calls { action } => match action {
            CallsAction::List => {
                let records = gateway.list_call_records().await?;
                print!("{}", render::call_table(&records));
            }
            CallsAction::Show { id } => {
                let record = gateway.get_call_record(&CallId::new(id)).await?;
                print!("{}", render::call_detail(&record));
            }
            CallsAction::Watch { id } => watch_call(gateway, config, CallId::new(id)).await?,
        },
        Command::Dashboard { watch: false } => {
            let (records, configurations) =
                tokio::try_join!(gateway.list_call_records(), gateway.list_configurations())?;
            print!(
                "{}",
                render::dashboard(&DashboardSummary::new(&records, configurations))
            );
        }
        Command::Dashboard { watch: true } => watch_dashboard(gateway, config).await?,
        Command::Trigger(args) => trigger(gateway, config, args).await?,
    }
    Ok(())
}

async fn watch_call(
    gateway: Arc<dyn CallGateway>,
    config: &ConsoleConfig,
    id: CallId,
) -> Result<()> {
    let sync = Synchronizer::new(gateway, &config.orchestrator.sync);
    let handle = sync.watch_call(id.clone());
    let mut updates = handle.subscribe();

    loop {
        let snapshot = updates.borrow_and_update().clone();
        if let PollPhase::Unavailable(reason) = &snapshot.phase {
            bail!("Call {id} is unavailable: {reason}");
        }
        if let Some(record) = &snapshot.value {
            print!("{}", render::call_detail(record));
            if record.status.is_terminal() {
                return Ok(());
            }
            println!("--");
        }

        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
            }
            _ = tokio::signal::ctrl_c() => {
                handle.stop_polling();
                return Ok(());
            }
        }
    }
}

async fn watch_dashboard(gateway: Arc<dyn CallGateway>, config: &ConsoleConfig) -> Result<()> {
    let sync = Synchronizer::new(gateway, &config.orchestrator.sync);
    let handle = sync.watch_dashboard();
    let mut updates = handle.subscribe();

    loop {
        let snapshot = updates.borrow_and_update().clone();
        if let Some(summary) = &snapshot.value {
            print!("{}", render::dashboard(summary));
            if let Some(err) = &snapshot.last_error {
                println!("(last refresh failed: {err})");
            }
            println!("--");
        }

        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
            }
            _ = tokio::signal::ctrl_c() => {
                sync.shutdown();
                return Ok(());
            }
        }
    }
}

/// Create a session without opening audio; the ticket is printed and released.
async fn trigger(
    gateway: Arc<dyn CallGateway>,
    config: &ConsoleConfig,
    args: TriggerArgs,
) -> Result<()> {
    let session = CallSession::new(
        gateway,
        Arc::new(NoopTransport),
        &config.orchestrator.session,
    );
    let request = CallSessionRequest::new(args.config_id, args.driver, args.load);

    let result = session.submit(request).await;
    session.close().await;
    session.shutdown().await;

    let ticket = result.context("Failed to trigger call")?;
    print!("{}", render::ticket(&ticket));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trigger() {
        let cli = Cli::try_parse_from([
            "callops",
            "--backend-url",
            "http://backend:8000",
            "trigger",
            "--config-id",
            "cfg-1",
            "--driver",
            "Bilal Ahmed",
            "--load",
            "4556-B",
        ])
        .unwrap();

        assert_eq!(cli.backend_url.as_deref(), Some("http://backend:8000"));
        match cli.command {
            Command::Trigger(args) => {
                assert_eq!(args.config_id, "cfg-1");
                assert_eq!(args.driver, "Bilal Ahmed");
                assert_eq!(args.load, "4556-B");
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "callops",
            "calls",
            "watch",
            "c1",
            "--poll-interval-ms",
            "5000",
            "--log-json",
        ])
        .unwrap();

        let overrides = cli.overrides();
        assert_eq!(overrides.poll_interval_ms, Some(5_000));
        assert!(overrides.log_json);
        assert!(matches!(
            cli.command,
            Command::Calls {
                action: CallsAction::Watch { ref id }
            } if id == "c1"
        ));
    }

    #[test]
    fn test_trigger_requires_all_fields() {
        assert!(Cli::try_parse_from(["callops", "trigger", "--config-id", "cfg-1"]).is_err());
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
