use anyhow::{Context, Result};
use clap::Parser;
use ftc_sync::{
	commands,
	config::{load_config, Args, Command, RuntimeConfig},
	logging::init_logging,
	repl,
	robot::RobotClient,
};
use std::sync::Arc;
use tracing::error;

#[tokio::main]
async fn main() {
	let args = Args::parse();
	let config = match load_config(&args) {
		Ok(config) => config,
		Err(err) => {
			eprintln!("invalid websocket url: {err}");
			std::process::exit(1);
		}
	};
	let _log_guard = init_logging(&config);

	let exit_code = match run(&config, &args.command).await {
		Ok(()) => 0,
		Err(err) => {
			error!("command_failed: {err:#}");
			if let Some(repl_err) = err.downcast_ref::<repl::ReplError>() {
				if !repl_err.shown_in_session() {
					eprintln!("{err:#}");
				}
			} else {
				eprintln!("{err:#}");
			}
			1
		}
	};
	// Background readers may still be parked on stdin or the socket.
	std::process::exit(exit_code);
}

async fn run(config: &RuntimeConfig, command: &Command) -> Result<()> {
	let client = RobotClient::new(config).context("failed to build http client")?;
	match command {
		Command::Repl => {
			let poller: Arc<dyn repl::watcher::BuildPoller> = Arc::new(client);
			repl::run(&config.ws_url, poller).await?;
		}
		Command::Ping => commands::ping(&client).await?,
		Command::Tree => commands::tree(&client).await?,
		Command::Pull { file } => commands::pull(&client, file).await?,
		Command::Push { file, source } => commands::push(&client, file, source.as_deref()).await?,
	}
	Ok(())
}
