use super::{
	channel::EventSender,
	watcher::{spawn_build_watcher, BuildPoller},
};
use ftc_core::{build_launch, encode_event};
use futures_util::{Sink, SinkExt};
use std::{
	fmt::Display,
	io::{self, Write},
	sync::Arc,
	time::Duration,
};
use tokio_tungstenite::tungstenite::Message;
use tracing::{info, warn};

/// Upper bound on handing the launch frame to the socket. The session loop
/// is parked while the send is pending.
pub const SEND_TIMEOUT: Duration = Duration::from_secs(2);

pub const HELP_LINES: [&str; 4] = [
	"  build - Trigger a build",
	"  help  - Show this help",
	"  exit  - Exit the REPL",
	"  quit  - Exit the REPL",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
	Build,
	Help,
	Exit,
	Quit,
	Unknown(String),
}

impl Command {
	/// `None` for blank input, which is never dispatched.
	pub fn parse(line: &str) -> Option<Self> {
		let trimmed = line.trim();
		let command = match trimmed {
			"" => return None,
			"build" => Self::Build,
			"help" => Self::Help,
			"exit" => Self::Exit,
			"quit" => Self::Quit,
			other => Self::Unknown(other.to_string()),
		};
		Some(command)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
	Continue,
	Exit,
}

/// Borrowed view of the session state a command may touch.
pub struct Dispatcher<'a, S, W> {
	pub sink: &'a mut S,
	pub out: &'a mut W,
	pub events: &'a EventSender,
	pub poller: &'a Arc<dyn BuildPoller>,
}

impl<'a, S, W> Dispatcher<'a, S, W>
where
	S: Sink<Message> + Unpin,
	S::Error: Display,
	W: Write,
{
	pub async fn dispatch(self, command: Command) -> io::Result<Dispatch> {
		match command {
			Command::Exit | Command::Quit => Ok(Dispatch::Exit),
			Command::Help => {
				for line in HELP_LINES {
					write!(self.out, "{line}\r\n")?;
				}
				Ok(Dispatch::Continue)
			}
			Command::Unknown(text) => {
				write!(
					self.out,
					"Unknown command: {text} (type 'help' for available commands)\r\n"
				)?;
				Ok(Dispatch::Continue)
			}
			Command::Build => {
				self.launch_build().await?;
				Ok(Dispatch::Continue)
			}
		}
	}

	async fn launch_build(self) -> io::Result<()> {
		write!(self.out, "Triggering build...\r\n")?;
		self.out.flush()?;
		let frame = match encode_event(&build_launch()) {
			Ok(frame) => frame,
			Err(err) => {
				write!(self.out, "Error sending build command: {err}\r\n")?;
				return Ok(());
			}
		};
		let send = tokio::time::timeout(SEND_TIMEOUT, self.sink.send(Message::Text(frame)));
		let failure = match send.await {
			Ok(Ok(())) => None,
			Ok(Err(err)) => Some(err.to_string()),
			Err(_) => Some(format!("timed out after {}ms", SEND_TIMEOUT.as_millis())),
		};
		if let Some(err) = failure {
			warn!("build_launch_send_error: {err}");
			write!(self.out, "Error sending build command: {err}\r\n")?;
			return Ok(());
		}
		info!("build_launch_sent");
		write!(self.out, "Build command sent! Waiting for events...\r\n")?;
		spawn_build_watcher(self.poller.clone(), self.events.clone());
		Ok(())
	}
}
