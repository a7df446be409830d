use super::{
	channel::{EventReceiver, EventSender, SessionEvent},
	command::{Command, Dispatch, Dispatcher},
	terminal::{RawModeGuard, TerminalMode},
	watcher::BuildPoller,
};
use crossterm::{
	cursor::MoveToColumn,
	queue,
	style::Print,
	terminal::{Clear, ClearType},
};
use futures_util::{Sink, SinkExt};
use std::{
	fmt::Display,
	io::{self, Write},
	sync::Arc,
	time::Duration,
};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info};

pub const PROMPT: &str = "ftc> ";
pub const FAREWELL: &str = "Goodbye!";
pub const IDLE_TICK: Duration = Duration::from_millis(50);
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

const CTRL_C: u8 = 3;
const BACKSPACE: u8 = 8;
const DELETE: u8 = 127;

/// The not-yet-submitted input line. Only printable ASCII is ever stored.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LineBuffer {
	text: String,
}

impl LineBuffer {
	pub fn push(&mut self, ch: char) {
		self.text.push(ch);
	}

	/// Returns false when there was nothing to remove.
	pub fn backspace(&mut self) -> bool {
		self.text.pop().is_some()
	}

	pub fn take(&mut self) -> String {
		std::mem::take(&mut self.text)
	}

	pub fn as_str(&self) -> &str {
		&self.text
	}

	pub fn is_empty(&self) -> bool {
		self.text.is_empty()
	}
}

#[derive(Debug)]
pub enum SessionEnd {
	Quit,
	Interrupted,
	InputClosed,
	ConnectionLost(String),
	OutputFailed(io::Error),
}

enum Flow {
	Continue,
	End(SessionEnd),
}

/// Live REPL state. The session is the only writer of the terminal and the
/// only owner of the line buffer; everything else reaches it through the
/// event channel.
pub struct Session<M: TerminalMode, S, W> {
	terminal: RawModeGuard<M>,
	sink: S,
	out: W,
	buffer: LineBuffer,
	events: EventSender,
	poller: Arc<dyn BuildPoller>,
}

impl<M, S, W> Session<M, S, W>
where
	M: TerminalMode,
	S: Sink<Message> + Unpin,
	S::Error: Display,
	W: Write,
{
	pub fn new(
		terminal: RawModeGuard<M>,
		sink: S,
		out: W,
		events: EventSender,
		poller: Arc<dyn BuildPoller>,
	) -> Self {
		Self {
			terminal,
			sink,
			out,
			buffer: LineBuffer::default(),
			events,
			poller,
		}
	}

	/// Drives the session until it ends, then restores the terminal, closes
	/// the socket and says goodbye. Consuming `self` keeps that cleanup to a
	/// single run whichever way the session ended.
	pub async fn run(mut self, mut bytes: mpsc::Receiver<u8>, mut events: EventReceiver) -> SessionEnd {
		let end = match self.drive(&mut bytes, &mut events).await {
			Ok(end) => end,
			Err(err) => SessionEnd::OutputFailed(err),
		};
		info!(end = ?end, "repl_session_end");
		self.close().await;
		end
	}

	async fn drive(
		&mut self,
		bytes: &mut mpsc::Receiver<u8>,
		events: &mut EventReceiver,
	) -> io::Result<SessionEnd> {
		write!(
			self.out,
			"Type 'build' to trigger a build, 'exit' or 'quit' to leave the REPL.\r\n{PROMPT}"
		)?;
		self.out.flush()?;
		loop {
			// Pushed events win ties so a dead socket is noticed before more
			// keystrokes are processed.
			let flow = tokio::select! {
				biased;
				event = events.recv() => match event {
					Some(SessionEvent::Line(line)) => {
						self.show_event(&line)?;
						Flow::Continue
					}
					Some(SessionEvent::ConnectionLost(reason)) => {
						self.show_event(&reason)?;
						Flow::End(SessionEnd::ConnectionLost(reason))
					}
					None => Flow::End(SessionEnd::ConnectionLost("event channel closed".to_string())),
				},
				byte = bytes.recv() => match byte {
					Some(byte) => self.on_byte(byte).await?,
					None => Flow::End(SessionEnd::InputClosed),
				},
				_ = tokio::time::sleep(IDLE_TICK) => Flow::Continue,
			};
			self.out.flush()?;
			if let Flow::End(end) = flow {
				return Ok(end);
			}
		}
	}

	async fn on_byte(&mut self, byte: u8) -> io::Result<Flow> {
		match byte {
			b'\r' | b'\n' => {
				write!(self.out, "\r\n")?;
				let line = self.buffer.take();
				let Some(command) = Command::parse(&line) else {
					write!(self.out, "{PROMPT}")?;
					return Ok(Flow::Continue);
				};
				debug!(command = ?command, "repl_command");
				let dispatch = Dispatcher {
					sink: &mut self.sink,
					out: &mut self.out,
					events: &self.events,
					poller: &self.poller,
				}
				.dispatch(command)
				.await?;
				if dispatch == Dispatch::Exit {
					return Ok(Flow::End(SessionEnd::Quit));
				}
				write!(self.out, "{PROMPT}")?;
			}
			BACKSPACE | DELETE => {
				if self.buffer.backspace() {
					self.redraw_line()?;
				}
			}
			CTRL_C => {
				write!(self.out, "\r\n")?;
				return Ok(Flow::End(SessionEnd::Interrupted));
			}
			32..=126 => {
				let ch = byte as char;
				self.buffer.push(ch);
				queue!(self.out, Print(ch))?;
			}
			_ => {}
		}
		Ok(Flow::Continue)
	}

	/// Prints `text` above the prompt and puts the in-progress line back.
	fn show_event(&mut self, text: &str) -> io::Result<()> {
		let text = terminal_lines(text);
		queue!(
			self.out,
			MoveToColumn(0),
			Clear(ClearType::CurrentLine),
			Print(text),
			Print("\r\n"),
			Print(PROMPT),
			Print(self.buffer.as_str())
		)
	}

	fn redraw_line(&mut self) -> io::Result<()> {
		queue!(
			self.out,
			MoveToColumn(0),
			Clear(ClearType::CurrentLine),
			Print(PROMPT),
			Print(self.buffer.as_str())
		)
	}

	async fn close(mut self) {
		self.terminal.release();
		match tokio::time::timeout(CLOSE_TIMEOUT, self.sink.close()).await {
			Ok(Ok(())) => {}
			Ok(Err(err)) => debug!("socket_close_error: {err}"),
			Err(_) => debug!("socket_close_timeout"),
		}
		let _ = write!(self.out, "{FAREWELL}\r\n");
		let _ = self.out.flush();
	}
}

/// Raw-mode line endings, minus one trailing newline. The prompt redraw
/// supplies its own.
fn terminal_lines(text: &str) -> String {
	let text = text
		.strip_suffix("\r\n")
		.or_else(|| text.strip_suffix('\n'))
		.unwrap_or(text);
	text.replace("\r\n", "\n").replace('\n', "\r\n")
}
