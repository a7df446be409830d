//! Interactive build session against the robot's event socket.

pub mod channel;
pub mod command;
pub mod input;
pub mod listener;
pub mod session;
pub mod terminal;
pub mod watcher;

use channel::event_channel;
use ftc_core::{encode_event, subscribe_to, ONBOTJAVA_NAMESPACE};
use futures_util::{Sink, SinkExt, StreamExt};
use input::spawn_input_reader;
use listener::spawn_listener;
use session::{Session, SessionEnd};
use std::{fmt::Display, io, sync::Arc};
use terminal::{CrosstermMode, RawModeGuard};
use thiserror::Error;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{info, warn};
use url::Url;
use watcher::BuildPoller;

#[derive(Debug, Error)]
pub enum ReplError {
	#[error("dial: {0}")]
	Dial(String),
	#[error("subscribe: {0}")]
	Subscribe(String),
	#[error("failed to set terminal to raw mode: {0}")]
	Terminal(io::Error),
	#[error("connection lost: {0}")]
	ConnectionLost(String),
	#[error("terminal output failed: {0}")]
	Output(io::Error),
}

impl ReplError {
	/// The session already put this one on screen before closing.
	pub fn shown_in_session(&self) -> bool {
		matches!(self, Self::ConnectionLost(_))
	}
}

impl SessionEnd {
	pub fn into_result(self) -> Result<(), ReplError> {
		match self {
			Self::Quit | Self::Interrupted | Self::InputClosed => Ok(()),
			Self::ConnectionLost(reason) => Err(ReplError::ConnectionLost(reason)),
			Self::OutputFailed(err) => Err(ReplError::Output(err)),
		}
	}
}

/// Connects, subscribes, takes over the terminal and runs the session.
/// Whatever was acquired before a failure is released before returning.
pub async fn run(ws_url: &Url, poller: Arc<dyn BuildPoller>) -> Result<(), ReplError> {
	println!("Connecting to {ws_url}...");
	let (socket, _) = connect_async(ws_url.as_str())
		.await
		.map_err(|err| ReplError::Dial(err.to_string()))?;
	let (mut sink, stream) = socket.split();

	if let Err(err) = subscribe(&mut sink).await {
		warn!("repl_subscribe_error: {err}");
		let _ = sink.close().await;
		return Err(err);
	}
	println!("Connected! Subscribed to {ONBOTJAVA_NAMESPACE} events.");
	info!(url = %ws_url, "repl_connected");

	let terminal = match RawModeGuard::acquire(CrosstermMode) {
		Ok(terminal) => terminal,
		Err(err) => {
			let _ = sink.close().await;
			return Err(ReplError::Terminal(err));
		}
	};

	let (events, event_rx) = event_channel();
	spawn_listener(stream, events.clone());
	let bytes = spawn_input_reader(io::stdin());
	Session::new(terminal, sink, io::stdout(), events, poller)
		.run(bytes, event_rx)
		.await
		.into_result()
}

pub async fn subscribe<S>(sink: &mut S) -> Result<(), ReplError>
where
	S: Sink<Message> + Unpin,
	S::Error: Display,
{
	let frame = encode_event(&subscribe_to(ONBOTJAVA_NAMESPACE))
		.map_err(|err| ReplError::Subscribe(err.to_string()))?;
	sink.send(Message::Text(frame))
		.await
		.map_err(|err| ReplError::Subscribe(err.to_string()))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn subscription_frame_is_sent_first() {
		let mut sent: Vec<Message> = Vec::new();
		subscribe(&mut sent).await.expect("subscribe");
		assert_eq!(
			sent,
			vec![Message::Text(
				r#"{"namespace":"system","type":"subscribeToNamespace","payload":"ONBOTJAVA"}"#
					.to_string()
			)]
		);
	}

	#[tokio::test]
	async fn subscription_send_failure_is_fatal() {
		let (mut sink, receiver) = futures::channel::mpsc::unbounded::<Message>();
		drop(receiver);
		let err = subscribe(&mut sink).await.expect_err("closed socket");
		assert!(matches!(err, ReplError::Subscribe(_)));
	}

	#[test]
	fn session_ends_map_to_exit_status() {
		assert!(SessionEnd::Quit.into_result().is_ok());
		assert!(SessionEnd::Interrupted.into_result().is_ok());
		assert!(SessionEnd::InputClosed.into_result().is_ok());
		let err = SessionEnd::ConnectionLost("reset".to_string())
			.into_result()
			.expect_err("fatal");
		assert!(err.shown_in_session());
		let err = SessionEnd::OutputFailed(io::Error::new(io::ErrorKind::BrokenPipe, "tty"))
			.into_result()
			.expect_err("fatal");
		assert!(!err.shown_in_session());
	}
}
