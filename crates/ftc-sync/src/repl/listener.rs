use super::channel::EventSender;
use ftc_core::decode_pushed;
use futures_util::{Stream, StreamExt};
use std::fmt::Display;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

/// Spawns the task that drains the inbound half of the event socket.
pub fn spawn_listener<St, E>(stream: St, events: EventSender) -> JoinHandle<()>
where
	St: Stream<Item = Result<Message, E>> + Unpin + Send + 'static,
	E: Display + Send + 'static,
{
	tokio::spawn(listen(stream, events))
}

/// Surfaces OnBotJava messages in wire order. The first decode or transport
/// failure (or the socket closing) is reported once as a lost connection and
/// ends the task.
pub async fn listen<St, E>(mut stream: St, events: EventSender)
where
	St: Stream<Item = Result<Message, E>> + Unpin,
	E: Display,
{
	while let Some(next) = stream.next().await {
		let text = match next {
			Ok(Message::Text(text)) => text,
			Ok(Message::Close(frame)) => {
				let reason = frame
					.map(|frame| frame.reason.to_string())
					.filter(|reason| !reason.is_empty())
					.unwrap_or_else(|| "closed by robot".to_string());
				warn!("listener_closed: {reason}");
				events.connection_lost(format!("WebSocket error: {reason}")).await;
				return;
			}
			Ok(_) => continue,
			Err(err) => {
				warn!("listener_read_error: {err}");
				events.connection_lost(format!("WebSocket error: {err}")).await;
				return;
			}
		};
		let message = match decode_pushed(&text) {
			Ok(message) => message,
			Err(err) => {
				warn!("listener_decode_error: {err}");
				events.connection_lost(format!("WebSocket error: {err}")).await;
				return;
			}
		};
		let Some(line) = message.display_line() else {
			debug!("listener_drop: {text}");
			continue;
		};
		if !events.publish(line).await {
			return;
		}
	}
	events.connection_lost("WebSocket error: connection closed").await;
}

#[cfg(test)]
mod tests {
	use super::super::channel::{event_channel, EventReceiver, SessionEvent};
	use super::*;
	use futures_util::stream;
	use tokio_tungstenite::tungstenite::protocol::{frame::coding::CloseCode, CloseFrame};

	fn text(raw: &str) -> Result<Message, String> {
		Ok(Message::Text(raw.to_string()))
	}

	fn drain(rx: &mut EventReceiver) -> Vec<SessionEvent> {
		let mut seen = Vec::new();
		while let Ok(event) = rx.try_recv() {
			seen.push(event);
		}
		seen
	}

	#[tokio::test]
	async fn only_onbotjava_messages_are_surfaced_in_order() {
		let (events, mut rx) = event_channel();
		let frames = vec![
			text(r#"{"namespace":"OTHER","type":"ping","payload":"x"}"#),
			text(r#"{"namespace":"ONBOTJAVA","type":"build:start","payload":"1"}"#),
			Ok(Message::Ping(vec![1])),
			text(r#"{"namespace":"ONBOTJAVA","type":"build:done","payload":"2"}"#),
		];
		listen(stream::iter(frames), events).await;
		assert_eq!(
			drain(&mut rx),
			vec![
				SessionEvent::Line("[ONBOTJAVA] build:start: 1".to_string()),
				SessionEvent::Line("[ONBOTJAVA] build:done: 2".to_string()),
				SessionEvent::ConnectionLost("WebSocket error: connection closed".to_string()),
			]
		);
	}

	#[tokio::test]
	async fn read_failure_is_reported_once_and_stops() {
		let (events, mut rx) = event_channel();
		let frames = vec![
			Err("connection reset".to_string()),
			text(r#"{"namespace":"ONBOTJAVA","type":"never","payload":""}"#),
		];
		listen(stream::iter(frames), events).await;
		assert_eq!(
			drain(&mut rx),
			vec![SessionEvent::ConnectionLost(
				"WebSocket error: connection reset".to_string()
			)]
		);
	}

	#[tokio::test]
	async fn malformed_frame_ends_the_listener() {
		let (events, mut rx) = event_channel();
		let frames = vec![
			text("not json"),
			text(r#"{"namespace":"ONBOTJAVA","type":"never","payload":""}"#),
		];
		listen(stream::iter(frames), events).await;
		let seen = drain(&mut rx);
		assert_eq!(seen.len(), 1);
		assert!(matches!(&seen[0], SessionEvent::ConnectionLost(reason) if reason.contains("malformed")));
	}

	#[tokio::test]
	async fn other_namespace_alone_produces_no_line() {
		let (events, mut rx) = event_channel();
		let frames = vec![text(r#"{"namespace":"OTHER","type":"status","payload":"busy"}"#)];
		listen(stream::iter(frames), events).await;
		let seen = drain(&mut rx);
		assert!(seen
			.iter()
			.all(|event| !matches!(event, SessionEvent::Line(_))));
	}

	fn close(reason: Option<&'static str>) -> Result<Message, String> {
		Ok(Message::Close(reason.map(|reason| CloseFrame {
			code: CloseCode::Away,
			reason: reason.into(),
		})))
	}

	#[tokio::test]
	async fn close_frame_ends_the_listener_once() {
		let cases = [
			(close(Some("robot restarting")), "WebSocket error: robot restarting"),
			(close(Some("")), "WebSocket error: closed by robot"),
			(close(None), "WebSocket error: closed by robot"),
		];
		for (frame, expected) in cases {
			let (events, mut rx) = event_channel();
			let frames = vec![
				text(r#"{"namespace":"ONBOTJAVA","type":"build:start","payload":""}"#),
				frame,
				text(r#"{"namespace":"ONBOTJAVA","type":"never","payload":""}"#),
				close(None),
			];
			listen(stream::iter(frames), events).await;
			assert_eq!(
				drain(&mut rx),
				vec![
					SessionEvent::Line("[ONBOTJAVA] build:start: ".to_string()),
					SessionEvent::ConnectionLost(expected.to_string()),
				]
			);
		}
	}
}
