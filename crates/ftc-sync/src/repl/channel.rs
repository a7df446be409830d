use tokio::sync::mpsc;

/// Small on purpose: producers are the listener and build watchers, which
/// can afford to wait for the loop to finish a redraw.
pub const EVENT_CAPACITY: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
	/// Display-ready line.
	Line(String),
	/// The event socket is gone; shown once, then the session ends.
	ConnectionLost(String),
}

#[derive(Clone)]
pub struct EventSender {
	tx: mpsc::Sender<SessionEvent>,
}

pub type EventReceiver = mpsc::Receiver<SessionEvent>;

pub fn event_channel() -> (EventSender, EventReceiver) {
	let (tx, rx) = mpsc::channel(EVENT_CAPACITY);
	(EventSender { tx }, rx)
}

impl EventSender {
	/// Returns false once the session loop is gone.
	pub async fn publish(&self, line: impl Into<String>) -> bool {
		self.tx.send(SessionEvent::Line(line.into())).await.is_ok()
	}

	pub async fn connection_lost(&self, reason: impl Into<String>) -> bool {
		self.tx
			.send(SessionEvent::ConnectionLost(reason.into()))
			.await
			.is_ok()
	}
}
