use super::channel::EventSender;
use futures_util::future::BoxFuture;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{info, warn};

pub const BUILD_OK_NO_OUTPUT: &str = "Build succeeded with no output.";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildWaitError {
	#[error("request failed: {0}")]
	Request(String),
	#[error("unexpected status {0}")]
	Status(u16),
}

/// Long-poll for build completion. Resolves whenever the robot finishes a
/// build, however long that takes.
pub trait BuildPoller: Send + Sync {
	fn wait_for_build(&self) -> BoxFuture<'_, Result<Vec<u8>, BuildWaitError>>;
}

/// One watcher per `build` command; overlapping watchers are allowed and each
/// reports independently.
pub fn spawn_build_watcher(poller: Arc<dyn BuildPoller>, events: EventSender) -> JoinHandle<()> {
	tokio::spawn(watch_build(poller, events))
}

pub async fn watch_build(poller: Arc<dyn BuildPoller>, events: EventSender) {
	let result = poller.wait_for_build().await;
	match &result {
		Ok(body) => info!(bytes = body.len(), "build_wait_done"),
		Err(err) => warn!("build_wait_error: {err}"),
	}
	events.publish(build_outcome_line(result)).await;
}

pub fn build_outcome_line(result: Result<Vec<u8>, BuildWaitError>) -> String {
	match result {
		Ok(body) if body.is_empty() => BUILD_OK_NO_OUTPUT.to_string(),
		Ok(body) => format!("Build result:\n{}", String::from_utf8_lossy(&body)),
		Err(err) => format!("Error waiting for build: {err}"),
	}
}

#[cfg(test)]
mod tests {
	use super::super::channel::{event_channel, SessionEvent};
	use super::*;
	use tokio::sync::mpsc::error::TryRecvError;

	struct FixedPoller(Result<Vec<u8>, BuildWaitError>);

	impl BuildPoller for FixedPoller {
		fn wait_for_build(&self) -> BoxFuture<'_, Result<Vec<u8>, BuildWaitError>> {
			let result = self.0.clone();
			Box::pin(async move { result })
		}
	}

	#[test]
	fn outcome_lines() {
		assert_eq!(build_outcome_line(Ok(Vec::new())), BUILD_OK_NO_OUTPUT);
		assert_eq!(
			build_outcome_line(Ok(b"Auto.java:3: error: ';' expected".to_vec())),
			"Build result:\nAuto.java:3: error: ';' expected"
		);
		assert_eq!(
			build_outcome_line(Err(BuildWaitError::Status(500))),
			"Error waiting for build: unexpected status 500"
		);
	}

	#[tokio::test]
	async fn every_outcome_publishes_exactly_one_line() {
		let outcomes = vec![
			Ok(Vec::new()),
			Ok(b"warning: unused import".to_vec()),
			Err(BuildWaitError::Request("connection refused".to_string())),
		];
		for outcome in outcomes {
			let (events, mut rx) = event_channel();
			let expected = build_outcome_line(outcome.clone());
			spawn_build_watcher(Arc::new(FixedPoller(outcome)), events.clone())
				.await
				.expect("join");
			assert_eq!(rx.try_recv(), Ok(SessionEvent::Line(expected)));
			assert_eq!(rx.try_recv(), Err(TryRecvError::Empty));
		}
	}
}
