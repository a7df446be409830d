use crate::{
	config::RuntimeConfig,
	cookies::FsCookieJar,
	repl::watcher::{BuildPoller, BuildWaitError},
};
use futures_util::future::BoxFuture;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

const PING_NAME: &str = "ftc-sync/ping";

/// HTTP side of the robot controller. One-shot calls share a short timeout;
/// the build long-poll uses a second client that only bounds connecting.
pub struct RobotClient {
	base: String,
	remote_dir: String,
	http: Client,
	long_poll: Client,
}

pub struct RobotReply {
	pub status: StatusCode,
	pub body: String,
}

#[derive(Debug, Deserialize)]
struct FileTree {
	#[serde(default, rename = "src")]
	sources: Vec<String>,
}

impl RobotClient {
	pub fn new(config: &RuntimeConfig) -> Result<Self, reqwest::Error> {
		let jar = Arc::new(FsCookieJar::new(config.cookie_file.clone()));
		let http = Client::builder()
			.cookie_provider(jar.clone())
			.timeout(config.http_timeout)
			.build()?;
		let long_poll = Client::builder()
			.cookie_provider(jar)
			.connect_timeout(config.http_timeout)
			.build()?;
		Ok(Self {
			base: config.http_base(),
			remote_dir: config.remote_dir.clone(),
			http,
			long_poll,
		})
	}

	fn url(&self, path: &str) -> String {
		format!("{}{path}", self.base)
	}

	pub async fn ping(&self) -> Result<RobotReply, reqwest::Error> {
		let res = self
			.http
			.post(self.url("/ping"))
			.form(&[("name", PING_NAME)])
			.send()
			.await?;
		let status = res.status();
		let body = res.text().await?;
		Ok(RobotReply { status, body })
	}

	/// Files under the remote directory, relative to it.
	pub async fn tree(&self) -> Result<Vec<String>, reqwest::Error> {
		let tree: FileTree = self
			.http
			.get(self.url("/java/file/tree"))
			.send()
			.await?
			.error_for_status()?
			.json()
			.await?;
		debug!(count = tree.sources.len(), "tree_fetched");
		Ok(filter_tree(tree.sources, &self.remote_dir))
	}

	pub async fn pull(&self, file: &str) -> Result<Vec<u8>, reqwest::Error> {
		let bytes = self
			.http
			.get(self.url("/java/file/get"))
			.query(&[("f", source_path(&self.remote_dir, file))])
			.send()
			.await?
			.error_for_status()?
			.bytes()
			.await?;
		Ok(bytes.to_vec())
	}

	pub async fn push(&self, file: &str, contents: &str) -> Result<RobotReply, reqwest::Error> {
		let res = self
			.http
			.post(self.url("/java/file/save"))
			.query(&[("f", source_path(&self.remote_dir, file))])
			.form(&[("data", contents)])
			.send()
			.await?
			.error_for_status()?;
		let status = res.status();
		let body = res.text().await?;
		Ok(RobotReply { status, body })
	}

	async fn wait_build(&self) -> Result<Vec<u8>, BuildWaitError> {
		let res = self
			.long_poll
			.get(self.url("/java/build/wait"))
			.send()
			.await
			.map_err(|err| BuildWaitError::Request(err.to_string()))?;
		let status = res.status();
		if !status.is_success() {
			return Err(BuildWaitError::Status(status.as_u16()));
		}
		let body = res
			.bytes()
			.await
			.map_err(|err| BuildWaitError::Request(err.to_string()))?;
		Ok(body.to_vec())
	}
}

impl BuildPoller for RobotClient {
	fn wait_for_build(&self) -> BoxFuture<'_, Result<Vec<u8>, BuildWaitError>> {
		Box::pin(self.wait_build())
	}
}

/// OnBotJava addresses files from the `/src` root.
pub fn source_path(remote_dir: &str, file: &str) -> String {
	format!("/src{remote_dir}{}", file.trim_start_matches('/'))
}

/// Drops directory entries and anything outside `remote_dir`, which is
/// stripped from what remains.
pub fn filter_tree(sources: Vec<String>, remote_dir: &str) -> Vec<String> {
	sources
		.into_iter()
		.filter(|entry| !entry.ends_with('/'))
		.filter_map(|entry| entry.strip_prefix(remote_dir).map(str::to_string))
		.collect()
}
