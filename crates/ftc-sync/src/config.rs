use clap::{Parser, Subcommand};
use std::{env, path::PathBuf, time::Duration};
use url::Url;

pub const DEFAULT_ROBOT_ADDR: &str = "192.168.49.1:8080";
pub const DEFAULT_REMOTE_DIR: &str = "/org/firstinspires/ftc/teamcode/";
pub const DEFAULT_WS_PORT: u16 = 8081;
const DEFAULT_COOKIE_FILE: &str = ".cookies";
const DEFAULT_LOG_DIR: &str = ".ftc-sync/logs";
const DEFAULT_HTTP_TIMEOUT_MS: u64 = 1000;

#[derive(Parser, Debug)]
#[command(name = "ftc-sync")]
#[command(about = "Keep the current directory in sync with an FTC robot via OnBotJava", long_about = None)]
pub struct Args {
	/// Host:Port of the robot to connect to (FTC_ROBOT_ADDRESS)
	#[arg(long, default_value = "")]
	pub address: String,
	/// Directory on the robot (FTC_REMOTE_DIRECTORY)
	#[arg(long, default_value = "")]
	pub remote: String,
	/// Event websocket URL (FTC_WS_URL)
	#[arg(long, default_value = "")]
	pub ws_url: String,
	/// Cookie file (FTC_COOKIE_FILE)
	#[arg(long, default_value = "")]
	pub cookies: String,
	/// Timeout for one-shot HTTP calls (FTC_HTTP_TIMEOUT_MS)
	#[arg(long)]
	pub timeout_ms: Option<u64>,
	/// Log directory, empty disables file logging (FTC_LOG_DIR)
	#[arg(long)]
	pub log_dir: Option<String>,
	#[command(subcommand)]
	pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
	/// Interactive session: live build events and build triggering
	Repl,
	/// Check the robot is reachable
	Ping,
	/// List files under the remote directory
	Tree,
	/// Print a remote file to stdout
	Pull { file: String },
	/// Upload a file; source defaults to the same path locally, `-` reads stdin
	Push { file: String, source: Option<String> },
}

#[derive(Clone, Debug)]
pub struct RuntimeConfig {
	pub robot_addr: String,
	pub remote_dir: String,
	pub ws_url: Url,
	pub cookie_file: PathBuf,
	pub http_timeout: Duration,
	pub log_dir: String,
	pub log_stderr: bool,
}

impl RuntimeConfig {
	pub fn http_base(&self) -> String {
		format!("http://{}", self.robot_addr)
	}
}

pub fn load_config(args: &Args) -> Result<RuntimeConfig, url::ParseError> {
	let robot_addr = resolve_flag(&args.address, "FTC_ROBOT_ADDRESS", DEFAULT_ROBOT_ADDR);
	let remote_dir = normalize_remote_dir(&resolve_flag(
		&args.remote,
		"FTC_REMOTE_DIRECTORY",
		DEFAULT_REMOTE_DIR,
	));
	let ws_url = resolve_ws_url(&args.ws_url, &robot_addr)?;
	let cookie_file = PathBuf::from(resolve_flag(&args.cookies, "FTC_COOKIE_FILE", DEFAULT_COOKIE_FILE));
	let http_timeout = Duration::from_millis(resolve_timeout_ms(args.timeout_ms));
	let log_dir = resolve_log_dir(args.log_dir.as_deref());
	let log_stderr = resolve_log_stderr();
	Ok(RuntimeConfig {
		robot_addr,
		remote_dir,
		ws_url,
		cookie_file,
		http_timeout,
		log_dir,
		log_stderr,
	})
}

fn env_value(key: &str) -> Option<String> {
	env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn resolve_flag(flag: &str, env_key: &str, default: &str) -> String {
	pick(flag, env_value(env_key), default)
}

fn pick(flag: &str, env: Option<String>, default: &str) -> String {
	if !flag.trim().is_empty() {
		return flag.trim().to_string();
	}
	if let Some(value) = env {
		return value.trim().to_string();
	}
	default.to_string()
}

fn resolve_ws_url(flag: &str, robot_addr: &str) -> Result<Url, url::ParseError> {
	let explicit = pick(flag, env_value("FTC_WS_URL"), "");
	if !explicit.is_empty() {
		return Url::parse(&explicit);
	}
	Url::parse(&default_ws_url(robot_addr))
}

/// The event socket lives on its own port next to the HTTP server.
pub fn default_ws_url(robot_addr: &str) -> String {
	let host = match robot_addr.rsplit_once(':') {
		Some((host, port)) if !host.is_empty() && port.chars().all(|ch| ch.is_ascii_digit()) => host,
		_ => robot_addr,
	};
	format!("ws://{host}:{DEFAULT_WS_PORT}")
}

pub fn normalize_remote_dir(input: &str) -> String {
	let trimmed = input.trim().trim_matches('/');
	if trimmed.is_empty() {
		return "/".to_string();
	}
	format!("/{trimmed}/")
}

fn resolve_timeout_ms(flag: Option<u64>) -> u64 {
	if let Some(value) = flag {
		return value;
	}
	env_value("FTC_HTTP_TIMEOUT_MS")
		.and_then(|value| value.trim().parse::<u64>().ok())
		.unwrap_or(DEFAULT_HTTP_TIMEOUT_MS)
}

fn resolve_log_dir(flag: Option<&str>) -> String {
	if let Some(value) = flag {
		return value.trim().to_string();
	}
	if let Ok(value) = env::var("FTC_LOG_DIR") {
		return value.trim().to_string();
	}
	DEFAULT_LOG_DIR.to_string()
}

fn resolve_log_stderr() -> bool {
	env::var("FTC_LOG_STDERR")
		.ok()
		.and_then(|value| parse_bool_env(&value))
		.unwrap_or(false)
}

fn parse_bool_env(value: &str) -> Option<bool> {
	match value.trim() {
		"1" | "true" | "TRUE" | "yes" | "YES" => Some(true),
		"0" | "false" | "FALSE" | "no" | "NO" => Some(false),
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn flag_beats_env_beats_default() {
		assert_eq!(pick(" 10.0.0.2:8080 ", Some("env:1".to_string()), "d"), "10.0.0.2:8080");
		assert_eq!(pick("", Some("env:1".to_string()), "d"), "env:1");
		assert_eq!(pick("  ", None, "d"), "d");
	}

	#[test]
	fn websocket_url_defaults_to_event_port_on_robot_host() {
		assert_eq!(default_ws_url("192.168.49.1:8080"), "ws://192.168.49.1:8081");
		assert_eq!(default_ws_url("robot.local"), "ws://robot.local:8081");
	}

	#[test]
	fn remote_dir_is_slash_delimited() {
		assert_eq!(normalize_remote_dir("org/firstinspires/ftc/teamcode"), DEFAULT_REMOTE_DIR);
		assert_eq!(normalize_remote_dir("/org/x/"), "/org/x/");
		assert_eq!(normalize_remote_dir(""), "/");
	}

	#[test]
	fn bool_env_values() {
		assert_eq!(parse_bool_env("yes"), Some(true));
		assert_eq!(parse_bool_env(" 0 "), Some(false));
		assert_eq!(parse_bool_env("maybe"), None);
	}

	#[test]
	fn subcommands_parse() {
		let args = Args::try_parse_from(["ftc-sync", "--address", "10.0.0.2:8080", "push", "Auto.java", "-"])
			.expect("parse");
		assert_eq!(args.address, "10.0.0.2:8080");
		assert_eq!(
			args.command,
			Command::Push {
				file: "Auto.java".to_string(),
				source: Some("-".to_string()),
			}
		);
		let args = Args::try_parse_from(["ftc-sync", "repl"]).expect("parse");
		assert_eq!(args.command, Command::Repl);
	}
}
