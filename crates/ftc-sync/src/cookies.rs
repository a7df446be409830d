//! File-backed cookie store so the robot session survives between invocations.
//!
//! The file holds a JSON array of raw `Set-Cookie` lines. The robot is the only
//! origin we ever talk to, so cookies are not scoped by URL.

use reqwest::{cookie::CookieStore, header::HeaderValue, Url};
use std::{
	fs, io,
	path::PathBuf,
	sync::Mutex,
};
use tracing::{debug, warn};

pub struct FsCookieJar {
	path: PathBuf,
	lock: Mutex<()>,
}

impl FsCookieJar {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self {
			path: path.into(),
			lock: Mutex::new(()),
		}
	}

	fn load(&self) -> Vec<String> {
		let raw = match fs::read_to_string(&self.path) {
			Ok(raw) => raw,
			Err(err) if err.kind() == io::ErrorKind::NotFound => return Vec::new(),
			Err(err) => {
				warn!("cookie_read_error: {err}");
				return Vec::new();
			}
		};
		if raw.trim().is_empty() {
			return Vec::new();
		}
		match serde_json::from_str::<Vec<String>>(&raw) {
			Ok(lines) => lines,
			Err(err) => {
				warn!("cookie_file_malformed: {err}");
				Vec::new()
			}
		}
	}

	fn store(&self, lines: &[String]) {
		let encoded = match serde_json::to_string_pretty(lines) {
			Ok(encoded) => encoded,
			Err(err) => {
				warn!("cookie_encode_error: {err}");
				return;
			}
		};
		if let Err(err) = fs::write(&self.path, encoded) {
			warn!("cookie_write_error: {err}");
		}
	}
}

impl CookieStore for FsCookieJar {
	fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
		let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
		let mut lines = self.load();
		let mut changed = false;
		for header in cookie_headers {
			let Ok(raw) = header.to_str() else {
				continue;
			};
			let Some(name) = cookie_name(raw) else {
				continue;
			};
			lines.retain(|line| cookie_name(line) != Some(name));
			lines.push(raw.to_string());
			changed = true;
		}
		if changed {
			debug!(url = %url, count = lines.len(), "cookies_stored");
			self.store(&lines);
		}
	}

	fn cookies(&self, url: &Url) -> Option<HeaderValue> {
		let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
		let lines = self.load();
		let header = cookie_header(&lines)?;
		debug!(url = %url, "cookies_loaded");
		HeaderValue::from_str(&header).ok()
	}
}

/// `name=value` part of a raw `Set-Cookie` line.
fn cookie_pair(raw: &str) -> Option<&str> {
	let pair = raw.split(';').next()?.trim();
	if pair.contains('=') && !pair.starts_with('=') {
		Some(pair)
	} else {
		None
	}
}

fn cookie_name(raw: &str) -> Option<&str> {
	cookie_pair(raw).and_then(|pair| pair.split('=').next()).map(str::trim)
}

fn cookie_header(lines: &[String]) -> Option<String> {
	let pairs: Vec<&str> = lines.iter().filter_map(|line| cookie_pair(line)).collect();
	if pairs.is_empty() {
		None
	} else {
		Some(pairs.join("; "))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn robot_url() -> Url {
		Url::parse("http://192.168.49.1:8080/java/file/tree").expect("url")
	}

	fn set(jar: &FsCookieJar, raw: &[&str]) {
		let headers: Vec<HeaderValue> = raw
			.iter()
			.map(|line| HeaderValue::from_str(line).expect("header"))
			.collect();
		jar.set_cookies(&mut headers.iter(), &robot_url());
	}

	#[test]
	fn missing_or_empty_file_means_no_cookies() {
		let dir = tempfile::tempdir().expect("tempdir");
		let path = dir.path().join(".cookies");
		let jar = FsCookieJar::new(&path);
		assert!(jar.cookies(&robot_url()).is_none());

		fs::write(&path, "").expect("write");
		assert!(jar.cookies(&robot_url()).is_none());
	}

	#[test]
	fn cookies_persist_across_jars() {
		let dir = tempfile::tempdir().expect("tempdir");
		let path = dir.path().join(".cookies");
		let jar = FsCookieJar::new(&path);
		set(&jar, &["JSESSIONID=abc123; Path=/; HttpOnly", "theme=dark"]);

		let reopened = FsCookieJar::new(&path);
		let header = reopened.cookies(&robot_url()).expect("cookie header");
		assert_eq!(header.to_str().expect("ascii"), "JSESSIONID=abc123; theme=dark");

		let stored: Vec<String> =
			serde_json::from_str(&fs::read_to_string(&path).expect("read")).expect("json");
		assert_eq!(stored[0], "JSESSIONID=abc123; Path=/; HttpOnly");
	}

	#[test]
	fn newer_cookie_replaces_same_name() {
		let dir = tempfile::tempdir().expect("tempdir");
		let jar = FsCookieJar::new(dir.path().join(".cookies"));
		set(&jar, &["JSESSIONID=old; Path=/"]);
		set(&jar, &["JSESSIONID=new; Path=/"]);
		let header = jar.cookies(&robot_url()).expect("cookie header");
		assert_eq!(header.to_str().expect("ascii"), "JSESSIONID=new");
	}

	#[test]
	fn malformed_file_is_treated_as_empty() {
		let dir = tempfile::tempdir().expect("tempdir");
		let path = dir.path().join(".cookies");
		let jar = FsCookieJar::new(&path);
		fs::write(&path, "{not json").expect("write");
		assert!(jar.cookies(&robot_url()).is_none());

		set(&jar, &["JSESSIONID=fresh"]);
		let header = jar.cookies(&robot_url()).expect("cookie header");
		assert_eq!(header.to_str().expect("ascii"), "JSESSIONID=fresh");
	}

	#[test]
	fn lines_without_a_pair_are_ignored() {
		assert_eq!(cookie_pair("garbage"), None);
		assert_eq!(cookie_pair("=value"), None);
		assert_eq!(cookie_name(" id = 1 ; Path=/"), Some("id"));
	}
}
