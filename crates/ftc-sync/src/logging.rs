use crate::config::RuntimeConfig;
use std::{
	env,
	fs::{File, OpenOptions},
	io::{self, Write},
	path::PathBuf,
	sync::{Arc, Mutex},
};
use tracing_subscriber::{fmt::writer::BoxMakeWriter, EnvFilter};

/// Keeps the log file handle alive for the lifetime of the process.
pub struct LogGuard {
	file: Option<Arc<Mutex<File>>>,
}

struct MultiWriter {
	stderr_enabled: bool,
	file: Option<Arc<Mutex<File>>>,
}

/// Logs never go to stdout: the REPL owns it in raw mode and `pull` streams
/// file contents through it.
pub fn init_logging(config: &RuntimeConfig) -> Option<LogGuard> {
	let level = env::var("FTC_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
	let guard = match open_log_file(&config.log_dir) {
		Ok(guard) => guard,
		Err(err) => {
			eprintln!("log_file_error: {err}");
			LogGuard { file: None }
		}
	};
	let file = guard.file.clone();
	let stderr_enabled = config.log_stderr;
	let make_writer = BoxMakeWriter::new(move || MultiWriter::new(file.clone(), stderr_enabled));
	let subscriber = tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_ansi(false)
		.with_writer(make_writer)
		.finish();
	if tracing::subscriber::set_global_default(subscriber).is_err() {
		return None;
	}
	Some(guard)
}

impl MultiWriter {
	fn new(file: Option<Arc<Mutex<File>>>, stderr_enabled: bool) -> Self {
		Self {
			stderr_enabled,
			file,
		}
	}
}

impl Write for MultiWriter {
	fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
		if self.stderr_enabled {
			let _ = io::stderr().write_all(buf);
		}
		if let Some(file) = &self.file {
			if let Ok(mut file) = file.lock() {
				let _ = file.write_all(buf);
			}
		}
		Ok(buf.len())
	}

	fn flush(&mut self) -> io::Result<()> {
		if self.stderr_enabled {
			let _ = io::stderr().flush();
		}
		if let Some(file) = &self.file {
			if let Ok(mut file) = file.lock() {
				let _ = file.flush();
			}
		}
		Ok(())
	}
}

fn open_log_file(log_dir: &str) -> io::Result<LogGuard> {
	if log_dir.trim().is_empty() {
		return Ok(LogGuard { file: None });
	}
	let dir = PathBuf::from(log_dir);
	std::fs::create_dir_all(&dir)?;
	let path = dir.join(format!("ftc-sync-{}.log", std::process::id()));
	let file = OpenOptions::new().create(true).append(true).open(path)?;
	Ok(LogGuard {
		file: Some(Arc::new(Mutex::new(file))),
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn empty_log_dir_disables_file() {
		let guard = open_log_file("  ").expect("guard");
		assert!(guard.file.is_none());
	}

	#[test]
	fn log_file_is_created_per_process() {
		let dir = tempfile::tempdir().expect("tempdir");
		let log_dir = dir.path().join("logs");
		let guard = open_log_file(log_dir.to_str().expect("utf8 path")).expect("guard");
		assert!(guard.file.is_some());
		let expected = log_dir.join(format!("ftc-sync-{}.log", std::process::id()));
		assert!(expected.exists());
	}

	#[test]
	fn writer_appends_to_file() {
		let dir = tempfile::tempdir().expect("tempdir");
		let path = dir.path().join("out.log");
		let file = File::create(&path).expect("create");
		let mut writer = MultiWriter::new(Some(Arc::new(Mutex::new(file))), false);
		writer.write_all(b"repl_connected\n").expect("write");
		writer.flush().expect("flush");
		let written = std::fs::read_to_string(&path).expect("read");
		assert_eq!(written, "repl_connected\n");
	}
}
