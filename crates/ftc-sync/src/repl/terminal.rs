use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::io;
use tracing::warn;

pub trait TerminalMode: Send {
	fn enter_raw(&mut self) -> io::Result<()>;
	fn restore(&mut self) -> io::Result<()>;
}

pub struct CrosstermMode;

impl TerminalMode for CrosstermMode {
	fn enter_raw(&mut self) -> io::Result<()> {
		enable_raw_mode()
	}

	fn restore(&mut self) -> io::Result<()> {
		disable_raw_mode()
	}
}

/// Raw mode held for the lifetime of the guard. `release` is idempotent and
/// also runs on drop, so the terminal is restored exactly once.
pub struct RawModeGuard<M: TerminalMode> {
	mode: M,
	active: bool,
}

impl<M: TerminalMode> RawModeGuard<M> {
	pub fn acquire(mut mode: M) -> io::Result<Self> {
		mode.enter_raw()?;
		Ok(Self { mode, active: true })
	}

	pub fn release(&mut self) {
		if !self.active {
			return;
		}
		self.active = false;
		if let Err(err) = self.mode.restore() {
			warn!("terminal_restore_failed: {err}");
		}
	}
}

impl<M: TerminalMode> Drop for RawModeGuard<M> {
	fn drop(&mut self) {
		self.release();
	}
}
