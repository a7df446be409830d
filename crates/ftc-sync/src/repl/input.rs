use std::{
	io::{ErrorKind, Read},
	thread,
};
use tokio::sync::mpsc;
use tracing::{debug, error};

/// Reads `reader` one byte at a time on a dedicated thread and hands each byte
/// to the session loop through a single-slot channel.
///
/// The thread stops on EOF, on a read error, or once the receiver is dropped;
/// either way the receiver then yields `None`. A thread blocked in `read` when
/// the session ends is left behind and reclaimed at process exit.
pub fn spawn_input_reader<R>(mut reader: R) -> mpsc::Receiver<u8>
where
	R: Read + Send + 'static,
{
	let (tx, rx) = mpsc::channel::<u8>(1);
	let spawned = thread::Builder::new()
		.name("ftc-sync-stdin".to_string())
		.spawn(move || {
			let mut buf = [0u8; 1];
			loop {
				match reader.read(&mut buf) {
					Ok(0) => break,
					Ok(_) => {
						if tx.blocking_send(buf[0]).is_err() {
							break;
						}
					}
					Err(err) if err.kind() == ErrorKind::Interrupted => continue,
					Err(err) => {
						debug!("stdin_read_error: {err}");
						break;
					}
				}
			}
		});
	if let Err(err) = spawned {
		error!("stdin_thread_spawn_failed: {err}");
	}
	rx
}
