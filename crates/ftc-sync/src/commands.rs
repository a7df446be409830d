use crate::robot::RobotClient;
use anyhow::{bail, Context, Result};
use std::io::{self, Read, Write};
use tracing::info;

pub async fn ping(client: &RobotClient) -> Result<()> {
	eprintln!("Pinging...");
	let reply = client.ping().await.context("POST /ping")?;
	println!("HTTP {}", reply.status);
	println!("{}", reply.body);
	Ok(())
}

pub async fn tree(client: &RobotClient) -> Result<()> {
	let files = client.tree().await.context("GET /java/file/tree")?;
	let mut stdout = io::stdout().lock();
	for file in files {
		writeln!(stdout, "{file}")?;
	}
	Ok(())
}

pub async fn pull(client: &RobotClient, file: &str) -> Result<()> {
	if file.trim().is_empty() {
		bail!("pull: missing file name");
	}
	info!(file, "pull_file");
	let bytes = client
		.pull(file)
		.await
		.with_context(|| format!("GET {file}"))?;
	let mut stdout = io::stdout().lock();
	stdout.write_all(&bytes)?;
	stdout.flush()?;
	Ok(())
}

pub async fn push(client: &RobotClient, file: &str, source: Option<&str>) -> Result<()> {
	if file.trim().is_empty() {
		bail!("push: missing file name");
	}
	let contents = read_source(source.unwrap_or(file))?;
	info!(file, bytes = contents.len(), "push_file");
	let reply = client
		.push(file, &contents)
		.await
		.with_context(|| format!("POST {file}"))?;
	println!("HTTP {}", reply.status);
	if !reply.body.is_empty() {
		println!("{}", reply.body);
	}
	Ok(())
}

fn read_source(source: &str) -> Result<String> {
	let mut contents = String::new();
	if source == "-" {
		io::stdin()
			.read_to_string(&mut contents)
			.context("failed reading stdin")?;
	} else {
		contents = std::fs::read_to_string(source)
			.with_context(|| format!("failed opening {source}"))?;
	}
	Ok(contents)
}
