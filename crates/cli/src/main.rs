//! Otter simulator.
//!
//! Spawns several editor or chat sessions over one in-process log, has each
//! actor make scripted concurrent edits, waits for every session to converge
//! and prints the shared result.

mod simulate;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use otter_primitives::{ChatDocument, Document, TextDocument};
use otter_session::{ChatSession, EditorSession, SessionConfig, SyncSession};
use otter_sync::MemoryLog;
use tracing::info;

use crate::simulate::{Script, settle};

/// Document kind the actors edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
	Editor,
	Chat,
}

/// Simulator command line arguments.
#[derive(Parser, Debug)]
#[command(name = "otter")]
#[command(about = "Simulate concurrent actors editing one OT-synchronized document")]
struct Args {
	/// Session config file (TOML)
	#[arg(short, long, value_name = "PATH")]
	config: Option<PathBuf>,

	/// Document kind
	#[arg(short, long, value_enum, default_value_t = Mode::Editor)]
	mode: Mode,

	/// Number of concurrent actors
	#[arg(short, long, default_value_t = 3)]
	actors: usize,

	/// Edits per actor
	#[arg(short, long, default_value_t = 20)]
	edits: usize,

	/// Overrides the config's sync interval
	#[arg(long, value_name = "MS")]
	sync_interval_ms: Option<u64>,

	/// Simulated transport latency per call
	#[arg(long, value_name = "MS", default_value_t = 40)]
	latency_ms: u64,

	/// Seed for the edit scripts
	#[arg(long, default_value_t = 7)]
	seed: u64,

	/// Seconds to wait for convergence
	#[arg(long, default_value_t = 30)]
	timeout_secs: u64,

	/// Print the commit graph in Graphviz dot syntax
	#[arg(long)]
	dot: bool,

	/// Verbose logging
	#[arg(short, long)]
	verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
	let args = Args::parse();
	setup_tracing(args.verbose);

	if args.actors == 0 {
		bail!("--actors must be at least 1");
	}
	let mut config = match &args.config {
		Some(path) => SessionConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
		None => SessionConfig::default(),
	};
	if let Some(interval) = args.sync_interval_ms {
		config.sync_interval_ms = interval;
	}
	info!(mode = ?args.mode, actors = args.actors, edits = args.edits, sync_interval_ms = config.sync_interval_ms, "otter.start");

	match args.mode {
		Mode::Editor => run_editor(&args, config).await,
		Mode::Chat => run_chat(&args, config).await,
	}
}

async fn run_editor(args: &Args, config: SessionConfig) -> Result<()> {
	let log = MemoryLog::<TextDocument>::default();
	let sessions: Vec<EditorSession<_, _>> = (0..args.actors)
		.map(|actor| SyncSession::new(format!("editor-{actor}"), log.clone(), log.clone(), config))
		.collect();
	start_all(&sessions, &log).await?;
	log.set_latency(Duration::from_millis(args.latency_ms));

	let mut script = Script::new(args.seed);
	for step in 0..args.edits {
		for (actor, session) in sessions.iter().enumerate() {
			let ops = script.text_edit(&session.manager().get_state(), actor, step);
			session.apply_operations(ops).context("local edit rejected")?;
		}
		tokio::time::sleep(config.sync_interval() / 2).await;
	}
	converge(&sessions, &log, args).await?;

	let text = log.head().to_string();
	for session in &sessions {
		if session.text() != text {
			bail!("{} diverged from the log", session.name());
		}
	}
	report(&sessions, &log);
	println!("{text}");
	print_graph(&log, args.dot);
	shutdown_all(&sessions).await;
	Ok(())
}

async fn run_chat(args: &Args, config: SessionConfig) -> Result<()> {
	let log = MemoryLog::<ChatDocument>::default();
	let sessions: Vec<ChatSession<_, _>> = (0..args.actors)
		.map(|actor| SyncSession::new(format!("chat-{actor}"), log.clone(), log.clone(), config))
		.collect();
	start_all(&sessions, &log).await?;
	log.set_latency(Duration::from_millis(args.latency_ms));

	let mut script = Script::new(args.seed);
	for step in 0..args.edits {
		for (actor, session) in sessions.iter().enumerate() {
			let ops = script.chat_edit(actor, step, args.actors);
			session.apply_operations(ops).context("local message rejected")?;
		}
		tokio::time::sleep(config.sync_interval() / 2).await;
	}
	converge(&sessions, &log, args).await?;

	let head = log.head();
	for session in &sessions {
		if session.manager().get_state() != head {
			bail!("{} diverged from the log", session.name());
		}
	}
	report(&sessions, &log);
	for message in head.messages() {
		println!("[{:>4}] {}: {}", message.timestamp, message.author, message.content);
	}
	print_graph(&log, args.dot);
	shutdown_all(&sessions).await;
	Ok(())
}

async fn start_all<D: Document>(sessions: &[SyncSession<D, MemoryLog<D>, MemoryLog<D>>], log: &MemoryLog<D>) -> Result<()> {
	for session in sessions {
		session.start();
	}
	for session in sessions {
		session
			.subscribe()
			.wait_for(|state| state.ready)
			.await
			.with_context(|| format!("{} never became ready", session.name()))?;
	}
	info!(revision = %log.revision(), "otter.ready");
	Ok(())
}

async fn converge<D: Document>(sessions: &[SyncSession<D, MemoryLog<D>, MemoryLog<D>>], log: &MemoryLog<D>, args: &Args) -> Result<()> {
	tokio::time::timeout(Duration::from_secs(args.timeout_secs), settle(sessions, log))
		.await
		.context("sessions did not converge in time")
}

fn report<D: Document>(sessions: &[SyncSession<D, MemoryLog<D>, MemoryLog<D>>], log: &MemoryLog<D>) {
	let calls = log.calls();
	for session in sessions {
		info!(
			session = session.name(),
			revision = %session.manager().get_revision(),
			reconciliations = session.reconciliations(),
			skipped_ticks = session.skipped_ticks(),
			"otter.session"
		);
	}
	info!(revision = %log.revision(), commits = log.commits().len(), pulls = calls.pulls, pushes = calls.pushes, "otter.converged");
}

fn print_graph<D: Document>(log: &MemoryLog<D>, dot: bool) {
	if dot {
		print!("{}", log.commit_graph(log.revision()).to_dot());
	}
}

async fn shutdown_all<D: Document>(sessions: &[SyncSession<D, MemoryLog<D>, MemoryLog<D>>]) {
	for session in sessions {
		session.shutdown().await;
	}
}

fn setup_tracing(verbose: bool) {
	use tracing_subscriber::EnvFilter;

	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
		if verbose {
			EnvFilter::new("otter=debug,otter_session=debug,otter_sync=trace,info")
		} else {
			EnvFilter::new("info")
		}
	});
	tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}
