//! Headless label mesh viewer.
//!
//! Builds a synthetic label volume, reads input events from stdin (see
//! [`commands`]) and feeds them to a mesh or segment controller. Every change
//! of the visible mesh set is reported from a fresh snapshot.
//!
//! ```text
//! $ printf 'key a\nstatus\nkey e\n' | label_mesh_viewer --controller segment
//! ```

mod commands;
mod config;
mod volume;

use anyhow::{Context, Result};
use clap::Parser;
use crossbeam_channel::Receiver;
use label_mesh::{
	ChannelListener, Controller, DenseLabelVolume, MeshEngine, MeshSetChanged, MeshViewController, Outcome,
	SegmentController, SurfaceNetsExtractor,
};
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;

use commands::Command;
use config::{ControllerKind, ViewerConfig};

/// Headless driver for progressive label meshing.
#[derive(Parser, Debug)]
#[command(name = "label_mesh_viewer")]
#[command(about = "Drives label mesh extraction from stdin commands")]
struct Args {
	/// Path to configuration TOML file.
	#[arg(short, long)]
	config: Option<PathBuf>,

	/// Controller to run (overrides config).
	#[arg(long, value_enum)]
	controller: Option<ControllerKind>,

	/// Number of synthetic blobs (overrides config).
	#[arg(long)]
	blobs: Option<u32>,

	/// Volume dimensions as X Y Z (overrides config).
	#[arg(long, num_args = 3, value_names = ["X", "Y", "Z"])]
	dims: Option<Vec<u32>>,

	/// Directory for exports (overrides config).
	#[arg(long)]
	export_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
	let args = Args::parse();

	let mut config = match &args.config {
		Some(path) => ViewerConfig::load(path)?,
		None => ViewerConfig::default(),
	};
	apply_overrides(&mut config, &args);
	config.validate()?;

	let volume = Arc::new(volume::blob_volume(&config.viewer));
	log::info!(
		"volume {:?} with {} blobs, {} levels",
		config.viewer.dims,
		config.viewer.blobs,
		config.meshing.level_scales.len()
	);

	let (listener, changes) = ChannelListener::new();
	let engine = Arc::new(
		MeshEngine::with_parts(
			volume,
			config.meshing.clone(),
			Arc::new(SurfaceNetsExtractor::new()),
			Arc::new(listener),
		)
		.context("Failed to start mesh engine")?,
	);

	let mut controller: Box<dyn Controller> = match config.viewer.controller {
		ControllerKind::Mesh => Box::new(MeshViewController::new(Arc::clone(&engine))),
		ControllerKind::Segment => Box::new(SegmentController::new(Arc::clone(&engine))),
	};
	log::info!("{:?} controller ready; reading commands from stdin", config.viewer.controller);

	for line in std::io::stdin().lock().lines() {
		let line = line.context("Failed to read stdin")?;
		let command = match commands::parse_line(&line) {
			Ok(command) => command,
			Err(err) => {
				log::warn!("{err:#}");
				continue;
			}
		};

		match command {
			Command::Skip => {}
			Command::Quit => break,
			Command::Status => print_status(&engine),
			Command::Event(event) => report(controller.handle(event)),
		}
		drain_changes(&changes, &engine);
	}

	drop(controller);
	engine.drain();
	drain_changes(&changes, &engine);
	print_status(&engine);

	match Arc::try_unwrap(engine) {
		Ok(engine) => engine.shutdown(),
		Err(_) => log::warn!("engine still shared at exit"),
	}
	Ok(())
}

fn apply_overrides(config: &mut ViewerConfig, args: &Args) {
	if let Some(kind) = args.controller {
		config.viewer.controller = kind;
	}
	if let Some(blobs) = args.blobs {
		config.viewer.blobs = blobs;
	}
	if let Some(&[x, y, z]) = args.dims.as_deref() {
		config.viewer.dims = [x, y, z];
	}
	if let Some(dir) = &args.export_dir {
		config.meshing.export_dir = dir.clone();
	}
}

fn report(outcome: Outcome) {
	match outcome {
		Outcome::Ignored => log::debug!("ignored"),
		Outcome::Prompting => println!("enter label: label <id>"),
		Outcome::Toggled(label, toggle) => println!("label {label}: {toggle:?}"),
		Outcome::ShownOnly(label, outcome) => println!("showing only label {label}: {outcome:?}"),
		Outcome::Shown(labels) => println!("showing {} labels: {labels:?}", labels.len()),
		Outcome::HiddenAll(count) => println!("hid {count} labels"),
		Outcome::Exported(report) => println!(
			"exported {} labels ({} triangles), skipped {:?}",
			report.exported.len(),
			report.total_triangles(),
			report.skipped
		),
		// Already logged by the controller.
		Outcome::Failed(_) => {}
	}
}

fn print_status(engine: &MeshEngine<DenseLabelVolume>) {
	let snapshot = engine.snapshot();
	println!(
		"generation {}: {} meshes, {} triangles, waiting {:?}, pending {:?}",
		snapshot.generation,
		snapshot.meshes.len(),
		snapshot.total_triangles(),
		snapshot.waiting,
		engine.store().pending_labels()
	);
	for (label, mesh) in &snapshot.meshes {
		println!("  label {label}: {} vertices, {} triangles", mesh.vertex_count(), mesh.triangle_count());
	}
}

/// Report queued change notifications, re-reading the snapshot once.
fn drain_changes(changes: &Receiver<MeshSetChanged>, engine: &MeshEngine<DenseLabelVolume>) {
	let Some(latest) = changes.try_iter().last() else {
		return;
	};
	let snapshot = engine.snapshot();
	log::info!(
		"mesh set changed (generation {}): {} visible, {} waiting, {} triangles",
		latest.generation,
		snapshot.meshes.len(),
		snapshot.waiting.len(),
		snapshot.total_triangles()
	);
}
