//! label_mesh - progressive surface meshes for labeled volumes
//!
//! Given a label id, extracts an isosurface of that label's region at a
//! descending sequence of cube sizes concurrently, keeps the best mesh seen
//! per label in a shared cache, and exposes the visible set as a consistent
//! snapshot for rendering and export.
//!
//! # Features
//!
//! - **Progressive extraction**: coarse meshes appear first and are replaced
//!   as finer levels finish, in any completion order
//! - **Monotonic cache**: a mesh is only replaced by one with more vertices
//! - **Export drain**: export waits for finest levels already in flight
//! - **Controllers**: event-driven selection (pick, label entry, show all,
//!   show largest)
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use label_mesh::{DenseLabelVolume, Label, MeshEngine, MeshingConfig, MemorySink};
//!
//! let volume = Arc::new(DenseLabelVolume::new([64, 64, 64]));
//! let engine = MeshEngine::new(volume, MeshingConfig::default())?;
//!
//! engine.toggle(Label(3));
//!
//! let mut sink = MemorySink::new();
//! let report = engine.export_visible(&mut sink)?;
//! println!("exported {} triangles", report.total_triangles());
//! ```

pub mod error;
pub mod types;

pub use error::{ConfigError, ExtractionError, MeshError, ParseLabelError, Result, TaskError};
pub use types::{Aabb, Label, Mesh};

// Volume collaborator and label field adaptor
pub mod field;
pub mod volume;
pub use field::LabelFieldAdaptor;
pub use volume::{DenseLabelVolume, LabelValue, LabelVolume, MAX_VOXELS};

// Surface extraction (fast-surface-nets backed)
pub mod extraction;
pub use extraction::{extract, AcceptAbove, ScalarField, SurfaceExtractor, SurfaceNetsExtractor};

pub mod config;
pub use config::MeshingConfig;

// Managed worker pool
pub mod threading;
pub use threading::{TaskExecutor, TaskHandle, TaskId};

// Mesh cache, live set and change notification
pub mod cache;
pub mod presentation;
pub use cache::{MergeOutcome, MeshSetSnapshot, MeshStore};
pub use presentation::{ChannelListener, MeshSetChanged, MeshSetListener, NullListener};

pub mod scheduler;
pub use scheduler::{LevelReport, ProgressiveScheduler, RequestOutcome};

pub mod engine;
pub use engine::{MeshEngine, Toggle};

pub mod export;
pub mod stats;
pub use export::{DirectorySink, ExportReport, ExportSink, MemorySink};

pub mod controller;
pub use controller::{Controller, InputEvent, Key, MeshViewController, Modifiers, Outcome, SegmentController};
