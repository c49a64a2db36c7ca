//! Selection controllers driven by input events.
//!
//! ```text
//! InputEvent ──► Controller::handle ──► MeshEngine ──► Outcome
//!  PointSelected      (one match per        toggle / show_only /
//!  KeyPressed          controller)          hide_all / export ...
//!  LabelEntered
//! ```
//!
//! # Controllers
//!
//! - [`MeshViewController`]: pick/entry toggles, exclusive "show only" entry,
//!   hide all, export
//! - [`SegmentController`]: pick/entry toggles, hide all, show all, show
//!   largest
//!
//! Label text arrives as its own event. A key prompt (`I`) only records how
//! the next entry is applied.

pub mod mesh_view;
pub mod segment;

use glam::Vec3;
use tracing::{error, info};

use crate::engine::{MeshEngine, Toggle};
use crate::error::MeshError;
use crate::export::ExportReport;
use crate::scheduler::RequestOutcome;
use crate::types::Label;
use crate::volume::LabelVolume;

pub use mesh_view::MeshViewController;
pub use segment::SegmentController;

// =============================================================================
// Input events
// =============================================================================

/// Keys the controllers react to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Key {
  A,
  C,
  E,
  I,
  L,
  Other(char),
}

impl Key {
  /// Key for a typed character, case-insensitive.
  pub fn from_char(c: char) -> Self {
    match c.to_ascii_uppercase() {
      'A' => Key::A,
      'C' => Key::C,
      'E' => Key::E,
      'I' => Key::I,
      'L' => Key::L,
      other => Key::Other(other),
    }
  }
}

/// Modifier keys held during a key press.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Modifiers {
  pub shift: bool,
  pub ctrl: bool,
  pub alt: bool,
}

impl Modifiers {
  pub const NONE: Modifiers = Modifiers {
    shift: false,
    ctrl: false,
    alt: false,
  };

  pub const SHIFT: Modifiers = Modifiers {
    shift: true,
    ctrl: false,
    alt: false,
  };
}

/// Events from the windowing collaborator.
#[derive(Clone, Debug, PartialEq)]
pub enum InputEvent {
  /// A world-space point was picked in the volume view.
  PointSelected(Vec3),
  KeyPressed { key: Key, modifiers: Modifiers },
  /// Label id typed by the user.
  LabelEntered(String),
}

impl InputEvent {
  pub fn key(key: Key) -> Self {
    InputEvent::KeyPressed {
      key,
      modifiers: Modifiers::NONE,
    }
  }

  pub fn shift_key(key: Key) -> Self {
    InputEvent::KeyPressed {
      key,
      modifiers: Modifiers::SHIFT,
    }
  }
}

// =============================================================================
// Outcome
// =============================================================================

/// What handling an event did.
#[derive(Debug)]
pub enum Outcome {
  /// Not handled, or resolved to background.
  Ignored,
  /// Waiting for a `LabelEntered` event.
  Prompting,
  Toggled(Label, Toggle),
  ShownOnly(Label, RequestOutcome),
  /// Labels added by a whole-volume selection.
  Shown(Vec<Label>),
  HiddenAll(usize),
  Exported(ExportReport),
  /// A recoverable failure; already logged.
  Failed(MeshError),
}

/// Handles input events for one viewing session.
pub trait Controller {
  fn handle(&mut self, event: InputEvent) -> Outcome;
}

// =============================================================================
// Shared handling
// =============================================================================

/// How a pending label entry is applied.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) enum Entry {
  #[default]
  Toggle,
  ShowOnly,
}

pub(crate) fn pick<V: LabelVolume + ?Sized + 'static>(engine: &MeshEngine<V>, point: Vec3) -> Outcome {
  match engine.pick(point) {
    Some((label, toggle)) => Outcome::Toggled(label, toggle),
    None => Outcome::Ignored,
  }
}

pub(crate) fn prompt(entry: Entry) -> Outcome {
  match entry {
    Entry::Toggle => info!("enter label to toggle"),
    Entry::ShowOnly => info!("enter label to show alone"),
  }
  Outcome::Prompting
}

/// Parse `text` as a label and apply it. Malformed input is logged and
/// reported, never fatal.
pub(crate) fn enter_label<V: LabelVolume + ?Sized + 'static>(
  engine: &MeshEngine<V>,
  text: &str,
  entry: Entry,
) -> Outcome {
  let label: Label = match text.parse() {
    Ok(label) => label,
    Err(err) => {
      error!(%err, "invalid label input");
      return Outcome::Failed(MeshError::Parse(err));
    }
  };
  if label.is_background() {
    return Outcome::Ignored;
  }

  match entry {
    Entry::Toggle => Outcome::Toggled(label, engine.toggle(label)),
    Entry::ShowOnly => Outcome::ShownOnly(label, engine.show_only(label)),
  }
}

pub(crate) fn hide_all<V: LabelVolume + ?Sized + 'static>(engine: &MeshEngine<V>) -> Outcome {
  Outcome::HiddenAll(engine.hide_all())
}
