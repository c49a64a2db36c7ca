//! Line-oriented stdin commands mapped to controller input events.
//!
//! ```text
//! pick <x> <y> <z>      point selected in world space
//! key [shift+]<char>    key press, e.g. `key i`, `key shift+i`
//! label <text>          label id entry
//! status                print the visible mesh set
//! quit                  drain and exit
//! ```

use anyhow::{bail, Context, Result};
use glam::Vec3;
use label_mesh::{InputEvent, Key, Modifiers};

/// One parsed input line.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
	Event(InputEvent),
	Status,
	Quit,
	/// Blank line or `#` comment.
	Skip,
}

/// Parse one line of input.
pub fn parse_line(line: &str) -> Result<Command> {
	let line = line.trim();
	if line.is_empty() || line.starts_with('#') {
		return Ok(Command::Skip);
	}

	let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
	let rest = rest.trim();

	match word.to_ascii_lowercase().as_str() {
		"pick" => parse_point(rest).map(|p| Command::Event(InputEvent::PointSelected(p))),
		"key" => parse_key(rest).map(Command::Event),
		// Label text is passed through untouched; the controller validates it.
		"label" => Ok(Command::Event(InputEvent::LabelEntered(rest.to_string()))),
		"status" => Ok(Command::Status),
		"quit" | "exit" => Ok(Command::Quit),
		other => bail!("unknown command '{other}'"),
	}
}

fn parse_point(args: &str) -> Result<Vec3> {
	let coords = args
		.split_whitespace()
		.map(|n| n.parse::<f32>().with_context(|| format!("invalid coordinate '{n}'")))
		.collect::<Result<Vec<_>>>()?;
	match coords.as_slice() {
		&[x, y, z] => Ok(Vec3::new(x, y, z)),
		_ => bail!("pick needs three coordinates, got {}", coords.len()),
	}
}

fn parse_key(args: &str) -> Result<InputEvent> {
	let mut modifiers = Modifiers::NONE;
	let mut key = None;

	for part in args.split(|c: char| c == '+' || c.is_whitespace()).filter(|p| !p.is_empty()) {
		match part.to_ascii_lowercase().as_str() {
			"shift" => modifiers.shift = true,
			"ctrl" => modifiers.ctrl = true,
			"alt" => modifiers.alt = true,
			name => {
				let mut chars = name.chars();
				match (chars.next(), chars.next()) {
					(Some(c), None) => key = Some(Key::from_char(c)),
					_ => bail!("unknown key '{part}'"),
				}
			}
		}
	}

	let key = key.context("key command needs a key")?;
	Ok(InputEvent::KeyPressed { key, modifiers })
}
