//! Synthetic label volume of spherical blobs.

use glam::Vec3;
use label_mesh::{DenseLabelVolume, Label};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::ViewerSettings;

/// Volume with `settings.blobs` spheres, labels 1..=blobs, later blobs
/// overwriting earlier ones where they overlap.
pub fn blob_volume(settings: &ViewerSettings) -> DenseLabelVolume {
	let resolution = Vec3::from_array(settings.resolution);
	let offset = Vec3::from_array(settings.offset);
	let mut volume = DenseLabelVolume::new(settings.dims)
		.with_resolution(resolution)
		.with_offset(offset);

	let extent = Vec3::new(
		settings.dims[0] as f32,
		settings.dims[1] as f32,
		settings.dims[2] as f32,
	) * resolution;
	let max_radius = (extent.min_element() * 0.25).max(resolution.max_element());

	let mut rng = StdRng::seed_from_u64(settings.seed);
	for id in 1..=settings.blobs {
		let radius = rng.random_range(0.3..=1.0) * max_radius;
		let centre = offset
			+ Vec3::new(
				rng.random_range(0.0..1.0),
				rng.random_range(0.0..1.0),
				rng.random_range(0.0..1.0),
			) * extent;
		volume.fill_where(Label(u64::from(id)), |p| p.distance(centre) < radius);
	}
	volume
}

#[cfg(test)]
mod tests {
	use super::*;
	use label_mesh::LabelVolume;

	#[test]
	fn test_same_seed_same_volume() {
		let settings = ViewerSettings {
			dims: [16, 16, 16],
			blobs: 4,
			..Default::default()
		};
		let a = blob_volume(&settings);
		let b = blob_volume(&settings);

		for z in 0..16 {
			for y in 0..16 {
				for x in 0..16 {
					assert_eq!(a.label_at([x, y, z]), b.label_at([x, y, z]));
				}
			}
		}
	}

	#[test]
	fn test_labels_within_range() {
		let settings = ViewerSettings {
			dims: [24, 24, 24],
			blobs: 5,
			..Default::default()
		};
		let labels = label_mesh::stats::distinct_labels(&blob_volume(&settings));

		assert!(!labels.is_empty());
		assert!(labels.iter().all(|l| (1..=5).contains(&l.raw())));
	}
}
