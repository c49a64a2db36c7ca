use super::*;

#[test]
fn test_label_parse_integer() {
  assert_eq!("42".parse::<Label>(), Ok(Label(42)));
  assert_eq!("  7 \n".parse::<Label>(), Ok(Label(7)));
}

#[test]
fn test_label_parse_integral_float() {
  assert_eq!("3.0".parse::<Label>(), Ok(Label(3)));
}

#[test]
fn test_label_parse_rejects_garbage() {
  let err = "abc".parse::<Label>().unwrap_err();
  assert_eq!(err.input, "abc");

  assert!("".parse::<Label>().is_err());
  assert!("-4".parse::<Label>().is_err());
  assert!("2.5".parse::<Label>().is_err());
  assert!("NaN".parse::<Label>().is_err());
}

#[test]
fn test_background_label() {
  assert!(Label::BACKGROUND.is_background());
  assert!(!Label(1).is_background());
  assert_eq!(Label::default(), Label::BACKGROUND);
}

#[test]
fn test_aabb_half_open() {
  let aabb = Aabb::new(Vec3::ZERO, Vec3::splat(2.0));

  assert!(aabb.contains(Vec3::ZERO));
  assert!(aabb.contains(Vec3::splat(1.999)));
  assert!(!aabb.contains(Vec3::new(2.0, 1.0, 1.0)));
  assert!(!aabb.contains(Vec3::new(-0.1, 1.0, 1.0)));
}

#[test]
fn test_aabb_empty_has_zero_size() {
  let aabb = Aabb::empty();
  assert!(!aabb.is_valid());
  assert_eq!(aabb.size(), Vec3::ZERO);
  assert!(!aabb.contains(Vec3::ZERO));
}

#[test]
fn test_mesh_triangles() {
  let positions = vec![
    Vec3::new(0.0, 0.0, 0.0),
    Vec3::new(1.0, 0.0, 0.0),
    Vec3::new(0.0, 1.0, 0.0),
    Vec3::new(0.0, 0.0, 1.0),
  ];
  let mesh = Mesh::from_triangles(positions, vec![0, 1, 2, 0, 2, 3]);

  assert_eq!(mesh.vertex_count(), 4);
  assert_eq!(mesh.triangle_count(), 2);
  assert_eq!(mesh.bounds.max, Vec3::ONE);

  let tris: Vec<_> = mesh.triangles().collect();
  assert_eq!(tris.len(), 2);
  assert_eq!(tris[1][2], Vec3::new(0.0, 0.0, 1.0));
}

#[test]
fn test_mesh_dangling_index() {
  let positions = vec![Vec3::ZERO, Vec3::X, Vec3::Y];
  let mesh = Mesh::from_triangles(positions, vec![0, 1, 2, 0, 2, 9]);

  assert_eq!(mesh.invalid_index(), Some(9));
  assert_eq!(mesh.triangles().count(), 1);
  assert_eq!(Mesh::from_triangles(vec![Vec3::ZERO], vec![0, 0, 0]).invalid_index(), None);
}
