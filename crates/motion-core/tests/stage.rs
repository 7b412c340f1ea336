//! Stage membership of displayed trees.

use glam::{Mat3, Vec2};
use motion_core::{Composition, Layer, Session};

fn staged_root(session: &Session) -> Composition {
    let root = Composition::make(session, 200.0, 200.0, 2_000_000).unwrap();
    root.attach_stage();
    root
}

/// A layer and its matte join the stage with their tree and leave it on removal.
#[test]
fn layers_join_and_leave_the_stage_with_their_tree() {
    let session = Session::new();
    let root = staged_root(&session);
    assert!(root.is_on_stage());
    assert_eq!(root.stage_layer_count(), 1);

    let card = Layer::make_solid(&session, 2_000_000, 40.0, 40.0).unwrap();
    let matte = Layer::make_solid(&session, 2_000_000, 40.0, 40.0).unwrap();
    assert!(card.set_track_matte(&matte));
    assert!(!card.is_on_stage());

    assert!(root.add_layer(&card));
    assert!(card.is_on_stage());
    assert!(matte.is_on_stage());
    assert_eq!(root.stage_layer_count(), 3);

    let removed = root.remove_layer(&card).unwrap();
    assert!(!removed.is_on_stage());
    assert!(!matte.is_on_stage());
    assert_eq!(root.stage_layer_count(), 1);
}

#[test]
fn trees_attached_later_register_existing_layers() {
    let session = Session::new();
    let root = Composition::make(&session, 200.0, 200.0, 2_000_000).unwrap();
    let card = Layer::make_null(&session, 2_000_000).unwrap();
    assert!(root.add_layer(&card));
    assert_eq!(root.stage_layer_count(), 0);

    root.attach_stage();
    assert!(card.is_on_stage());
    assert_eq!(root.stage_layer_count(), 2);
}

#[test]
fn matrix_changes_invalidate_cache_scale_of_staged_layers() {
    let session = Session::new();
    let root = staged_root(&session);
    let card = Layer::make_solid(&session, 2_000_000, 40.0, 40.0).unwrap();
    let loose = Layer::make_solid(&session, 2_000_000, 40.0, 40.0).unwrap();
    assert!(root.add_layer(&card));
    assert!(root.take_invalid_cache_scales().is_empty());

    card.set_matrix(Mat3::from_scale(Vec2::splat(2.0)));
    loose.set_matrix(Mat3::from_scale(Vec2::splat(2.0)));
    assert_eq!(root.take_invalid_cache_scales(), vec![card.unique_id()]);
    assert!(root.take_invalid_cache_scales().is_empty());

    // Setting the same matrix again is not a change.
    card.set_matrix(Mat3::from_scale(Vec2::splat(2.0)));
    assert!(root.take_invalid_cache_scales().is_empty());
}

#[test]
fn points_map_into_layer_space_through_every_ancestor() {
    let session = Session::new();
    let root = staged_root(&session);
    let inner = Composition::make(&session, 100.0, 100.0, 2_000_000).unwrap();
    let card = Layer::make_solid(&session, 2_000_000, 40.0, 40.0).unwrap();
    assert!(inner.add_layer(&card));
    assert!(root.add_layer(&inner));
    inner.set_matrix(Mat3::from_translation(Vec2::new(10.0, 20.0)));
    card.set_matrix(Mat3::from_scale(Vec2::splat(2.0)));

    let local = card.global_to_local_point(Vec2::new(30.0, 40.0));
    assert!((local - Vec2::new(10.0, 10.0)).length() < 1e-4, "{local:?}");

    // A collapsed matrix leaves the point untouched.
    card.set_matrix(Mat3::from_scale(Vec2::ZERO));
    assert_eq!(card.global_to_local_point(Vec2::new(30.0, 40.0)), Vec2::new(30.0, 40.0));
}

#[test]
fn resizing_a_composition_bumps_its_content_version() {
    let session = Session::new();
    let root = staged_root(&session);
    let version = root.content_version();

    root.set_content_size(640.0, 360.0);
    assert_eq!((root.width(), root.height()), (640.0, 360.0));
    assert!(root.content_version() > version);

    let version = root.content_version();
    root.set_content_size(640.0, 360.0);
    assert_eq!(root.content_version(), version);
}
