//! Transparent Bin Tests
//!
//! Tests for:
//! - band_partition: contiguous coverage of the depth range
//! - Slice clip planes spanning exactly the drawn part of the frustum
//! - Depth pre-pass followed by back-face then front-face blended draws
//! - Atoms entirely outside the frustum depth range are only pre-passed

mod common;

use std::sync::Arc;

use glam::Vec3;

use aster::renderer::bin::band_partition;
use aster::renderer::{FrameStatistics, RenderAtomBin, RendererSettings, StatePolicy};
use aster::scene::View;
use aster::state::{BlendState, DrawFace, DrawModeState, StateAtom, StateLeaf, StateType};

use common::{Event, atom_at, draw_count, leaf, manager, recording_context, take_events};

fn blended_leaf(face: Option<DrawFace>) -> Arc<StateLeaf> {
    let blend = Arc::new(StateAtom::from(BlendState::alpha_blended()));
    let mut managers = vec![manager(&blend)];
    if let Some(face) = face {
        let draw = Arc::new(StateAtom::from(DrawModeState {
            face,
            ..DrawModeState::default()
        }));
        managers.push(manager(&draw));
    }
    leaf(3, 0, &managers)
}

fn render(atoms: &[(Vec3, Arc<StateLeaf>)]) -> (Vec<Event>, usize) {
    let (mut ctx, log) = recording_context();
    let mut bin = RenderAtomBin::with_settings(&RendererSettings::default());
    let mut stats = FrameStatistics::new();
    for (position, leaf) in atoms {
        bin.add_render_atom(atom_at(*position, leaf), &mut stats);
    }
    let view = View::new_perspective(60.0, 1.0, 1.0, 100.0);
    bin.render_atoms(&mut ctx, &mut StatePolicy::new(), &view).unwrap();
    let remaining = ctx.active_state_atoms().count();
    (take_events(&log), remaining)
}

/// `(near, far)` of every slice, read back from clip planes 0 and 1.
fn slices(events: &[Event]) -> Vec<(f32, f32)> {
    let mut near = None;
    let mut out = Vec::new();
    for event in events {
        match event {
            Event::ClipPlane(0, plane) => near = Some(-plane.d),
            Event::ClipPlane(1, plane) => {
                out.push((near.take().expect("near plane set first"), plane.d));
            }
            _ => {}
        }
    }
    out
}

// ============================================================================
// Band Partition
// ============================================================================

#[test]
fn bands_tile_the_range_exactly() {
    let cases = [
        (1.0, 100.0, 10.0),
        (0.5, 7.25, 2.0),
        (3.0, 4.0, 10.0),
        (1.0, 100.0, 0.0),
    ];
    for (znear, zfar, depth) in cases {
        let bands = band_partition(znear, zfar, depth);
        assert!(!bands.is_empty());
        assert_eq!(bands[0].zfar(), zfar);
        assert_eq!(bands[bands.len() - 1].znear(), znear);
        for pair in bands.windows(2) {
            assert_eq!(pair[0].znear(), pair[1].zfar());
        }
        for band in &bands {
            assert!(band.znear() < band.zfar());
            assert!(band.indices().is_empty());
        }
    }
}

#[test]
fn inverted_range_has_no_bands() {
    assert!(band_partition(10.0, 1.0, 5.0).is_empty());
    assert!(band_partition(2.0, 2.0, 5.0).is_empty());
}

// ============================================================================
// Banded Rendering
// ============================================================================

#[test]
fn slices_cover_visible_depth_range() {
    let leaf = blended_leaf(None);
    // One atom right in front of the camera, one beyond the far plane:
    // the drawn region spans [0, 150.5], clamped to the frustum [1, 100].
    let (events, remaining) = render(&[
        (Vec3::new(0.0, 0.0, -0.5), Arc::clone(&leaf)),
        (Vec3::new(0.0, 0.0, -150.0), Arc::clone(&leaf)),
    ]);

    let slices = slices(&events);
    assert!(!slices.is_empty());
    assert!((slices[0].1 - 100.0).abs() < 1e-4, "first slice ends at far: {slices:?}");
    assert!((slices[slices.len() - 1].0 - 1.0).abs() < 1e-4, "last slice starts at near");
    for pair in slices.windows(2) {
        assert!((pair[0].0 - pair[1].1).abs() < 1e-4, "gap between slices: {pair:?}");
    }
    for (near, far) in &slices {
        assert!(near < far);
    }

    assert!(events.contains(&Event::EnableClip(0)));
    assert!(events.contains(&Event::EnableClip(1)));
    assert_eq!(events.iter().filter(|e| **e == Event::DisableClip(0)).count(), 1);
    assert_eq!(remaining, 0);
}

#[test]
fn near_atom_is_drawn_per_slice_and_face() {
    let (events, _) = render(&[(Vec3::new(0.0, 0.0, -5.5), blended_leaf(None))]);

    // The atom spans depth [5, 6]: one close band holding a single atom,
    // cut into four slices. Pre-pass draw + 4 slices x 2 faces.
    assert_eq!(draw_count(&events), 1 + 4 * 2);
}

#[test]
fn single_sided_atom_skips_opposite_face() {
    let (events, _) = render(&[(Vec3::new(0.0, 0.0, -5.5), blended_leaf(Some(DrawFace::Back)))]);
    assert_eq!(draw_count(&events), 1 + 4);
}

#[test]
fn double_sided_atom_is_pinned_per_face() {
    let (events, _) = render(&[(
        Vec3::new(0.0, 0.0, -5.5),
        blended_leaf(Some(DrawFace::FrontAndBack)),
    )]);
    assert_eq!(draw_count(&events), 1 + 4 * 2);
    assert!(
        events
            .iter()
            .any(|e| matches!(e, Event::Apply(StateType::DrawMode, _, _)))
    );
}

#[test]
fn atoms_past_far_plane_are_only_prepassed() {
    let (events, remaining) = render(&[(Vec3::new(0.0, 0.0, -150.0), blended_leaf(None))]);
    assert_eq!(draw_count(&events), 1);
    assert!(slices(&events).is_empty());
    assert!(!events.contains(&Event::EnableClip(0)));
    assert_eq!(remaining, 0);
}

#[test]
fn prepass_keeps_blending_off() {
    let (events, _) = render(&[(Vec3::new(0.0, 0.0, -150.0), blended_leaf(None))]);
    // Blending stays masked while depth is laid down.
    let blend_applies = events
        .iter()
        .filter(|e| matches!(e, Event::Apply(StateType::Blend, _, _)))
        .count();
    assert_eq!(blend_applies, 0);
    assert_eq!(common::applies_of(&events, StateType::Alpha), 1);
}
