//! Render Pass Tests
//!
//! Tests for:
//! - render_pass(): step order against the backend
//! - Passes without a scene or view, and unusable render-to-texture targets
//! - Attach points: foreign points rejected, tasks attached while draining
//!   run on the next cycle, completion listeners
//! - Clear settings reaching the backend

mod common;

use std::sync::Arc;

use glam::Vec3;
use parking_lot::Mutex;

use aster::renderer::{
    AttachPoint, ClearFlags, FrameStatistics, PassTarget, RenderPass, RenderToTexture, Task,
    TaskCompleteListener, TaskContext,
};
use aster::resources::{Texture, TextureFormat, TextureType};
use aster::scene::{AtomListScene, View};
use aster::AsterError;

use common::{Event, EventLog, atom_at, draw_count, leaf, mark, markers, recording_context, take_events};

fn marker_task(log: &EventLog, label: &'static str) -> Arc<dyn Task> {
    let log = Arc::clone(log);
    Arc::new(move |_: &mut TaskContext<'_>| -> aster::Result<()> {
        mark(&log, label);
        Ok(())
    })
}

fn scene_with_atoms(count: usize) -> Arc<AtomListScene> {
    let scene = AtomListScene::new().without_culling();
    let shared = leaf(3, 0, &[]);
    for i in 0..count {
        scene.add_atom(atom_at(Vec3::new(i as f32, 0.0, -5.0), &shared));
    }
    Arc::new(scene)
}

fn pass_with_atoms(count: usize) -> RenderPass {
    RenderPass::new(scene_with_atoms(count), View::new_perspective(60.0, 1.0, 1.0, 100.0))
}

/// Backend events with state traffic filtered out.
fn structural(events: &[Event]) -> Vec<Event> {
    events
        .iter()
        .filter(|e| !matches!(e, Event::Apply(..) | Event::Restore(..)))
        .cloned()
        .collect()
}

// ============================================================================
// Pass Steps
// ============================================================================

#[test]
fn pass_runs_steps_in_order() {
    let (mut ctx, log) = recording_context();
    let mut pass = pass_with_atoms(1);
    pass.attach_task(marker_task(&log, "before"), AttachPoint::BeforePassPrep).unwrap();
    pass.attach_task(marker_task(&log, "after"), AttachPoint::AfterPassFinish).unwrap();

    let mut stats = FrameStatistics::new();
    pass.render_pass(&mut ctx, &mut stats).unwrap();

    assert_eq!(
        structural(&take_events(&log)),
        vec![
            Event::Marker("before"),
            Event::PreparePass,
            Event::Clear(ClearFlags::COLOR | ClearFlags::DEPTH),
            Event::Viewport,
            Event::ProjectionView,
            Event::PushTransform,
            Event::Draw(3),
            Event::PopTransform,
            Event::FinishPass,
            Event::Marker("after"),
        ]
    );
    assert_eq!(stats.atom_count(), 1);
}

#[test]
fn pass_without_scene_or_view_does_nothing() {
    let (mut ctx, log) = recording_context();
    let mut stats = FrameStatistics::new();

    let mut no_view = pass_with_atoms(2);
    no_view.set_view(None);
    no_view.attach_task(marker_task(&log, "before"), AttachPoint::BeforePassPrep).unwrap();
    assert!(!no_view.is_valid());
    no_view.render_pass(&mut ctx, &mut stats).unwrap();

    let mut no_scene = RenderPass::default();
    no_scene.set_view(Some(View::new_perspective(60.0, 1.0, 1.0, 100.0)));
    no_scene.render_pass(&mut ctx, &mut stats).unwrap();

    assert!(take_events(&log).is_empty());
    assert_eq!(stats.atom_count(), 0);
}

#[test]
fn invalid_render_target_skips_pass() {
    let (mut ctx, log) = recording_context();
    let mut pass = pass_with_atoms(1);
    let texture = Arc::new(Texture::new_2d(TextureFormat::Rgba, TextureType::UnsignedByte, 32, 32, 1));
    pass.set_target(PassTarget::Texture(RenderToTexture {
        width: 64,
        height: 64,
        color: vec![texture],
        depth: None,
    }));

    let mut stats = FrameStatistics::new();
    pass.render_pass(&mut ctx, &mut stats).unwrap();
    assert!(take_events(&log).is_empty());
}

#[test]
fn valid_render_target_renders() {
    let (mut ctx, log) = recording_context();
    let mut pass = pass_with_atoms(2);
    let texture = Arc::new(Texture::new_2d(TextureFormat::Rgba, TextureType::UnsignedByte, 64, 64, 1));
    pass.set_target(PassTarget::Texture(RenderToTexture {
        width: 64,
        height: 64,
        color: vec![texture],
        depth: None,
    }));

    let mut stats = FrameStatistics::new();
    pass.render_pass(&mut ctx, &mut stats).unwrap();
    assert_eq!(draw_count(&take_events(&log)), 2);
}

#[test]
fn clear_settings_reach_backend() {
    let (mut ctx, log) = recording_context();
    let mut pass = pass_with_atoms(0);
    pass.clear_settings_mut().set_flags(ClearFlags::DEPTH | ClearFlags::STENCIL);
    assert!(matches!(
        pass.set_clear_color(&[1.0, 1.0]),
        Err(AsterError::InvalidClearColor(2))
    ));

    let mut stats = FrameStatistics::new();
    pass.render_pass(&mut ctx, &mut stats).unwrap();
    assert!(take_events(&log).contains(&Event::Clear(ClearFlags::DEPTH | ClearFlags::STENCIL)));
}

// ============================================================================
// Attach Points
// ============================================================================

#[test]
fn pass_rejects_frame_attach_points() {
    let (_, log) = recording_context();
    let mut pass = pass_with_atoms(0);
    for point in [AttachPoint::StartFrame, AttachPoint::EndFrame] {
        assert!(matches!(
            pass.attach_task(marker_task(&log, "x"), point),
            Err(AsterError::InvalidAttachPoint(p)) if p == point
        ));
    }
}

#[test]
fn tasks_run_once() {
    let (mut ctx, log) = recording_context();
    let mut pass = pass_with_atoms(0);
    pass.attach_task(marker_task(&log, "once"), AttachPoint::AfterPassFinish).unwrap();

    let mut stats = FrameStatistics::new();
    pass.render_pass(&mut ctx, &mut stats).unwrap();
    pass.render_pass(&mut ctx, &mut stats).unwrap();
    assert_eq!(markers(&take_events(&log)), vec!["once"]);
}

#[test]
fn task_attached_while_draining_runs_next_cycle() {
    let (mut ctx, log) = recording_context();
    let mut pass = pass_with_atoms(0);

    let follow_up = marker_task(&log, "follow-up");
    let spawner: Arc<dyn Task> = {
        let log = Arc::clone(&log);
        Arc::new(move |tasks: &mut TaskContext<'_>| -> aster::Result<()> {
            mark(&log, "spawner");
            tasks.attach_task(Arc::clone(&follow_up), tasks.attach_point())
        })
    };
    pass.attach_task(spawner, AttachPoint::BeforePassPrep).unwrap();

    let mut stats = FrameStatistics::new();
    pass.render_pass(&mut ctx, &mut stats).unwrap();
    assert_eq!(markers(&take_events(&log)), vec!["spawner"]);

    pass.render_pass(&mut ctx, &mut stats).unwrap();
    assert_eq!(markers(&take_events(&log)), vec!["follow-up"]);

    pass.render_pass(&mut ctx, &mut stats).unwrap();
    assert!(markers(&take_events(&log)).is_empty());
}

#[test]
fn detached_task_does_not_run() {
    let (mut ctx, log) = recording_context();
    let mut pass = pass_with_atoms(0);
    let task = marker_task(&log, "detached");
    pass.attach_task(Arc::clone(&task), AttachPoint::BeforePassPrep).unwrap();
    assert!(pass.detach_task(&task, AttachPoint::BeforePassPrep).unwrap());
    assert!(!pass.detach_task(&task, AttachPoint::BeforePassPrep).unwrap());

    let mut stats = FrameStatistics::new();
    pass.render_pass(&mut ctx, &mut stats).unwrap();
    assert!(markers(&take_events(&log)).is_empty());
}

struct Completed(Mutex<Vec<AttachPoint>>);

impl TaskCompleteListener for Completed {
    fn task_complete(&self, _task: &Arc<dyn Task>, point: AttachPoint) {
        self.0.lock().push(point);
    }
}

#[test]
fn listeners_hear_successful_tasks_only() {
    let (mut ctx, log) = recording_context();
    let mut pass = pass_with_atoms(0);
    let completed = Arc::new(Completed(Mutex::new(Vec::new())));
    pass.add_task_complete_listener(completed.clone());

    pass.attach_task(marker_task(&log, "ok"), AttachPoint::BeforePassPrep).unwrap();
    let failing: Arc<dyn Task> =
        Arc::new(|_: &mut TaskContext<'_>| -> aster::Result<()> { Err(AsterError::TaskFailed("boom".into())) });
    pass.attach_task(failing, AttachPoint::AfterPassFinish).unwrap();

    let mut stats = FrameStatistics::new();
    let result = pass.render_pass(&mut ctx, &mut stats);
    assert!(matches!(result, Err(AsterError::TaskFailed(_))));
    assert_eq!(*completed.0.lock(), vec![AttachPoint::BeforePassPrep]);
}

#[test]
fn failing_task_drops_the_rest_of_its_drain() {
    let (mut ctx, log) = recording_context();
    let mut pass = pass_with_atoms(0);
    let failing: Arc<dyn Task> =
        Arc::new(|_: &mut TaskContext<'_>| -> aster::Result<()> { Err(AsterError::TaskFailed("boom".into())) });
    pass.attach_task(failing, AttachPoint::BeforePassPrep).unwrap();
    pass.attach_task(marker_task(&log, "dropped"), AttachPoint::BeforePassPrep).unwrap();

    let mut stats = FrameStatistics::new();
    assert!(pass.render_pass(&mut ctx, &mut stats).is_err());
    assert!(take_events(&log).is_empty());

    pass.render_pass(&mut ctx, &mut stats).unwrap();
    assert!(markers(&take_events(&log)).is_empty());
}
