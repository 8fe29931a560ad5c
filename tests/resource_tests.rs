//! Resource Status Tests
//!
//! Tests for:
//! - ResourceManager status machine: Disposed -> Ok / Error -> Disposed
//! - Unsupported kinds, non-disposable resources, reset
//! - Status queries never triggering an update
//! - Framework-level update / dispose / status, before and after destroy
//! - OnDemand buffers updated when a flushed frame draws them

mod common;

use std::sync::Arc;

use glam::Vec3;

use aster::framework::{Framework, FrameworkSettings, ResourceManager, Status, SurfaceOptions};
use aster::resources::{
    BufferArray, BufferData, DataType, Geometry, Resource, ResourceKind, Texture, TextureFormat,
    TextureType, UpdatePolicy,
};
use aster::scene::{AtomListScene, View};
use aster::state::StateLeaf;
use aster::AsterError;

use common::{DriverCounters, EventLog, RecordingFactory, TestDriver, atom_at, init_logger, unit_cube};

fn buffer(policy: UpdatePolicy) -> Arc<dyn Resource> {
    Arc::new(BufferData::new(BufferArray::zeroed(DataType::Float, 16), policy))
}

fn texture() -> Arc<dyn Resource> {
    Arc::new(Texture::new_2d(TextureFormat::Rgba, TextureType::UnsignedByte, 4, 4, 1))
}

fn buffer_manager() -> (ResourceManager, Arc<DriverCounters>) {
    init_logger();
    let (driver, counters) = TestDriver::new(ResourceKind::Buffer);
    (ResourceManager::new(vec![driver]), counters)
}

// ============================================================================
// Status Machine
// ============================================================================

#[test]
fn status_walks_through_lifecycle() {
    let (mut manager, counters) = buffer_manager();
    let res = buffer(UpdatePolicy::Manual);

    assert_eq!(manager.status(res.as_ref()), Status::Disposed);
    assert_eq!(manager.status_message(res.as_ref()).as_deref(), Some(""));

    assert_eq!(manager.update(&res), Status::Ok);
    assert_eq!(manager.status_message(res.as_ref()).as_deref(), Some("first upload"));
    assert_eq!(manager.update(&res), Status::Ok);
    assert_eq!(manager.status_message(res.as_ref()).as_deref(), Some(""));
    assert_eq!(DriverCounters::get(&counters.inits), 1);

    counters.fail.store(true, std::sync::atomic::Ordering::SeqCst);
    assert_eq!(manager.update(&res), Status::Error);
    assert_eq!(manager.status_message(res.as_ref()).as_deref(), Some("driver lacks support"));

    counters.fail.store(false, std::sync::atomic::Ordering::SeqCst);
    assert_eq!(manager.update(&res), Status::Ok);

    manager.dispose(res.as_ref()).unwrap();
    assert_eq!(manager.status(res.as_ref()), Status::Disposed);
    assert_eq!(manager.status_message(res.as_ref()).as_deref(), Some(""));
    assert_eq!(DriverCounters::get(&counters.disposes), 1);

    // A disposed resource comes back with a fresh handle.
    assert_eq!(manager.update(&res), Status::Ok);
    assert_eq!(DriverCounters::get(&counters.inits), 2);
    assert_eq!(manager.status_message(res.as_ref()).as_deref(), Some("first upload"));
}

#[test]
fn double_dispose_is_harmless() {
    let (mut manager, counters) = buffer_manager();
    let res = buffer(UpdatePolicy::Manual);

    manager.dispose(res.as_ref()).unwrap();
    manager.update(&res);
    manager.dispose(res.as_ref()).unwrap();
    manager.dispose(res.as_ref()).unwrap();

    assert_eq!(DriverCounters::get(&counters.disposes), 1);
    assert_eq!(manager.status(res.as_ref()), Status::Disposed);
}

#[test]
fn kinds_without_driver_are_unsupported() {
    let (mut manager, counters) = buffer_manager();
    let tex = texture();

    assert!(!manager.has_driver(ResourceKind::Texture));
    assert_eq!(manager.status(tex.as_ref()), Status::Unsupported);
    assert_eq!(manager.update(&tex), Status::Unsupported);
    manager.set_disposable(&tex, false);
    manager.dispose(tex.as_ref()).unwrap();
    assert_eq!(manager.status(tex.as_ref()), Status::Unsupported);
    assert!(manager.with_handle(&tex, |_| ()).is_none());
    assert_eq!(DriverCounters::get(&counters.updates), 0);
}

#[test]
fn non_disposable_resource_refuses_dispose() {
    let (mut manager, counters) = buffer_manager();
    let res = buffer(UpdatePolicy::Manual);
    manager.update(&res);

    manager.set_disposable(&res, false);
    assert!(matches!(
        manager.dispose(res.as_ref()),
        Err(AsterError::NotDisposable(id)) if id == res.id().get()
    ));
    assert_eq!(manager.status(res.as_ref()), Status::Ok);

    manager.set_disposable(&res, true);
    manager.dispose(res.as_ref()).unwrap();
    assert_eq!(DriverCounters::get(&counters.disposes), 1);
}

#[test]
fn reset_forces_a_full_upload() {
    let (mut manager, counters) = buffer_manager();
    let res = buffer(UpdatePolicy::Manual);

    // No handle yet: nothing to reset.
    manager.reset(res.as_ref());
    assert_eq!(DriverCounters::get(&counters.resets), 0);

    manager.update(&res);
    manager.update(&res);
    manager.reset(res.as_ref());
    assert_eq!(DriverCounters::get(&counters.resets), 1);

    manager.update(&res);
    assert_eq!(manager.status_message(res.as_ref()).as_deref(), Some("first upload"));
}

#[test]
fn with_handle_updates_on_demand_resources_only() {
    let (mut manager, counters) = buffer_manager();
    let on_demand = buffer(UpdatePolicy::OnDemand);
    let manual = buffer(UpdatePolicy::Manual);

    let uploads = manager.with_handle(&on_demand, |h| h.downcast_ref::<usize>().copied());
    assert_eq!(uploads, Some(Some(1)));

    assert!(manager.with_handle(&manual, |_| ()).is_none());
    assert_eq!(manager.status(manual.as_ref()), Status::Disposed);
    assert_eq!(DriverCounters::get(&counters.updates), 1);
}

#[test]
fn status_query_never_updates() {
    let (mut manager, counters) = buffer_manager();
    let res = buffer(UpdatePolicy::OnDemand);
    for _ in 0..3 {
        assert_eq!(manager.status(res.as_ref()), Status::Disposed);
    }
    manager.set_disposable(&res, true);
    assert_eq!(manager.status(res.as_ref()), Status::Disposed);
    assert_eq!(DriverCounters::get(&counters.inits), 0);
    assert_eq!(DriverCounters::get(&counters.updates), 0);
}

#[test]
fn destroyed_manager_is_neutral() {
    let (mut manager, counters) = buffer_manager();
    let first = buffer(UpdatePolicy::Manual);
    let second = buffer(UpdatePolicy::Manual);
    manager.update(&first);
    manager.update(&second);

    manager.destroy();
    manager.destroy();

    assert!(manager.is_destroyed());
    assert_eq!(DriverCounters::get(&counters.disposes), 2);
    assert_eq!(manager.status(first.as_ref()), Status::Disposed);
    assert_eq!(manager.status_message(first.as_ref()), None);
    assert_eq!(manager.update(&first), Status::Disposed);
    manager.dispose(first.as_ref()).unwrap();
    assert_eq!(DriverCounters::get(&counters.updates), 2);
}

// ============================================================================
// Through the Framework
// ============================================================================

fn framework() -> (Framework, Arc<DriverCounters>) {
    init_logger();
    let (driver, counters) = TestDriver::new(ResourceKind::Buffer);
    let framework = Framework::new(
        FrameworkSettings::default(),
        vec![driver],
        RecordingFactory::new(&EventLog::default()),
    )
    .unwrap();
    (framework, counters)
}

#[test]
fn framework_updates_on_workers() {
    let (framework, counters) = framework();
    let res = buffer(UpdatePolicy::Manual);

    assert_eq!(framework.get_status(res.as_ref()), Status::Disposed);
    assert_eq!(framework.update(&res), Status::Ok);
    assert_eq!(framework.get_status(res.as_ref()), Status::Ok);
    assert_eq!(framework.get_status_message(res.as_ref()).as_deref(), Some("first upload"));

    assert_eq!(framework.refresh(&res).get().unwrap(), Status::Ok);
    framework.reset(&res);
    assert_eq!(DriverCounters::get(&counters.resets), 1);

    framework.dispose(&res).unwrap();
    framework.dispose(&res).unwrap();
    assert_eq!(framework.get_status(res.as_ref()), Status::Disposed);
    assert_eq!(DriverCounters::get(&counters.disposes), 1);

    assert_eq!(framework.get_status(texture().as_ref()), Status::Unsupported);
}

#[test]
fn framework_refuses_disposing_pinned_resources() {
    let (framework, _) = framework();
    let res = buffer(UpdatePolicy::Manual);
    framework.update(&res);
    framework.set_disposable(&res, false);
    assert!(matches!(framework.dispose(&res), Err(AsterError::NotDisposable(_))));
}

#[test]
fn dropped_resources_are_swept_by_workers() -> anyhow::Result<()> {
    let (framework, counters) = framework();
    let res = buffer(UpdatePolicy::Manual);
    framework.update(&res);
    drop(res);

    // The next task on the worker sweeps orphans before it runs.
    framework.queue("default", |_hal| Ok(())).get()?;
    assert_eq!(DriverCounters::get(&counters.disposes), 1);
    Ok(())
}

#[test]
fn destroyed_framework_reports_neutral_values() {
    let (framework, counters) = framework();
    let res = buffer(UpdatePolicy::Manual);
    framework.update(&res);

    framework.destroy();

    assert_eq!(DriverCounters::get(&counters.disposes), 1);
    assert_eq!(framework.get_status(res.as_ref()), Status::Disposed);
    assert_eq!(framework.get_status_message(res.as_ref()), None);
    assert_eq!(framework.update(&res), Status::Disposed);
    framework.dispose(&res).unwrap();
    assert_eq!(DriverCounters::get(&counters.updates), 1);
}

#[test]
fn flush_updates_on_demand_buffers_it_draws() -> anyhow::Result<()> {
    let (framework, counters) = framework();
    let vertices = Arc::new(BufferData::new(BufferArray::zeroed(DataType::Float, 9), UpdatePolicy::OnDemand));
    let indices = Arc::new(BufferData::new(BufferArray::zeroed(DataType::UnsignedInt, 3), UpdatePolicy::Manual));
    let geometry = Geometry::new(3, 1, unit_cube()).with_buffers(Arc::clone(&vertices), Some(Arc::clone(&indices)));
    let leaf = Arc::new(StateLeaf::new().with_geometry(Arc::new(geometry)));

    let surface = framework.create_surface(SurfaceOptions::new(64, 64))?;
    {
        let surface = Arc::clone(&surface);
        framework
            .queue("setup", move |hal| {
                let manager = hal.set_active_surface(Some(&surface)).ok_or(AsterError::NoContext)?;
                let scene = AtomListScene::new();
                scene.add_atom(atom_at(Vec3::new(0.0, 0.0, -5.0), &leaf));
                let pass = manager.new_pass();
                pass.set_scene(Some(Arc::new(scene)));
                pass.set_view(Some(View::new_perspective(60.0, 1.0, 1.0, 100.0)));
                Ok(())
            })
            .get()?;
    }

    let vertices: Arc<dyn Resource> = vertices;
    let indices: Arc<dyn Resource> = indices;
    assert_eq!(framework.get_status(vertices.as_ref()), Status::Disposed);

    framework.flush(&surface, "render")?;
    assert_eq!(framework.get_status(vertices.as_ref()), Status::Ok);
    assert_eq!(framework.get_status(indices.as_ref()), Status::Disposed);
    assert_eq!(DriverCounters::get(&counters.updates), 1);

    // Every frame that draws it pushes pending changes again.
    framework.flush(&surface, "render")?;
    assert_eq!(DriverCounters::get(&counters.updates), 2);
    Ok(())
}
