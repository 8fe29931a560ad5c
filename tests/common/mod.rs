//! Shared test fixtures: a backend that records every call it receives,
//! plus small builders for atoms and leaves.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use glam::{Affine3A, Vec3};
use parking_lot::Mutex;

use aster::framework::{DriverHandle, ResourceDriver, SurfaceFactory, SurfaceOptions};
use aster::renderer::{ClearFlags, ContextBackend, PassTarget, RenderAtom, RenderContext};
use aster::resources::{
    Block, BufferArray, CubeFace, Geometry, Resource, ResourceKind, Slice, Texture, TextureFormat,
    TextureType,
};
use aster::scene::{Aabb, Plane, SpatialLeaf, View, Viewport};
use aster::state::{StateAtom, StateLeaf, StateManager, StateType, StateUnit};

/// One recorded backend call.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Apply(StateType, StateUnit, usize),
    Restore(StateType, StateUnit, usize),
    Draw(usize),
    PushTransform,
    PopTransform,
    Viewport,
    ProjectionView,
    Clear(ClearFlags),
    ClipPlane(usize, Plane),
    EnableClip(usize),
    DisableClip(usize),
    PreparePass,
    FinishPass,
    MakeCurrent,
    Swap,
    Destroy,
    SetTexture(Block),
    GetTexture(usize),
    CopyTexture(Block, i32, i32),
    ReadPixels(Block),
    /// Pushed by test tasks and listeners to mark their place in the log.
    Marker(&'static str),
}

pub type EventLog = Arc<Mutex<Vec<Event>>>;

/// Identity of a state atom as the backend sees it.
pub fn atom_key(atom: &Arc<StateAtom>) -> usize {
    Arc::as_ptr(atom) as usize
}

#[derive(Debug)]
pub struct RecordingBackend {
    log: EventLog,
    width: u32,
    height: u32,
    max_draw_buffers: u32,
    failing_swaps: usize,
}

impl RecordingBackend {
    pub fn new(log: EventLog) -> Self {
        Self {
            log,
            width: 640,
            height: 480,
            max_draw_buffers: 4,
            failing_swaps: 0,
        }
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_failing_swap(self) -> Self {
        self.with_failing_swaps(usize::MAX)
    }

    /// The next `count` swaps fail; later ones succeed.
    pub fn with_failing_swaps(mut self, count: usize) -> Self {
        self.failing_swaps = count;
        self
    }

    fn push(&self, event: Event) {
        self.log.lock().push(event);
    }
}

impl ContextBackend for RecordingBackend {
    fn set_projection_view(&mut self, _view: &View) {
        self.push(Event::ProjectionView);
    }

    fn set_viewport(&mut self, _viewport: Viewport) {
        self.push(Event::Viewport);
    }

    fn push_model_transform(&mut self, _transform: &Affine3A) {
        self.push(Event::PushTransform);
    }

    fn pop_model_transform(&mut self) {
        self.push(Event::PopTransform);
    }

    fn render_geometry(&mut self, geometry: &Geometry) {
        self.push(Event::Draw(geometry.vertex_count()));
    }

    fn set_user_clip_plane(&mut self, plane: Plane, index: usize) {
        self.push(Event::ClipPlane(index, plane));
    }

    fn enable_user_clip_plane(&mut self, index: usize) {
        self.push(Event::EnableClip(index));
    }

    fn disable_user_clip_plane(&mut self, index: usize) {
        self.push(Event::DisableClip(index));
    }

    fn clear_buffers(&mut self, flags: ClearFlags, _color: [f32; 4], _depth: f32, _stencil: i32) {
        self.push(Event::Clear(flags));
    }

    fn apply_state(&mut self, atom: &StateAtom, unit: StateUnit) {
        self.push(Event::Apply(atom.state_type(), unit, std::ptr::from_ref(atom) as usize));
    }

    fn restore_state(&mut self, atom: &StateAtom, unit: StateUnit) {
        self.push(Event::Restore(atom.state_type(), unit, std::ptr::from_ref(atom) as usize));
    }

    fn context_width(&self) -> u32 {
        self.width
    }

    fn context_height(&self) -> u32 {
        self.height
    }

    fn max_draw_buffers(&self) -> u32 {
        self.max_draw_buffers
    }

    fn prepare_pass(&mut self, _target: &PassTarget) -> aster::Result<()> {
        self.push(Event::PreparePass);
        Ok(())
    }

    fn finish_pass(&mut self, _target: &PassTarget) -> aster::Result<()> {
        self.push(Event::FinishPass);
        Ok(())
    }

    fn make_current(&mut self) -> aster::Result<()> {
        self.push(Event::MakeCurrent);
        Ok(())
    }

    fn swap_buffers(&mut self) -> aster::Result<()> {
        if self.failing_swaps > 0 {
            self.failing_swaps -= 1;
            return Err(aster::AsterError::Backend("swap failed".into()));
        }
        self.push(Event::Swap);
        Ok(())
    }

    fn is_current(&self) -> bool {
        true
    }

    fn is_initialized(&self) -> bool {
        true
    }

    fn destroy_context(&mut self) {
        self.push(Event::Destroy);
    }

    fn set_texture_data(
        &mut self,
        _texture: &Texture,
        region: Block,
        _face: Option<CubeFace>,
        _level: usize,
        _data: &BufferArray,
        _slice: Slice,
    ) {
        self.push(Event::SetTexture(region));
    }

    fn get_texture_data(
        &mut self,
        _texture: &Texture,
        _face: Option<CubeFace>,
        level: usize,
        _out: &mut BufferArray,
        _slice: Slice,
    ) {
        self.push(Event::GetTexture(level));
    }

    fn copy_texture_data(
        &mut self,
        _texture: &Texture,
        region: Block,
        _face: Option<CubeFace>,
        _level: usize,
        sx: i32,
        sy: i32,
    ) {
        self.push(Event::CopyTexture(region, sx, sy));
    }

    fn read_pixels(
        &mut self,
        _out: &mut BufferArray,
        _slice: Slice,
        _ty: TextureType,
        _format: TextureFormat,
        region: Block,
    ) {
        self.push(Event::ReadPixels(region));
    }
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A context over a fresh recording backend, with its event log.
pub fn recording_context() -> (RenderContext, EventLog) {
    init_logger();
    let log = EventLog::default();
    let ctx = RenderContext::new(Box::new(RecordingBackend::new(Arc::clone(&log))));
    (ctx, log)
}

pub fn mark(log: &EventLog, label: &'static str) {
    log.lock().push(Event::Marker(label));
}

pub fn markers(events: &[Event]) -> Vec<&'static str> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::Marker(label) => Some(*label),
            _ => None,
        })
        .collect()
}

pub fn take_events(log: &EventLog) -> Vec<Event> {
    std::mem::take(&mut *log.lock())
}

pub fn draw_count(events: &[Event]) -> usize {
    events.iter().filter(|e| matches!(e, Event::Draw(_))).count()
}

pub fn applies_of(events: &[Event], state_type: StateType) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, Event::Apply(t, _, _) if *t == state_type))
        .count()
}

pub fn restores_of(events: &[Event], state_type: StateType) -> usize {
    events
        .iter()
        .filter(|e| matches!(e, Event::Restore(t, _, _) if *t == state_type))
        .count()
}

pub fn unit_cube() -> Aabb {
    Aabb::new(Vec3::splat(-0.5), Vec3::splat(0.5))
}

pub fn geometry(vertices: usize) -> Arc<Geometry> {
    Arc::new(Geometry::new(vertices, vertices / 3, unit_cube()))
}

/// A spatial leaf with a unit cube centered at `position`.
pub fn spatial_at(position: Vec3) -> Arc<SpatialLeaf> {
    Arc::new(SpatialLeaf::from_local(Affine3A::from_translation(position), &unit_cube()))
}

pub fn manager(atom: &Arc<StateAtom>) -> Arc<StateManager> {
    Arc::new(StateManager::new(Arc::clone(atom)).expect("valid single-unit manager"))
}

/// A leaf with geometry and the given managers.
pub fn leaf(vertices: usize, sort_index: u32, managers: &[Arc<StateManager>]) -> Arc<StateLeaf> {
    let mut leaf = StateLeaf::new().with_geometry(geometry(vertices)).with_sort_index(sort_index);
    for manager in managers {
        leaf.set_manager(Arc::clone(manager));
    }
    Arc::new(leaf)
}

pub fn atom_at(position: Vec3, leaf: &Arc<StateLeaf>) -> RenderAtom {
    RenderAtom::new(spatial_at(position), Arc::clone(leaf))
}

// ============================================================================
// Framework fixtures
// ============================================================================

/// Call counters shared between a [`TestDriver`] and the test body.
#[derive(Debug, Default)]
pub struct DriverCounters {
    pub inits: AtomicUsize,
    pub updates: AtomicUsize,
    pub resets: AtomicUsize,
    pub disposes: AtomicUsize,
    /// Makes every update fail while set.
    pub fail: AtomicBool,
}

impl DriverCounters {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

/// A driver whose handles count their own updates.
pub struct TestDriver {
    kind: ResourceKind,
    counters: Arc<DriverCounters>,
}

impl TestDriver {
    pub fn new(kind: ResourceKind) -> (Box<dyn ResourceDriver>, Arc<DriverCounters>) {
        let counters = Arc::new(DriverCounters::default());
        let driver = Self {
            kind,
            counters: Arc::clone(&counters),
        };
        (Box::new(driver), counters)
    }
}

impl ResourceDriver for TestDriver {
    fn kind(&self) -> ResourceKind {
        self.kind
    }

    fn init(&mut self, _resource: &dyn Resource) -> DriverHandle {
        self.counters.inits.fetch_add(1, Ordering::SeqCst);
        Box::new(0_usize)
    }

    fn update(
        &mut self,
        _resource: &dyn Resource,
        handle: &mut DriverHandle,
    ) -> Result<Option<String>, String> {
        self.counters.updates.fetch_add(1, Ordering::SeqCst);
        if self.counters.fail.load(Ordering::SeqCst) {
            return Err("driver lacks support".into());
        }
        let uploads = handle.downcast_mut::<usize>().ok_or("foreign handle")?;
        *uploads += 1;
        Ok((*uploads == 1).then(|| "first upload".to_string()))
    }

    fn reset(&mut self, _resource: &dyn Resource, handle: &mut DriverHandle) {
        self.counters.resets.fetch_add(1, Ordering::SeqCst);
        if let Some(uploads) = handle.downcast_mut::<usize>() {
            *uploads = 0;
        }
    }

    fn dispose(&mut self, _handle: DriverHandle) {
        self.counters.disposes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Creates recording backends sized like the requested surface, all
/// logging into one event log.
pub struct RecordingFactory {
    pub log: EventLog,
    pub fail: bool,
}

impl RecordingFactory {
    pub fn new(log: &EventLog) -> Box<Self> {
        Box::new(Self {
            log: Arc::clone(log),
            fail: false,
        })
    }
}

impl SurfaceFactory for RecordingFactory {
    fn create_backend(&self, options: &SurfaceOptions) -> aster::Result<Box<dyn ContextBackend>> {
        if self.fail {
            return Err(aster::AsterError::SurfaceCreation("no display".into()));
        }
        let backend = RecordingBackend::new(Arc::clone(&self.log)).with_size(options.width, options.height);
        Ok(Box::new(backend))
    }
}
