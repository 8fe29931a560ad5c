//! Render Pass
//!
//! A [`RenderPass`] renders one scene from one view. Each frame it:
//!
//! 1. runs its `BeforePassPrep` tasks,
//! 2. lets the backend bind its target,
//! 3. clears the configured buffers,
//! 4. updates the view and hands it to the context,
//! 5. collects the scene into its bin, sorts and replays it,
//! 6. lets the backend resolve the target,
//! 7. runs its `AfterPassFinish` tasks.
//!
//! A pass without a scene or a view does nothing.

use std::fmt;
use std::sync::Arc;

use super::backend::ClearFlags;
use super::bin::{RenderAtomBin, RenderQueue};
use super::context::RenderContext;
use super::policy::StatePolicy;
use super::settings::RendererSettings;
use super::statistics::FrameStatistics;
use super::task::{AttachPoint, AttachedTasks, Task, TaskCompleteListener};
use crate::errors::{AsterError, Result};
use crate::resources::{Texture, TextureTarget};
use crate::scene::{Scene, View, Viewport};

// ============================================================================
// Clear settings
// ============================================================================

/// Buffers a pass clears and the values it clears them to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClearSettings {
    flags: ClearFlags,
    color: [f32; 4],
    depth: f32,
    stencil: i32,
}

impl Default for ClearSettings {
    fn default() -> Self {
        Self {
            flags: ClearFlags::COLOR | ClearFlags::DEPTH,
            color: [0.0, 0.0, 0.0, 1.0],
            depth: 1.0,
            stencil: 0,
        }
    }
}

impl ClearSettings {
    #[must_use]
    pub fn flags(&self) -> ClearFlags {
        self.flags
    }

    pub fn set_flags(&mut self, flags: ClearFlags) {
        self.flags = flags;
    }

    #[must_use]
    pub fn color(&self) -> [f32; 4] {
        self.color
    }

    /// Requires exactly four components.
    pub fn set_color(&mut self, color: &[f32]) -> Result<()> {
        self.color = color
            .try_into()
            .map_err(|_| AsterError::InvalidClearColor(color.len()))?;
        Ok(())
    }

    #[must_use]
    pub fn depth(&self) -> f32 {
        self.depth
    }

    /// Clamped to `[0, 1]`.
    pub fn set_depth(&mut self, depth: f32) {
        self.depth = depth.clamp(0.0, 1.0);
    }

    #[must_use]
    pub fn stencil(&self) -> i32 {
        self.stencil
    }

    pub fn set_stencil(&mut self, stencil: i32) {
        self.stencil = stencil;
    }
}

// ============================================================================
// Render target
// ============================================================================

/// Texture attachments a pass renders into instead of the surface.
#[derive(Debug, Clone)]
pub struct RenderToTexture {
    pub width: u32,
    pub height: u32,
    pub color: Vec<Arc<Texture>>,
    pub depth: Option<Arc<Texture>>,
}

impl RenderToTexture {
    /// Checks attachments against the target size and the viewport.
    /// Returns the reason the target cannot be used.
    pub fn validate(&self, viewport: Viewport, max_draw_buffers: u32) -> std::result::Result<(), String> {
        if self.width == 0 || self.height == 0 {
            return Err("target has zero size".into());
        }
        if self.color.is_empty() && self.depth.is_none() {
            return Err("target has no attachments".into());
        }
        if self.color.len() > max_draw_buffers as usize {
            return Err(format!(
                "{} color attachments exceed the {max_draw_buffers} draw buffers available",
                self.color.len()
            ));
        }
        let expected = (self.width as usize, self.height as usize);
        for texture in self.color.iter().chain(self.depth.iter()) {
            if texture.target() == TextureTarget::Texture3d {
                return Err("3D textures cannot be attached".into());
            }
            let (w, h, _) = texture.level_size(0);
            if (w, h) != expected {
                return Err(format!(
                    "attachment is {w}x{h}, target is {}x{}",
                    self.width, self.height
                ));
            }
        }
        let (vw, vh) = viewport.pixel_size(self.width, self.height);
        if vw == 0 || vh == 0 {
            return Err("viewport covers no pixels of the target".into());
        }
        Ok(())
    }
}

/// Where a pass renders.
#[derive(Debug, Clone, Default)]
pub enum PassTarget {
    /// The context's own surface.
    #[default]
    Surface,
    Texture(RenderToTexture),
}

// ============================================================================
// Pass
// ============================================================================

pub struct RenderPass {
    scene: Option<Arc<dyn Scene>>,
    view: Option<View>,
    clear: ClearSettings,
    policy: StatePolicy,
    bin: RenderAtomBin,
    tasks: AttachedTasks,
    target: PassTarget,
}

impl fmt::Debug for RenderPass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderPass")
            .field("has_scene", &self.scene.is_some())
            .field("view", &self.view)
            .field("clear", &self.clear)
            .field("policy", &self.policy)
            .field("bin", &self.bin)
            .field("tasks", &self.tasks)
            .field("target", &self.target)
            .finish()
    }
}

impl Default for RenderPass {
    fn default() -> Self {
        Self::with_settings(&RendererSettings::default())
    }
}

impl RenderPass {
    #[must_use]
    pub fn new(scene: Arc<dyn Scene>, view: View) -> Self {
        let mut pass = Self::default();
        pass.scene = Some(scene);
        pass.view = Some(view);
        pass
    }

    #[must_use]
    pub fn with_settings(settings: &RendererSettings) -> Self {
        Self {
            scene: None,
            view: None,
            clear: ClearSettings::default(),
            policy: StatePolicy::new(),
            bin: RenderAtomBin::with_settings(settings),
            tasks: AttachedTasks::new(&[AttachPoint::BeforePassPrep, AttachPoint::AfterPassFinish]),
            target: PassTarget::Surface,
        }
    }

    /// Both a scene and a view are set.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.scene.is_some() && self.view.is_some()
    }

    pub fn set_scene(&mut self, scene: Option<Arc<dyn Scene>>) {
        self.scene = scene;
    }

    #[must_use]
    pub fn scene(&self) -> Option<&Arc<dyn Scene>> {
        self.scene.as_ref()
    }

    pub fn set_view(&mut self, view: Option<View>) {
        self.view = view;
    }

    #[must_use]
    pub fn view(&self) -> Option<&View> {
        self.view.as_ref()
    }

    pub fn view_mut(&mut self) -> Option<&mut View> {
        self.view.as_mut()
    }

    #[must_use]
    pub fn clear_settings(&self) -> &ClearSettings {
        &self.clear
    }

    pub fn clear_settings_mut(&mut self) -> &mut ClearSettings {
        &mut self.clear
    }

    /// Shorthand for [`ClearSettings::set_color`].
    pub fn set_clear_color(&mut self, color: &[f32]) -> Result<()> {
        self.clear.set_color(color)
    }

    #[must_use]
    pub fn policy(&self) -> &StatePolicy {
        &self.policy
    }

    pub fn policy_mut(&mut self) -> &mut StatePolicy {
        &mut self.policy
    }

    #[must_use]
    pub fn bin(&self) -> &RenderAtomBin {
        &self.bin
    }

    #[must_use]
    pub fn target(&self) -> &PassTarget {
        &self.target
    }

    pub fn set_target(&mut self, target: PassTarget) {
        self.target = target;
    }

    /// Only `BeforePassPrep` and `AfterPassFinish` are valid for a pass.
    pub fn attach_task(&mut self, task: Arc<dyn Task>, point: AttachPoint) -> Result<()> {
        self.tasks.attach(task, point)
    }

    pub fn detach_task(&mut self, task: &Arc<dyn Task>, point: AttachPoint) -> Result<bool> {
        self.tasks.detach(task, point)
    }

    pub fn add_task_complete_listener(&mut self, listener: Arc<dyn TaskCompleteListener>) {
        self.tasks.add_listener(listener);
    }

    pub fn remove_task_complete_listener(&mut self, listener: &Arc<dyn TaskCompleteListener>) {
        self.tasks.remove_listener(listener);
    }

    /// Renders the pass into `ctx`, accumulating counts into `stats`.
    pub fn render_pass(&mut self, ctx: &mut RenderContext, stats: &mut FrameStatistics) -> Result<()> {
        let (Some(scene), Some(view)) = (self.scene.as_ref(), self.view.as_mut()) else {
            log::debug!("Skipping pass without a scene or view");
            return Ok(());
        };
        if let PassTarget::Texture(rtt) = &self.target {
            if let Err(reason) = rtt.validate(view.viewport(), ctx.backend().max_draw_buffers()) {
                log::warn!("Skipping render-to-texture pass: {reason}");
                return Ok(());
            }
        }

        self.tasks.drain(AttachPoint::BeforePassPrep, ctx)?;
        ctx.backend_mut().prepare_pass(&self.target)?;
        ctx.clear_buffers(self.clear.flags, self.clear.color, self.clear.depth, self.clear.stencil);

        view.update_view();
        ctx.set_viewport(view.viewport());
        ctx.set_projection_view(view);

        self.bin.clear();
        scene.submit(view, &mut RenderQueue::new(&mut self.bin, stats));
        self.bin.optimize();
        self.bin.render_atoms(ctx, &mut self.policy, view)?;

        ctx.backend_mut().finish_pass(&self.target)?;
        self.tasks.drain(AttachPoint::AfterPassFinish, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_defaults_and_validation() {
        let mut clear = ClearSettings::default();
        assert_eq!(clear.flags(), ClearFlags::COLOR | ClearFlags::DEPTH);
        assert_eq!(clear.color(), [0.0, 0.0, 0.0, 1.0]);

        assert!(matches!(
            clear.set_color(&[1.0, 0.0, 0.0]),
            Err(AsterError::InvalidClearColor(3))
        ));
        clear.set_color(&[1.0, 0.5, 0.25, 1.0]).unwrap();
        assert_eq!(clear.color(), [1.0, 0.5, 0.25, 1.0]);

        clear.set_depth(3.0);
        assert_eq!(clear.depth(), 1.0);
        clear.set_depth(-1.0);
        assert_eq!(clear.depth(), 0.0);
    }

    #[test]
    fn render_to_texture_checks_sizes() {
        use crate::resources::{TextureFormat, TextureType};

        let tex = |w, h| Arc::new(Texture::new_2d(TextureFormat::Rgba, TextureType::UnsignedByte, w, h, 1));
        let ok = RenderToTexture {
            width: 64,
            height: 32,
            color: vec![tex(64, 32)],
            depth: None,
        };
        assert!(ok.validate(Viewport::default(), 1).is_ok());
        assert!(ok.validate(Viewport::default(), 0).is_err());

        let mismatched = RenderToTexture {
            color: vec![tex(32, 32)],
            ..ok.clone()
        };
        assert!(mismatched.validate(Viewport::default(), 1).is_err());
    }
}
