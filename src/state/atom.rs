//! State atom values.
//!
//! [`StateAtom`] is a closed tagged union over every state axis. Backends
//! dispatch on the variant; the render core only looks at
//! [`StateAtom::state_type`], blend enablement and draw faces.

use std::sync::Arc;

use glam::{Vec3, Vec4};

use super::StateType;
use crate::resources::Texture;

/// Comparison used by depth and alpha tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FragmentTest {
    Never,
    Less,
    Equal,
    LEqual,
    Greater,
    NotEqual,
    GEqual,
    Always,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Winding {
    Clockwise,
    CounterClockwise,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawStyle {
    Filled,
    Line,
    Point,
}

/// Polygon faces that are rasterised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawFace {
    Front,
    Back,
    FrontAndBack,
}

impl DrawFace {
    /// The other single side, `FrontAndBack` maps to itself.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            DrawFace::Front => DrawFace::Back,
            DrawFace::Back => DrawFace::Front,
            DrawFace::FrontAndBack => DrawFace::FrontAndBack,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFunction {
    Add,
    Subtract,
    ReverseSubtract,
    Min,
    Max,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    SrcColor,
    OneMinusSrcColor,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstAlpha,
    OneMinusDstAlpha,
    DstColor,
    OneMinusDstColor,
    SrcAlphaSaturate,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZBufferState {
    pub write_enabled: bool,
    pub depth_test: FragmentTest,
}

impl Default for ZBufferState {
    fn default() -> Self {
        Self {
            write_enabled: true,
            depth_test: FragmentTest::LEqual,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawModeState {
    pub winding: Winding,
    pub front_style: DrawStyle,
    pub back_style: DrawStyle,
    pub face: DrawFace,
}

impl Default for DrawModeState {
    fn default() -> Self {
        Self {
            winding: Winding::CounterClockwise,
            front_style: DrawStyle::Filled,
            back_style: DrawStyle::Filled,
            face: DrawFace::Front,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlphaState {
    pub enabled: bool,
    pub test: FragmentTest,
    pub reference: f32,
}

impl Default for AlphaState {
    fn default() -> Self {
        Self {
            enabled: false,
            test: FragmentTest::GEqual,
            reference: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlendState {
    pub enabled: bool,
    pub function: BlendFunction,
    pub src: BlendFactor,
    pub dst: BlendFactor,
}

impl Default for BlendState {
    fn default() -> Self {
        Self {
            enabled: false,
            function: BlendFunction::Add,
            src: BlendFactor::SrcAlpha,
            dst: BlendFactor::OneMinusSrcAlpha,
        }
    }
}

impl BlendState {
    /// Standard alpha blending, enabled.
    #[must_use]
    pub fn alpha_blended() -> Self {
        Self {
            enabled: true,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialState {
    pub diffuse: Vec4,
    pub specular: Vec4,
    pub shininess: f32,
}

impl Default for MaterialState {
    fn default() -> Self {
        Self {
            diffuse: Vec4::new(0.8, 0.8, 0.8, 1.0),
            specular: Vec4::new(0.0, 0.0, 0.0, 1.0),
            shininess: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FogEquation {
    Linear,
    Exp,
    Exp2,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FogState {
    pub color: Vec4,
    pub start: f32,
    pub end: f32,
    pub density: f32,
    pub equation: FogEquation,
}

impl Default for FogState {
    fn default() -> Self {
        Self {
            color: Vec4::ZERO,
            start: 0.0,
            end: 1.0,
            density: 1.0,
            equation: FogEquation::Linear,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightKind {
    Directional { direction: Vec3 },
    Point { position: Vec3, attenuation: f32 },
    Spot { position: Vec3, direction: Vec3, cutoff: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightState {
    pub kind: LightKind,
    pub diffuse: Vec4,
    pub specular: Vec4,
}

/// A concrete value for one state axis.
#[derive(Debug, Clone)]
pub enum StateAtom {
    ZBuffer(ZBufferState),
    DrawMode(DrawModeState),
    Alpha(AlphaState),
    Blend(BlendState),
    Material(MaterialState),
    Texture(Arc<Texture>),
    Fog(FogState),
    Light(LightState),
}

impl StateAtom {
    #[must_use]
    pub const fn state_type(&self) -> StateType {
        match self {
            StateAtom::ZBuffer(_) => StateType::ZBuffer,
            StateAtom::DrawMode(_) => StateType::DrawMode,
            StateAtom::Alpha(_) => StateType::Alpha,
            StateAtom::Blend(_) => StateType::Blend,
            StateAtom::Material(_) => StateType::Material,
            StateAtom::Texture(_) => StateType::Texture,
            StateAtom::Fog(_) => StateType::Fog,
            StateAtom::Light(_) => StateType::Light,
        }
    }

    /// True for an enabled blend atom.
    #[must_use]
    pub fn is_blend_enabled(&self) -> bool {
        matches!(self, StateAtom::Blend(b) if b.enabled)
    }

    #[must_use]
    pub fn draw_face(&self) -> Option<DrawFace> {
        match self {
            StateAtom::DrawMode(d) => Some(d.face),
            _ => None,
        }
    }

    /// Copy of a draw-mode atom with its face replaced.
    #[must_use]
    pub fn with_draw_face(&self, face: DrawFace) -> Option<StateAtom> {
        match self {
            StateAtom::DrawMode(d) => Some(StateAtom::DrawMode(DrawModeState { face, ..*d })),
            _ => None,
        }
    }
}

impl From<ZBufferState> for StateAtom {
    fn from(value: ZBufferState) -> Self {
        StateAtom::ZBuffer(value)
    }
}

impl From<DrawModeState> for StateAtom {
    fn from(value: DrawModeState) -> Self {
        StateAtom::DrawMode(value)
    }
}

impl From<AlphaState> for StateAtom {
    fn from(value: AlphaState) -> Self {
        StateAtom::Alpha(value)
    }
}

impl From<BlendState> for StateAtom {
    fn from(value: BlendState) -> Self {
        StateAtom::Blend(value)
    }
}

impl From<MaterialState> for StateAtom {
    fn from(value: MaterialState) -> Self {
        StateAtom::Material(value)
    }
}

impl From<FogState> for StateAtom {
    fn from(value: FogState) -> Self {
        StateAtom::Fog(value)
    }
}

impl From<LightState> for StateAtom {
    fn from(value: LightState) -> Self {
        StateAtom::Light(value)
    }
}

impl From<Arc<Texture>> for StateAtom {
    fn from(value: Arc<Texture>) -> Self {
        StateAtom::Texture(value)
    }
}
