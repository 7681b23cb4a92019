//! Fixed-function render state block
//!
//! A [`RenderStates`] value describes blending, depth, culling and stencil
//! configuration. Passes build one, tweak it between draws and hand it to the
//! backend with [`RenderBackend::set_render_states`](super::backend::RenderBackend::set_render_states).

use bitflags::bitflags;

bitflags! {
    /// Boolean pipeline switches
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct RendererParameters: u32 {
        /// Blending with `src_blend`/`dst_blend`
        const BLEND = 1 << 0;
        /// Color buffer writes
        const COLOR_WRITE = 1 << 1;
        /// Depth test
        const DEPTH_BUFFER = 1 << 2;
        /// Depth buffer writes
        const DEPTH_WRITE = 1 << 3;
        /// Face culling with `face_culling`
        const FACE_CULLING = 1 << 4;
        /// Stencil test
        const STENCIL_TEST = 1 << 5;
    }
}

bitflags! {
    /// Buffers affected by a clear
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ClearBuffers: u32 {
        /// Color attachments
        const COLOR = 1 << 0;
        /// Depth buffer
        const DEPTH = 1 << 1;
        /// Stencil buffer
        const STENCIL = 1 << 2;
    }
}

/// Blend factor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFunc {
    /// 1
    One,
    /// 0
    Zero,
    /// Source alpha
    SrcAlpha,
    /// 1 - source alpha
    InvSrcAlpha,
}

/// Comparison used by depth and stencil tests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RendererComparison {
    /// Always passes
    Always,
    /// Passes if equal
    Equal,
    /// Passes if greater
    Greater,
    /// Passes if greater or equal
    GreaterOrEqual,
    /// Passes if less
    Less,
    /// Passes if less or equal
    LessOrEqual,
    /// Never passes
    Never,
    /// Passes if different
    NotEqual,
}

/// Stencil buffer update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StencilOperation {
    /// Keep the current value
    Keep,
    /// Set to zero
    Zero,
    /// Bitwise invert
    Invert,
    /// Replace with the reference value
    Replace,
    /// Increment, clamped
    Increment,
    /// Decrement, clamped
    Decrement,
}

/// Polygon side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaceSide {
    /// Back faces
    Back,
    /// Front faces
    Front,
    /// Both sides
    FrontAndBack,
}

/// Polygon rasterisation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaceFilling {
    /// Filled triangles
    Fill,
    /// Wireframe
    Line,
    /// Vertices only
    Point,
}

/// Stencil configuration of one polygon side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StencilFace {
    /// Test function
    pub compare: RendererComparison,
    /// Operation when the stencil test fails
    pub fail: StencilOperation,
    /// Operation when both stencil and depth tests pass
    pub pass: StencilOperation,
    /// Operation when the stencil test passes and the depth test fails
    pub z_fail: StencilOperation,
    /// Reference value
    pub reference: u32,
    /// Compare mask
    pub mask: u32,
}

impl Default for StencilFace {
    fn default() -> Self {
        Self {
            compare: RendererComparison::Always,
            fail: StencilOperation::Keep,
            pass: StencilOperation::Keep,
            z_fail: StencilOperation::Keep,
            reference: 0,
            mask: 0xFFFF_FFFF,
        }
    }
}

/// Complete render state block
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderStates {
    /// Boolean switches
    pub parameters: RendererParameters,
    /// Source blend factor
    pub src_blend: BlendFunc,
    /// Destination blend factor
    pub dst_blend: BlendFunc,
    /// Depth test function
    pub depth_func: RendererComparison,
    /// Side culled when face culling is enabled
    pub face_culling: FaceSide,
    /// Rasterisation mode
    pub face_filling: FaceFilling,
    /// Stencil state of front faces
    pub front_face: StencilFace,
    /// Stencil state of back faces
    pub back_face: StencilFace,
}

impl Default for RenderStates {
    fn default() -> Self {
        Self {
            parameters: RendererParameters::COLOR_WRITE
                | RendererParameters::DEPTH_BUFFER
                | RendererParameters::DEPTH_WRITE
                | RendererParameters::FACE_CULLING,
            src_blend: BlendFunc::One,
            dst_blend: BlendFunc::Zero,
            depth_func: RendererComparison::Less,
            face_culling: FaceSide::Back,
            face_filling: FaceFilling::Fill,
            front_face: StencilFace::default(),
            back_face: StencilFace::default(),
        }
    }
}

impl RenderStates {
    /// Is a pipeline switch enabled?
    pub fn is_enabled(&self, parameter: RendererParameters) -> bool {
        self.parameters.contains(parameter)
    }

    /// Turn a pipeline switch on or off
    pub fn enable(&mut self, parameter: RendererParameters, enable: bool) {
        self.parameters.set(parameter, enable);
    }

    /// Set the stencil test function of one or both sides
    pub fn set_stencil_compare(&mut self, compare: RendererComparison, side: FaceSide) {
        self.for_each_face(side, |face| face.compare = compare);
    }

    /// Set the stencil pass operation of one or both sides
    pub fn set_stencil_pass_operation(&mut self, operation: StencilOperation, side: FaceSide) {
        self.for_each_face(side, |face| face.pass = operation);
    }

    /// Is this state block additive (`One`/`One` blending with color writes)?
    pub fn is_additive(&self) -> bool {
        self.is_enabled(RendererParameters::BLEND | RendererParameters::COLOR_WRITE)
            && self.src_blend == BlendFunc::One
            && self.dst_blend == BlendFunc::One
    }

    fn for_each_face(&mut self, side: FaceSide, mut apply: impl FnMut(&mut StencilFace)) {
        if matches!(side, FaceSide::Front | FaceSide::FrontAndBack) {
            apply(&mut self.front_face);
        }
        if matches!(side, FaceSide::Back | FaceSide::FrontAndBack) {
            apply(&mut self.back_face);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_states_are_opaque() {
        let states = RenderStates::default();
        assert!(states.is_enabled(RendererParameters::COLOR_WRITE));
        assert!(states.is_enabled(RendererParameters::DEPTH_BUFFER));
        assert!(!states.is_enabled(RendererParameters::BLEND));
        assert!(!states.is_additive());
    }

    #[test]
    fn test_stencil_side_selection() {
        let mut states = RenderStates::default();
        states.set_stencil_compare(RendererComparison::NotEqual, FaceSide::Back);
        states.set_stencil_pass_operation(StencilOperation::Zero, FaceSide::Back);

        assert_eq!(states.back_face.compare, RendererComparison::NotEqual);
        assert_eq!(states.back_face.pass, StencilOperation::Zero);
        assert_eq!(states.front_face.compare, RendererComparison::Always);

        states.set_stencil_compare(RendererComparison::Always, FaceSide::FrontAndBack);
        assert_eq!(states.back_face.compare, RendererComparison::Always);
        // Pass operation untouched by a compare change
        assert_eq!(states.back_face.pass, StencilOperation::Zero);
    }
}
