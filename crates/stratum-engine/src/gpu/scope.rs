//! Scoped GPU state guards.
//!
//! Every guard changes one piece of state on construction and puts it back
//! when dropped, including on early return and unwinding. Guards borrow the
//! thing they wrap mutably and deref to it, so drawing continues through the
//! guard and guards nest:
//!
//! ```ignore
//! let mut stencil = ScopeEnable::new(&mut canvas, Capability::StencilTest);
//! let mut blend = ScopeBlend::alpha(&mut *stencil);
//! blend.draw_polygon(&points);
//! ```

use std::ops::{Deref, DerefMut};

use crate::coords::{Angle, PixelPoint, PixelRect};

use super::{
    Backend, BlendFactor, Capability, ColorMask, GpuContext, ProgramKind, Uniform, UniformValue,
};

/// Anything that can hand out its [`GpuContext`].
pub trait GpuScope {
    type Backend: Backend;
    fn gpu(&mut self) -> &mut GpuContext<Self::Backend>;
}

impl<B: Backend> GpuScope for GpuContext<B> {
    type Backend = B;
    #[inline]
    fn gpu(&mut self) -> &mut GpuContext<B> {
        self
    }
}

macro_rules! scope_deref {
    ($guard:ident) => {
        impl<T: GpuScope> Deref for $guard<'_, T> {
            type Target = T;
            #[inline]
            fn deref(&self) -> &T {
                &*self.inner
            }
        }

        impl<T: GpuScope> DerefMut for $guard<'_, T> {
            #[inline]
            fn deref_mut(&mut self) -> &mut T {
                &mut *self.inner
            }
        }
    };
}

// ── capability ───────────────────────────────────────────────────────────

/// Enables a capability, restoring its previous state on drop.
#[must_use]
pub struct ScopeEnable<'a, T: GpuScope> {
    inner: &'a mut T,
    cap: Capability,
    was_enabled: bool,
}

impl<'a, T: GpuScope> ScopeEnable<'a, T> {
    pub fn new(inner: &'a mut T, cap: Capability) -> Self {
        let gpu = inner.gpu();
        let was_enabled = gpu.is_enabled(cap);
        if !was_enabled {
            gpu.set_capability(cap, true);
        }
        Self { inner, cap, was_enabled }
    }
}

impl<T: GpuScope> Drop for ScopeEnable<'_, T> {
    fn drop(&mut self) {
        if !self.was_enabled {
            self.inner.gpu().set_capability(self.cap, false);
        }
    }
}

scope_deref!(ScopeEnable);

// ── blending ─────────────────────────────────────────────────────────────

/// Enables blending with a given function.
#[must_use]
pub struct ScopeBlend<'a, T: GpuScope> {
    inner: &'a mut T,
    was_enabled: bool,
}

impl<'a, T: GpuScope> ScopeBlend<'a, T> {
    pub fn new(inner: &'a mut T, src: BlendFactor, dst: BlendFactor) -> Self {
        let gpu = inner.gpu();
        let was_enabled = gpu.is_enabled(Capability::Blend);
        if !was_enabled {
            gpu.set_capability(Capability::Blend, true);
        }
        gpu.blend_func(src, dst);
        Self { inner, was_enabled }
    }

    /// Straight-alpha "over" blending.
    #[inline]
    pub fn alpha(inner: &'a mut T) -> Self {
        Self::new(inner, BlendFactor::SrcAlpha, BlendFactor::OneMinusSrcAlpha)
    }

    /// Blends every fragment with a constant opacity.
    pub fn constant_alpha(inner: &'a mut T, alpha: f32) -> Self {
        let guard = Self::new(inner, BlendFactor::ConstantAlpha, BlendFactor::OneMinusConstantAlpha);
        guard.inner.gpu().blend_color([0.0, 0.0, 0.0, alpha]);
        guard
    }
}

impl<T: GpuScope> Drop for ScopeBlend<'_, T> {
    fn drop(&mut self) {
        if !self.was_enabled {
            self.inner.gpu().set_capability(Capability::Blend, false);
        }
    }
}

scope_deref!(ScopeBlend);

// ── scissor ──────────────────────────────────────────────────────────────

/// Restricts drawing to `rect` (canvas coordinates).
#[must_use]
pub struct ScopeScissor<'a, T: GpuScope> {
    inner: &'a mut T,
    was_enabled: bool,
}

impl<'a, T: GpuScope> ScopeScissor<'a, T> {
    pub fn new(inner: &'a mut T, rect: PixelRect) -> Self {
        let gpu = inner.gpu();
        let was_enabled = gpu.is_enabled(Capability::ScissorTest);
        gpu.scissor(rect);
        if !was_enabled {
            gpu.set_capability(Capability::ScissorTest, true);
        }
        Self { inner, was_enabled }
    }
}

impl<T: GpuScope> Drop for ScopeScissor<'_, T> {
    fn drop(&mut self) {
        if !self.was_enabled {
            self.inner.gpu().set_capability(Capability::ScissorTest, false);
        }
    }
}

scope_deref!(ScopeScissor);

// ── color mask ───────────────────────────────────────────────────────────

/// Restricts color writes; all channels are writable again on drop.
#[must_use]
pub struct ScopeColorMask<'a, T: GpuScope> {
    inner: &'a mut T,
}

impl<'a, T: GpuScope> ScopeColorMask<'a, T> {
    pub fn new(inner: &'a mut T, mask: ColorMask) -> Self {
        inner.gpu().color_mask(mask);
        Self { inner }
    }

    /// Stencil-only drawing.
    #[inline]
    pub fn none(inner: &'a mut T) -> Self {
        Self::new(inner, ColorMask::NONE)
    }
}

impl<T: GpuScope> Drop for ScopeColorMask<'_, T> {
    fn drop(&mut self) {
        self.inner.gpu().color_mask(ColorMask::ALL);
    }
}

scope_deref!(ScopeColorMask);

// ── textured drawing ─────────────────────────────────────────────────────

/// Sets up texture drawing with an overall opacity.
///
/// Selects the program and blend function that draw a texture at `alpha`,
/// either honouring the texture's own alpha channel or replacing it.
/// Leaves the program bound on drop; callers re-select what they need.
#[must_use]
pub struct ScopeTextureConstantAlpha<'a, T: GpuScope> {
    inner: &'a mut T,
    blend_was_enabled: Option<bool>,
}

impl<'a, T: GpuScope> ScopeTextureConstantAlpha<'a, T> {
    pub fn new(inner: &'a mut T, use_texture_alpha: bool, alpha: f32) -> Self {
        let gpu = inner.gpu();
        let blending = use_texture_alpha || alpha < 1.0;
        let blend_was_enabled = blending.then(|| gpu.is_enabled(Capability::Blend));
        if blend_was_enabled == Some(false) {
            gpu.set_capability(Capability::Blend, true);
        }

        if use_texture_alpha {
            gpu.blend_func(BlendFactor::SrcAlpha, BlendFactor::OneMinusSrcAlpha);
            gpu.set_uniform(
                ProgramKind::CombineTexture,
                Uniform::Color,
                UniformValue::Vec4([1.0, 1.0, 1.0, alpha.clamp(0.0, 1.0)]),
            );
            gpu.use_program(ProgramKind::CombineTexture);
        } else {
            if blending {
                gpu.blend_func(BlendFactor::ConstantAlpha, BlendFactor::OneMinusConstantAlpha);
                gpu.blend_color([0.0, 0.0, 0.0, alpha.clamp(0.0, 1.0)]);
            }
            gpu.use_program(ProgramKind::Texture);
        }

        Self { inner, blend_was_enabled }
    }
}

impl<T: GpuScope> Drop for ScopeTextureConstantAlpha<'_, T> {
    fn drop(&mut self) {
        if self.blend_was_enabled == Some(false) {
            self.inner.gpu().set_capability(Capability::Blend, false);
        }
    }
}

scope_deref!(ScopeTextureConstantAlpha);

// ── modelview ────────────────────────────────────────────────────────────

/// Rotates, scales and shifts solid-program geometry around `origin`.
///
/// Points drawn through the guard are interpreted relative to `origin`.
#[must_use]
pub struct ScopeRotateShift<'a, T: GpuScope> {
    inner: &'a mut T,
}

impl<'a, T: GpuScope> ScopeRotateShift<'a, T> {
    pub fn new(inner: &'a mut T, origin: PixelPoint, angle: Angle, scale: f32) -> Self {
        let m = glam::Mat4::from_translation(glam::Vec3::new(origin.x as f32, origin.y as f32, 0.0))
            * glam::Mat4::from_rotation_z(angle.as_radians() as f32)
            * glam::Mat4::from_scale(glam::Vec3::new(scale, scale, 1.0));
        inner
            .gpu()
            .set_uniform(ProgramKind::Solid, Uniform::Modelview, UniformValue::Mat4(m.to_cols_array()));
        Self { inner }
    }
}

impl<T: GpuScope> Drop for ScopeRotateShift<'_, T> {
    fn drop(&mut self) {
        self.inner.gpu().set_uniform(
            ProgramKind::Solid,
            Uniform::Modelview,
            UniformValue::Mat4(glam::Mat4::IDENTITY.to_cols_array()),
        );
    }
}

scope_deref!(ScopeRotateShift);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::PixelSize;
    use crate::gpu::software::SoftwareBackend;

    fn ctx() -> GpuContext<SoftwareBackend> {
        GpuContext::new(SoftwareBackend::new(PixelSize::new(8, 8)), PixelSize::new(8, 8)).unwrap()
    }

    #[test]
    fn enable_is_restored_on_drop() {
        let mut ctx = ctx();
        {
            let g = ScopeEnable::new(&mut ctx, Capability::StencilTest);
            assert!(g.is_enabled(Capability::StencilTest));
            assert!(g.backend().state().is_enabled(Capability::StencilTest));
        }
        assert!(!ctx.is_enabled(Capability::StencilTest));
        assert!(!ctx.backend().state().is_enabled(Capability::StencilTest));
    }

    #[test]
    fn nested_guards_keep_outer_state() {
        let mut ctx = ctx();
        let mut outer = ScopeBlend::alpha(&mut ctx);
        {
            let inner = ScopeBlend::new(&mut *outer, BlendFactor::One, BlendFactor::Zero);
            assert!(inner.is_enabled(Capability::Blend));
        }
        assert!(outer.is_enabled(Capability::Blend));
        drop(outer);
        assert!(!ctx.is_enabled(Capability::Blend));
    }

    #[test]
    fn guard_restores_on_early_return() {
        fn bail(ctx: &mut GpuContext<SoftwareBackend>) -> Option<()> {
            let _s = ScopeScissor::new(ctx, PixelRect::new(0, 0, 2, 2));
            None?;
            Some(())
        }

        let mut ctx = ctx();
        assert!(bail(&mut ctx).is_none());
        assert!(!ctx.is_enabled(Capability::ScissorTest));
    }

    #[test]
    fn color_mask_resets_to_all() {
        let mut ctx = ctx();
        {
            let m = ScopeColorMask::none(&mut ctx);
            assert_eq!(m.backend().state().color_mask, ColorMask::NONE);
        }
        assert_eq!(ctx.backend().state().color_mask, ColorMask::ALL);
    }

    #[test]
    fn rotate_shift_resets_modelview() {
        let mut ctx = ctx();
        let solid = ctx.programs().get(ProgramKind::Solid).unwrap().id();
        {
            let g = ScopeRotateShift::new(&mut ctx, PixelPoint::new(4, 4), Angle::degrees(90.0), 1.0);
            let m = g.backend().uniforms(solid).unwrap().modelview;
            let p = m.transform_point3(glam::Vec3::new(1.0, 0.0, 0.0));
            assert!((p.x - 4.0).abs() < 1e-5 && (p.y - 5.0).abs() < 1e-5);
        }
        assert_eq!(ctx.backend().uniforms(solid).unwrap().modelview, glam::Mat4::IDENTITY);
    }

    #[test]
    fn opaque_texture_draw_does_not_blend() {
        let mut ctx = ctx();
        {
            let t = ScopeTextureConstantAlpha::new(&mut ctx, false, 1.0);
            assert!(!t.is_enabled(Capability::Blend));
        }
        {
            let t = ScopeTextureConstantAlpha::new(&mut ctx, false, 0.5);
            assert!(t.is_enabled(Capability::Blend));
        }
        assert!(!ctx.is_enabled(Capability::Blend));
    }
}
