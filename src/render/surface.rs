use crate::{
    assets::decode::PreparedImage,
    foundation::core::{Rect, Size},
    foundation::error::{StageError, StageResult},
};

/// Read back pixels of a surface.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FrameRGBA {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// RGBA8 bytes, tightly packed, row-major.
    pub data: Vec<u8>,
    /// Whether the `data` is premultiplied alpha.
    pub premultiplied: bool,
}

impl FrameRGBA {
    /// Straight-alpha copy of the pixels, as image encoders expect.
    pub fn to_straight_rgba8(&self) -> Vec<u8> {
        let mut out = self.data.clone();
        if !self.premultiplied {
            return out;
        }
        for px in out.chunks_exact_mut(4) {
            let a = u16::from(px[3]);
            if a == 0 || a == 255 {
                continue;
            }
            for c in &mut px[..3] {
                *c = ((u16::from(*c) * 255 + a / 2) / a).min(255) as u8;
            }
        }
        out
    }
}

/// 2D drawing capability a renderer paints into.
///
/// Coordinates passed to [`blit`](Surface::blit) are logical; the surface applies its own
/// device scale.
pub trait Surface {
    /// Reallocate the backing store for `logical` at `scale` physical pixels per logical
    /// pixel. Destroys prior content.
    fn resize(&mut self, logical: Size, scale: f64) -> StageResult<()>;

    /// Reset every pixel to transparent without reallocating.
    fn clear(&mut self);

    /// Draw `image` stretched to fill `dst`.
    fn blit(&mut self, image: &PreparedImage, dst: Rect) -> StageResult<()>;

    /// Physical size of the backing store, `(0, 0)` before the first resize.
    fn pixel_size(&self) -> (u32, u32);

    /// Copy of the current pixels, when the surface supports readback.
    fn snapshot(&self) -> Option<FrameRGBA> {
        None
    }
}

/// Physical extent for a logical size at `scale`, rounded up so the box is fully covered.
pub fn pixel_extent(logical: Size, scale: f64) -> StageResult<(u32, u32)> {
    if !is_measured(logical) {
        return Err(StageError::render(format!(
            "logical size {}x{} has no area",
            logical.width, logical.height
        )));
    }
    if !scale.is_finite() || scale <= 0.0 {
        return Err(StageError::render("surface scale must be finite and > 0"));
    }
    let w = (logical.width * scale).ceil();
    let h = (logical.height * scale).ceil();
    if w > f64::from(u32::MAX) || h > f64::from(u32::MAX) {
        return Err(StageError::render("surface extent overflows u32"));
    }
    Ok((w as u32, h as u32))
}

/// A container counts as measured once it has finite, non-zero area.
pub fn is_measured(logical: Size) -> bool {
    logical.width.is_finite()
        && logical.height.is_finite()
        && logical.width > 0.0
        && logical.height > 0.0
}

#[cfg(test)]
#[path = "../../tests/unit/render/surface.rs"]
mod tests;
