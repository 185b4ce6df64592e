use std::sync::Arc;

use crate::{
    assets::decode::PreparedImage,
    foundation::core::{Affine, Rect, Size, Vec2},
    foundation::error::{StageError, StageResult},
    render::surface::{FrameRGBA, Surface, pixel_extent},
};

struct Backing {
    width: u16,
    height: u16,
    scale: f64,
    pixmap: vello_cpu::Pixmap,
}

/// CPU surface powered by `vello_cpu`.
///
/// Holds one converted image paint so repainting the same frame after a resize does not
/// convert the bitmap again.
#[derive(Default)]
pub struct CpuSurface {
    backing: Option<Backing>,
    paint_cache: Option<(Arc<Vec<u8>>, vello_cpu::Image)>,
}

impl CpuSurface {
    pub fn new() -> Self {
        Self::default()
    }

    fn paint_for(&mut self, image: &PreparedImage) -> StageResult<vello_cpu::Image> {
        if let Some((bytes, paint)) = &self.paint_cache
            && Arc::ptr_eq(bytes, &image.rgba8_premul)
        {
            return Ok(paint.clone());
        }

        let pixmap =
            image_premul_bytes_to_pixmap(image.rgba8_premul.as_slice(), image.width, image.height)?;
        let paint = vello_cpu::Image {
            image: vello_cpu::ImageSource::Pixmap(Arc::new(pixmap)),
            sampler: vello_cpu::peniko::ImageSampler::default(),
        };
        self.paint_cache = Some((Arc::clone(&image.rgba8_premul), paint.clone()));
        Ok(paint)
    }
}

impl Surface for CpuSurface {
    fn resize(&mut self, logical: Size, scale: f64) -> StageResult<()> {
        let (w, h) = pixel_extent(logical, scale)?;
        let width: u16 = w
            .try_into()
            .map_err(|_| StageError::render("surface width exceeds u16"))?;
        let height: u16 = h
            .try_into()
            .map_err(|_| StageError::render("surface height exceeds u16"))?;

        self.backing = Some(Backing {
            width,
            height,
            scale,
            pixmap: vello_cpu::Pixmap::new(width, height),
        });
        Ok(())
    }

    fn clear(&mut self) {
        if let Some(b) = self.backing.as_mut() {
            b.pixmap.data_as_u8_slice_mut().fill(0);
        }
    }

    fn blit(&mut self, image: &PreparedImage, dst: Rect) -> StageResult<()> {
        if image.width == 0 || image.height == 0 {
            return Err(StageError::render("cannot blit an empty image"));
        }
        let paint = self.paint_for(image)?;
        let b = self
            .backing
            .as_mut()
            .ok_or_else(|| StageError::render("blit before the surface was sized"))?;

        let to_dst = Affine::scale(b.scale)
            * Affine::translate(Vec2::new(dst.x0, dst.y0))
            * Affine::scale_non_uniform(
                dst.width() / f64::from(image.width),
                dst.height() / f64::from(image.height),
            );

        let mut ctx = vello_cpu::RenderContext::new(b.width, b.height);
        ctx.set_paint_transform(vello_cpu::kurbo::Affine::IDENTITY);
        ctx.set_transform(affine_to_cpu(to_dst));
        ctx.set_paint(paint);
        ctx.fill_rect(&vello_cpu::kurbo::Rect::new(
            0.0,
            0.0,
            f64::from(image.width),
            f64::from(image.height),
        ));
        ctx.flush();
        ctx.render_to_pixmap(&mut b.pixmap);
        Ok(())
    }

    fn pixel_size(&self) -> (u32, u32) {
        self.backing
            .as_ref()
            .map(|b| (u32::from(b.width), u32::from(b.height)))
            .unwrap_or((0, 0))
    }

    fn snapshot(&self) -> Option<FrameRGBA> {
        let b = self.backing.as_ref()?;
        Some(FrameRGBA {
            width: u32::from(b.width),
            height: u32::from(b.height),
            data: b.pixmap.data_as_u8_slice().to_vec(),
            premultiplied: true,
        })
    }
}

fn affine_to_cpu(a: Affine) -> vello_cpu::kurbo::Affine {
    vello_cpu::kurbo::Affine::new(a.as_coeffs())
}

fn image_premul_bytes_to_pixmap(
    rgba8_premul: &[u8],
    width: u32,
    height: u32,
) -> StageResult<vello_cpu::Pixmap> {
    let w: u16 = width
        .try_into()
        .map_err(|_| StageError::render("image width exceeds u16"))?;
    let h: u16 = height
        .try_into()
        .map_err(|_| StageError::render("image height exceeds u16"))?;
    if rgba8_premul.len() != width as usize * height as usize * 4 {
        return Err(StageError::render("prepared image byte length mismatch"));
    }

    let mut may_have_opacities = false;
    let mut pixels = Vec::with_capacity(width as usize * height as usize);
    for px in rgba8_premul.chunks_exact(4) {
        let a = px[3];
        may_have_opacities |= a != 255;
        pixels.push(vello_cpu::peniko::color::PremulRgba8 {
            r: px[0],
            g: px[1],
            b: px[2],
            a,
        });
    }

    Ok(vello_cpu::Pixmap::from_parts_with_opacity(
        pixels,
        w,
        h,
        may_have_opacities,
    ))
}

#[cfg(test)]
#[path = "../../tests/unit/render/cpu.rs"]
mod tests;
