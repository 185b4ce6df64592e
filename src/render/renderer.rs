use crate::{
    assets::pool::PoolHandle,
    foundation::core::{Rect, Size},
    render::surface::{Surface, is_measured},
};

/// Paint counters for one renderer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RendererStats {
    pub paints: u64,
    pub skipped_not_ready: u64,
    pub skipped_unmeasured: u64,
    pub skipped_surface_error: u64,
    pub reallocations: u64,
}

/// Paints pooled frames into one instance's surface at device resolution.
pub struct SurfaceRenderer {
    surface: Box<dyn Surface>,
    logical: Size,
    scale: f64,
    // Geometry the backing store currently matches; `None` forces a reallocation.
    allocated: Option<(Size, f64)>,
    last_index: Option<usize>,
    last_painted: Option<usize>,
    stats: RendererStats,
}

impl SurfaceRenderer {
    pub fn new(surface: Box<dyn Surface>, logical: Size, scale: f64) -> Self {
        Self {
            surface,
            logical,
            scale,
            allocated: None,
            last_index: None,
            last_painted: None,
            stats: RendererStats::default(),
        }
    }

    pub fn surface(&self) -> &dyn Surface {
        self.surface.as_ref()
    }

    pub fn logical_size(&self) -> Size {
        self.logical
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn stats(&self) -> RendererStats {
        self.stats
    }

    /// Last frame actually drawn into the surface.
    pub fn last_painted(&self) -> Option<usize> {
        self.last_painted
    }

    /// Paint frame `index`. Returns whether anything was drawn.
    ///
    /// Not-ready assets and unmeasured containers are skipped silently; the next frame
    /// change tries again.
    pub fn on_frame_changed(&mut self, index: usize, pool: &PoolHandle) -> bool {
        self.last_index = Some(index);
        self.paint(index, pool)
    }

    /// Container re-measure (viewport resize or density change).
    ///
    /// Marks the surface stale and repaints the most recent frame right away.
    pub fn set_container(&mut self, logical: Size, scale: f64, pool: &PoolHandle) -> bool {
        if self.logical == logical && self.scale == scale {
            return false;
        }
        self.logical = logical;
        self.scale = scale;
        self.allocated = None;
        match self.last_index {
            Some(index) => self.paint(index, pool),
            None => false,
        }
    }

    fn paint(&mut self, index: usize, pool: &PoolHandle) -> bool {
        let asset = pool.get(index);
        let Some(image) = asset.image() else {
            self.stats.skipped_not_ready += 1;
            tracing::trace!(index, readiness = ?asset.readiness(), "frame not ready; skipping paint");
            return false;
        };

        if !is_measured(self.logical) {
            self.stats.skipped_unmeasured += 1;
            tracing::trace!(index, "container unmeasured; skipping paint");
            return false;
        }

        let geometry = (self.logical, self.scale);
        if self.allocated != Some(geometry) {
            if let Err(err) = self.surface.resize(self.logical, self.scale) {
                self.stats.skipped_surface_error += 1;
                tracing::warn!(index, error = %err, "surface resize failed; skipping paint");
                return false;
            }
            self.allocated = Some(geometry);
            self.stats.reallocations += 1;
        } else {
            self.surface.clear();
        }

        let dst = Rect::new(0.0, 0.0, self.logical.width, self.logical.height);
        if let Err(err) = self.surface.blit(image, dst) {
            self.stats.skipped_surface_error += 1;
            tracing::warn!(index, error = %err, "surface blit failed");
            return false;
        }

        self.last_painted = Some(index);
        self.stats.paints += 1;
        true
    }
}

impl std::fmt::Debug for SurfaceRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurfaceRenderer")
            .field("logical", &self.logical)
            .field("scale", &self.scale)
            .field("pixel_size", &self.surface.pixel_size())
            .field("last_painted", &self.last_painted)
            .field("stats", &self.stats)
            .finish()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/renderer.rs"]
mod tests;
