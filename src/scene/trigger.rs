use std::time::Duration;

use crate::{
    animation::{
        ease::Ease,
        tween::{Lerp, Tween},
    },
    foundation::core::{Point, Rgb8, Viewport},
    scene::config::{Palette, Timing},
};

/// Diameter of the reveal circle at scale 1, in logical pixels.
pub const REVEAL_BASE_DIAMETER: f64 = 20.0;

impl Lerp for Palette {
    fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        Self {
            foreground: Rgb8::lerp(&a.foreground, &b.foreground, t),
            background: Rgb8::lerp(&a.background, &b.background, t),
        }
    }
}

/// Result of a heading click.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    Activated,
    Deactivated,
}

/// Expanding circle drawn from the click point while the page switches to the active palette.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RevealFrame {
    pub origin: Point,
    pub scale: f64,
    pub color: Rgb8,
}

impl RevealFrame {
    pub fn radius(&self) -> f64 {
        REVEAL_BASE_DIAMETER * self.scale / 2.0
    }
}

/// Page-level visual state at one instant.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TriggerFrame {
    pub active: bool,
    pub palette: Palette,
    pub reveal: Option<RevealFrame>,
}

#[derive(Clone, Debug)]
struct CircleReveal {
    origin: Point,
    scale: Tween<f64>,
}

/// Owns the page-wide "sequences active" flag and the tweens a click starts.
#[derive(Clone, Debug)]
pub struct TriggerController {
    active: bool,
    inactive_palette: Palette,
    active_palette: Palette,
    timing: Timing,
    viewport: Viewport,
    palette: Tween<Palette>,
    reveal: Option<CircleReveal>,
}

impl TriggerController {
    pub fn new(inactive_palette: Palette, active_palette: Palette, timing: Timing) -> Self {
        Self {
            active: false,
            inactive_palette,
            active_palette,
            timing,
            viewport: Viewport::default(),
            palette: Tween::new(
                inactive_palette,
                inactive_palette,
                Duration::ZERO,
                Duration::ZERO,
                Ease::Linear,
            ),
            reveal: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Viewport the reveal has to cover. Applies to reveals started afterwards.
    pub fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
    }

    /// Final reveal scale: the configured maximum, raised if needed so the circle reaches
    /// every corner of the viewport from any click point.
    pub fn reveal_target_scale(&self) -> f64 {
        let cover = 2.0 * self.viewport.diagonal() / REVEAL_BASE_DIAMETER;
        self.timing.reveal_max_scale.max(cover)
    }

    /// Flip the flag, then start the matching tweens at `now`.
    ///
    /// Activation plays the palette tween and a circle reveal anchored at `point`.
    /// Deactivation only tweens the palette back. A reveal still running from an earlier
    /// activation keeps playing; a new activation restarts it from the new point.
    pub fn on_heading_click(&mut self, point: Point, now: Duration) -> Transition {
        self.active = !self.active;

        let from = self.palette.sample(now);
        let palette_dur = secs_to_duration(self.timing.palette_secs);
        if self.active {
            self.palette = Tween::new(
                from,
                self.active_palette,
                now,
                palette_dur,
                Ease::InOutCubic,
            );
            self.reveal = Some(CircleReveal {
                origin: point,
                scale: Tween::new(
                    0.0,
                    self.reveal_target_scale(),
                    now,
                    secs_to_duration(self.timing.reveal_secs),
                    Ease::InOutCubic,
                ),
            });
            tracing::debug!(x = point.x, y = point.y, "sequences activated");
            Transition::Activated
        } else {
            self.palette = Tween::new(
                from,
                self.inactive_palette,
                now,
                palette_dur,
                Ease::InOutCubic,
            );
            tracing::debug!("sequences deactivated");
            Transition::Deactivated
        }
    }

    /// Sample the page state. A finished reveal resets to scale 0 and disappears.
    pub fn sample(&mut self, now: Duration) -> TriggerFrame {
        if self
            .reveal
            .as_ref()
            .is_some_and(|r| r.scale.is_finished(now))
        {
            self.reveal = None;
        }

        TriggerFrame {
            active: self.active,
            palette: self.palette.sample(now),
            reveal: self.reveal.as_ref().map(|r| RevealFrame {
                origin: r.origin,
                scale: r.scale.sample(now),
                color: self.active_palette.background,
            }),
        }
    }
}

pub(crate) fn secs_to_duration(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs.max(0.0)).unwrap_or(Duration::ZERO)
}

#[cfg(test)]
#[path = "../../tests/unit/scene/trigger.rs"]
mod tests;
