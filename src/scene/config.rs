use std::path::Path;

use anyhow::Context;

use crate::{
    animation::{
        ease::Ease,
        player::{LoopMode, PlaybackParams},
    },
    foundation::core::{Rect, Rgb8, Size},
    foundation::error::{StageError, StageResult},
};

/// Instances render in a square box this much larger than their nominal `size_px`.
pub const BOX_SCALE: f64 = 1.3;

/// Static placement and timing for one decorative instance.
///
/// Keys are camelCase (`startIndex`, `frameCount`, `durationSeconds`, `sizePx`,
/// `topPercent`, `leftPercent`, `zIndex`). The short site-data names `numImages`,
/// `duration`, `size`, `top` and `left` are accepted too.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceDescriptor {
    pub start_index: usize,
    #[serde(alias = "numImages")]
    pub frame_count: usize,
    #[serde(rename = "durationSeconds", alias = "durationSecs", alias = "duration")]
    pub duration_secs: f64,
    #[serde(alias = "size")]
    pub size_px: f64,
    #[serde(alias = "top")]
    pub top_percent: f64,
    #[serde(alias = "left")]
    pub left_percent: f64,
    #[serde(default)]
    pub z_index: i32,
    #[serde(default)]
    pub ease: Ease,
    #[serde(default)]
    pub loop_mode: LoopMode,
}

impl InstanceDescriptor {
    pub fn validate(&self) -> StageResult<()> {
        self.playback()?;
        if !self.size_px.is_finite() || self.size_px <= 0.0 {
            return Err(StageError::validation("size must be finite and > 0"));
        }
        if !self.top_percent.is_finite() || !self.left_percent.is_finite() {
            return Err(StageError::validation("top/left must be finite"));
        }
        Ok(())
    }

    pub fn playback(&self) -> StageResult<PlaybackParams> {
        Ok(
            PlaybackParams::new(self.start_index, self.frame_count, self.duration_secs)?
                .with_ease(self.ease)
                .with_loop_mode(self.loop_mode),
        )
    }

    /// Edge length of the square box the instance paints into.
    pub fn edge(&self) -> f64 {
        self.size_px * BOX_SCALE
    }

    /// Box inside a section of `section` logical size.
    pub fn logical_box(&self, section: Size) -> Rect {
        let x = section.width * self.left_percent / 100.0;
        let y = section.height * self.top_percent / 100.0;
        let edge = self.edge();
        Rect::new(x, y, x + edge, y + edge)
    }
}

/// Page section that mounts a list of instances while sequences are active.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SectionDef {
    pub name: String,
    /// How many copies of the instance list the section mounts.
    #[serde(default = "default_repeat")]
    pub repeat: usize,
    #[serde(default)]
    pub instances: Vec<InstanceDescriptor>,
}

fn default_repeat() -> usize {
    1
}

/// Page foreground/background colors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Palette {
    pub foreground: Rgb8,
    pub background: Rgb8,
}

impl Palette {
    /// White on black.
    pub const INACTIVE: Self = Self {
        foreground: Rgb8::WHITE,
        background: Rgb8::BLACK,
    };

    /// Black on studio red.
    pub const ACTIVE: Self = Self {
        foreground: Rgb8::BLACK,
        background: Rgb8::new(0xfd, 0x2c, 0x2a),
    };
}

/// Durations and scales for the trigger and entrance tweens.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Timing {
    pub palette_secs: f64,
    pub reveal_secs: f64,
    pub reveal_max_scale: f64,
    pub entrance_secs: f64,
    pub entrance_from_scale: f64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            palette_secs: 1.2,
            reveal_secs: 2.0,
            reveal_max_scale: 1000.0,
            entrance_secs: 1.0,
            entrance_from_scale: 0.3,
        }
    }
}

impl Timing {
    pub fn validate(&self) -> StageResult<()> {
        for (name, v) in [
            ("paletteSecs", self.palette_secs),
            ("revealSecs", self.reveal_secs),
            ("entranceSecs", self.entrance_secs),
        ] {
            if !v.is_finite() || v < 0.0 {
                return Err(StageError::validation(format!(
                    "timing {name} must be finite and >= 0"
                )));
            }
        }
        if !self.reveal_max_scale.is_finite() || self.reveal_max_scale <= 0.0 {
            return Err(StageError::validation(
                "timing revealMaxScale must be finite and > 0",
            ));
        }
        if !self.entrance_from_scale.is_finite() || self.entrance_from_scale < 0.0 {
            return Err(StageError::validation(
                "timing entranceFromScale must be finite and >= 0",
            ));
        }
        Ok(())
    }
}

/// Everything the stage needs: pool sources, per-section instances, palettes, timing.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SiteConfig {
    /// Ordered image URIs; position is the frame index.
    pub sources: Vec<String>,
    #[serde(default)]
    pub sections: Vec<SectionDef>,
    #[serde(default = "default_inactive")]
    pub inactive: Palette,
    #[serde(default = "default_active")]
    pub active: Palette,
    #[serde(default)]
    pub timing: Timing,
}

fn default_inactive() -> Palette {
    Palette::INACTIVE
}

fn default_active() -> Palette {
    Palette::ACTIVE
}

impl SiteConfig {
    pub fn from_json_str(s: &str) -> StageResult<Self> {
        let cfg: Self = serde_json::from_str(s)
            .map_err(|e| StageError::serde(format!("site config json: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_path(path: &Path) -> StageResult<Self> {
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("read site config '{}'", path.display()))?;
        Self::from_json_str(&s)
    }

    pub fn to_json_pretty(&self) -> StageResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| StageError::serde(format!("site config json: {e}")))
    }

    pub fn validate(&self) -> StageResult<()> {
        if self.sources.iter().any(|s| s.trim().is_empty()) {
            return Err(StageError::validation("sources must not contain empty URIs"));
        }
        self.timing.validate()?;

        let mut seen = std::collections::HashSet::new();
        for section in &self.sections {
            if !seen.insert(section.name.as_str()) {
                return Err(StageError::validation(format!(
                    "duplicate section name '{}'",
                    section.name
                )));
            }
            if section.repeat == 0 {
                return Err(StageError::validation(format!(
                    "section '{}' repeat must be >= 1",
                    section.name
                )));
            }
            for (i, inst) in section.instances.iter().enumerate() {
                inst.validate().map_err(|e| {
                    StageError::validation(format!("section '{}' instance {i}: {e}", section.name))
                })?;
                let end = inst.start_index.saturating_add(inst.frame_count - 1);
                if end >= self.sources.len() {
                    tracing::warn!(
                        section = %section.name,
                        instance = i,
                        end,
                        pool_len = self.sources.len(),
                        "instance range extends past the pool; indices will be clamped"
                    );
                }
            }
        }
        Ok(())
    }

    /// Total instances mounted while sequences are active.
    pub fn instance_count(&self) -> usize {
        self.sections
            .iter()
            .map(|s| s.repeat * s.instances.len())
            .sum()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/config.rs"]
mod tests;
