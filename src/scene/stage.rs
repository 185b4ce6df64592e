use std::sync::Arc;

use crate::{
    animation::{
        clock::Clock,
        ease::Ease,
        player::{PlaybackParams, SequencePlayer},
        tween::{Lerp, Tween},
    },
    assets::pool::PoolHandle,
    foundation::core::{Point, Rect, Size, Viewport},
    foundation::error::StageResult,
    render::{
        renderer::{RendererStats, SurfaceRenderer},
        surface::Surface,
    },
    scene::{
        config::{InstanceDescriptor, SiteConfig},
        trigger::{Transition, TriggerController, TriggerFrame, secs_to_duration},
    },
};

/// Makes a fresh, unallocated surface for every mount.
pub type SurfaceFactory = Box<dyn Fn() -> Box<dyn Surface>>;

/// Position of an instance in the config: section, repeat copy, slot in the section list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceKey {
    pub section: usize,
    pub copy: usize,
    pub slot: usize,
}

/// Counters across the stage lifetime.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StageStats {
    pub mounts: u64,
    pub unmounts: u64,
    pub ticks: u64,
}

/// One mounted instance: its player, its renderer and its entrance tween.
pub struct MountedInstance {
    key: InstanceKey,
    mount_id: u64,
    descriptor: InstanceDescriptor,
    rect: Rect,
    player: SequencePlayer,
    renderer: SurfaceRenderer,
    entrance: Tween<f64>,
    from_scale: f64,
}

impl MountedInstance {
    pub fn key(&self) -> InstanceKey {
        self.key
    }

    /// Unique per mount; a remount of the same key gets a new id.
    pub fn mount_id(&self) -> u64 {
        self.mount_id
    }

    pub fn descriptor(&self) -> &InstanceDescriptor {
        &self.descriptor
    }

    /// Logical box inside its section.
    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn z_index(&self) -> i32 {
        self.descriptor.z_index
    }

    pub fn player(&self) -> &SequencePlayer {
        &self.player
    }

    pub fn renderer(&self) -> &SurfaceRenderer {
        &self.renderer
    }

    fn view(&self, now: std::time::Duration) -> InstanceView {
        let appear = self.entrance.sample(now);
        InstanceView {
            key: self.key,
            mount_id: self.mount_id,
            rect: self.rect,
            z_index: self.descriptor.z_index,
            opacity: appear,
            scale: f64::lerp(&self.from_scale, &1.0, appear),
            current_index: self.player.current_index(),
            renderer: self.renderer.stats(),
        }
    }
}

impl std::fmt::Debug for MountedInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MountedInstance")
            .field("key", &self.key)
            .field("mount_id", &self.mount_id)
            .field("rect", &self.rect)
            .field("player", &self.player)
            .field("renderer", &self.renderer)
            .finish()
    }
}

/// Per-instance presentation at one tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InstanceView {
    pub key: InstanceKey,
    pub mount_id: u64,
    pub rect: Rect,
    pub z_index: i32,
    /// Entrance fade, 0 to 1.
    pub opacity: f64,
    /// Entrance zoom around the box center.
    pub scale: f64,
    pub current_index: Option<usize>,
    pub renderer: RendererStats,
}

/// A frame painted during a tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FramePaint {
    pub key: InstanceKey,
    pub mount_id: u64,
    pub index: usize,
}

/// What one [`Stage::tick`] did.
#[derive(Clone, Debug, PartialEq)]
pub struct TickReport {
    pub now: std::time::Duration,
    pub trigger: TriggerFrame,
    pub painted: Vec<FramePaint>,
    /// Mounted instances in paint order (ascending z-index, then config order).
    pub instances: Vec<InstanceView>,
}

/// Cooperative scheduler owning the trigger and every mounted instance.
///
/// Single-threaded: all mounting, ticking and resizing happen on the caller's thread.
pub struct Stage {
    config: SiteConfig,
    params: Vec<Vec<PlaybackParams>>,
    pool: PoolHandle,
    clock: Arc<dyn Clock>,
    factory: SurfaceFactory,
    viewport: Viewport,
    trigger: TriggerController,
    mounted: Vec<MountedInstance>,
    next_mount_id: u64,
    stats: StageStats,
}

impl Stage {
    pub fn new(
        config: SiteConfig,
        pool: PoolHandle,
        clock: Arc<dyn Clock>,
        factory: SurfaceFactory,
    ) -> StageResult<Self> {
        config.validate()?;
        let params = config
            .sections
            .iter()
            .map(|s| {
                s.instances
                    .iter()
                    .map(InstanceDescriptor::playback)
                    .collect::<StageResult<Vec<_>>>()
            })
            .collect::<StageResult<Vec<_>>>()?;
        let trigger = TriggerController::new(config.inactive, config.active, config.timing);

        Ok(Self {
            config,
            params,
            pool,
            clock,
            factory,
            viewport: Viewport::default(),
            trigger,
            mounted: Vec::new(),
            next_mount_id: 0,
            stats: StageStats::default(),
        })
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    pub fn pool(&self) -> &PoolHandle {
        &self.pool
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn is_active(&self) -> bool {
        self.trigger.is_active()
    }

    pub fn mounted(&self) -> &[MountedInstance] {
        &self.mounted
    }

    pub fn stats(&self) -> StageStats {
        self.stats
    }

    /// Toggle the sequences flag and mount or unmount every instance before returning.
    pub fn click_heading(&mut self, point: Point) -> Transition {
        let now = self.clock.now();
        let transition = self.trigger.on_heading_click(point, now);
        match transition {
            Transition::Activated => self.mount_all(now),
            Transition::Deactivated => self.unmount_all(),
        }
        transition
    }

    /// Advance every mounted player to the clock's current time and paint changed frames.
    pub fn tick(&mut self) -> TickReport {
        let now = self.clock.now();
        self.stats.ticks += 1;
        let trigger = self.trigger.sample(now);

        let mut painted = Vec::new();
        for inst in &mut self.mounted {
            let Some(index) = inst.player.tick(now) else {
                continue;
            };
            if inst.renderer.on_frame_changed(index, &self.pool) {
                painted.push(FramePaint {
                    key: inst.key,
                    mount_id: inst.mount_id,
                    index,
                });
            }
        }

        let mut instances: Vec<InstanceView> = self.mounted.iter().map(|m| m.view(now)).collect();
        instances.sort_by_key(|v| (v.z_index, v.key));

        TickReport {
            now,
            trigger,
            painted,
            instances,
        }
    }

    /// Re-measure every mounted instance against a new viewport.
    #[tracing::instrument(skip(self), fields(mounted = self.mounted.len()))]
    pub fn resize_viewport(&mut self, viewport: Viewport) {
        self.viewport = viewport;
        self.trigger.set_viewport(viewport);
        let section = viewport.size();
        for inst in &mut self.mounted {
            inst.rect = inst.descriptor.logical_box(section);
            inst.renderer.set_container(
                box_size(&inst.descriptor),
                viewport.device_pixel_ratio,
                &self.pool,
            );
        }
    }

    #[tracing::instrument(skip(self), fields(instances = self.config.instance_count()))]
    fn mount_all(&mut self, now: std::time::Duration) {
        self.unmount_all();

        let section_size = self.viewport.size();
        let timing = self.config.timing;
        for (section_idx, section) in self.config.sections.iter().enumerate() {
            for copy in 0..section.repeat {
                for (slot, desc) in section.instances.iter().enumerate() {
                    let params = self.params[section_idx][slot];
                    let mut player = SequencePlayer::new(params, self.pool.len());
                    player.start(now);

                    let rect = desc.logical_box(section_size);
                    let renderer = SurfaceRenderer::new(
                        (self.factory)(),
                        box_size(desc),
                        self.viewport.device_pixel_ratio,
                    );

                    self.mounted.push(MountedInstance {
                        key: InstanceKey {
                            section: section_idx,
                            copy,
                            slot,
                        },
                        mount_id: self.next_mount_id,
                        descriptor: desc.clone(),
                        rect,
                        player,
                        renderer,
                        entrance: Tween::new(
                            0.0,
                            1.0,
                            now,
                            secs_to_duration(timing.entrance_secs),
                            Ease::InOutQuad,
                        ),
                        from_scale: timing.entrance_from_scale,
                    });
                    self.next_mount_id += 1;
                    self.stats.mounts += 1;
                }
            }
        }
        tracing::debug!(mounted = self.mounted.len(), "instances mounted");
    }

    fn unmount_all(&mut self) {
        if self.mounted.is_empty() {
            return;
        }
        let count = self.mounted.len();
        for mut inst in self.mounted.drain(..) {
            inst.player.stop();
            tracing::trace!(key = ?inst.key, mount_id = inst.mount_id, "instance unmounted");
        }
        self.stats.unmounts += count as u64;
        tracing::debug!(count, "instances unmounted");
    }
}

// Taken from the edge directly; `Rect::size` on an offset box can pick up rounding error.
fn box_size(desc: &InstanceDescriptor) -> Size {
    Size::new(desc.edge(), desc.edge())
}

impl std::fmt::Debug for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stage")
            .field("viewport", &self.viewport)
            .field("active", &self.trigger.is_active())
            .field("mounted", &self.mounted.len())
            .field("stats", &self.stats)
            .finish()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/stage.rs"]
mod tests;
