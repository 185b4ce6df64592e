//! framestage drives decorative image-sequence instances on a page.
//!
//! The engine is built around a few explicit pieces:
//!
//! - An [`ImagePool`] loads the ordered frame list once and shares it through a [`PoolHandle`]
//! - Each mounted instance owns a [`SequencePlayer`] (clock time to frame index) and a
//!   [`SurfaceRenderer`] (frame index to pixels on a [`Surface`])
//! - A [`TriggerController`] flips the page between its inactive and active palettes
//! - A [`Stage`] ties them together: clicks mount and unmount instances, ticks advance them
#![forbid(unsafe_code)]

mod foundation;

pub(crate) mod animation;
pub(crate) mod assets;
pub(crate) mod render;
pub(crate) mod scene;

pub use crate::foundation::core::{Affine, Point, Rect, Rgb8, Size, Vec2, Viewport};
pub use crate::foundation::error::{StageError, StageResult};

pub use crate::animation::clock::{Clock, ManualClock, SystemClock};
pub use crate::animation::ease::Ease;
pub use crate::animation::player::{
    LoopMode, PlaybackParams, PlaybackState, PlayerState, SequencePlayer,
};
pub use crate::animation::tween::{Lerp, Tween};
pub use crate::assets::decode::{MAX_FRAME_EDGE, PreparedImage, decode_image};
pub use crate::assets::pool::{ImageAsset, ImagePool, PoolHandle, Readiness};
pub use crate::assets::source::{AssetSource, DirSource, MemorySource};
pub use crate::render::cpu::CpuSurface;
pub use crate::render::renderer::{RendererStats, SurfaceRenderer};
pub use crate::render::surface::{FrameRGBA, Surface};
pub use crate::scene::config::{
    BOX_SCALE, InstanceDescriptor, Palette, SectionDef, SiteConfig, Timing,
};
pub use crate::scene::stage::{
    FramePaint, InstanceKey, InstanceView, MountedInstance, Stage, StageStats, SurfaceFactory,
    TickReport,
};
pub use crate::scene::trigger::{
    REVEAL_BASE_DIAMETER, RevealFrame, Transition, TriggerController, TriggerFrame,
};
