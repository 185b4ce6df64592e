use std::sync::Arc;

use crate::foundation::error::{StageError, StageResult};

/// Largest edge a frame may have; surfaces address pixels with `u16`.
pub const MAX_FRAME_EDGE: u32 = u16::MAX as u32;

/// One decoded sequence frame, premultiplied RGBA8, shared by every instance that shows it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreparedImage {
    pub width: u32,
    pub height: u32,
    /// Row-major premultiplied RGBA8.
    pub rgba8_premul: Arc<Vec<u8>>,
}

/// Decode a frame and premultiply it for blitting.
///
/// Frames that could never be painted (no area, or an edge past [`MAX_FRAME_EDGE`]) are
/// rejected here so the pool marks them failed once instead of every paint failing.
pub fn decode_image(bytes: &[u8]) -> StageResult<PreparedImage> {
    let rgba = image::load_from_memory(bytes)
        .map_err(|e| StageError::asset(format!("decode frame: {e}")))?
        .into_rgba8();
    let (width, height) = rgba.dimensions();
    if width == 0 || height == 0 {
        return Err(StageError::asset("decoded frame has no pixels"));
    }
    if width > MAX_FRAME_EDGE || height > MAX_FRAME_EDGE {
        return Err(StageError::asset(format!(
            "decoded frame {width}x{height} exceeds {MAX_FRAME_EDGE} px per edge"
        )));
    }

    let mut data = rgba.into_raw();
    for px in data.chunks_exact_mut(4) {
        let a = px[3];
        for c in &mut px[..3] {
            *c = premul(*c, a);
        }
    }

    Ok(PreparedImage {
        width,
        height,
        rgba8_premul: Arc::new(data),
    })
}

fn premul(c: u8, a: u8) -> u8 {
    match a {
        0 => 0,
        255 => c,
        _ => ((u16::from(c) * u16::from(a) + 127) / 255) as u8,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;
