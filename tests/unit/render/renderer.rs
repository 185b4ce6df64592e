use std::{
    cell::RefCell,
    io::Cursor,
    rc::Rc,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use super::*;
use crate::{
    assets::{
        decode::PreparedImage,
        pool::{ImagePool, Readiness},
        source::{AssetSource, MemorySource},
    },
    foundation::error::{StageError, StageResult},
};

#[derive(Clone, Debug, PartialEq)]
enum Call {
    Resize(Size, f64),
    Clear,
    Blit(u32, Rect),
}

#[derive(Clone, Default)]
struct RecordingSurface {
    calls: Rc<RefCell<Vec<Call>>>,
    fail_resize: bool,
}

impl Surface for RecordingSurface {
    fn resize(&mut self, logical: Size, scale: f64) -> StageResult<()> {
        if self.fail_resize {
            return Err(StageError::render("no memory"));
        }
        self.calls.borrow_mut().push(Call::Resize(logical, scale));
        Ok(())
    }

    fn clear(&mut self) {
        self.calls.borrow_mut().push(Call::Clear);
    }

    fn blit(&mut self, image: &PreparedImage, dst: Rect) -> StageResult<()> {
        self.calls.borrow_mut().push(Call::Blit(image.width, dst));
        Ok(())
    }

    fn pixel_size(&self) -> (u32, u32) {
        (0, 0)
    }
}

fn png(width: u32) -> Vec<u8> {
    let img = image::RgbaImage::from_pixel(width, 1, image::Rgba([1, 2, 3, 255]));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

/// Frame `i` decodes to an image `i + 1` pixels wide; "bad.png" never decodes.
fn pool(sources: &[&str]) -> PoolHandle {
    let mut src = MemorySource::new();
    for (i, uri) in sources.iter().enumerate() {
        if *uri != "bad.png" {
            src.insert(*uri, png(i as u32 + 1));
        }
    }
    let sources: Vec<String> = sources.iter().map(|s| s.to_string()).collect();
    let handle = ImagePool::new(Arc::new(src)).load(&sources);
    assert!(handle.wait_settled(Duration::from_secs(10)));
    handle
}

fn renderer(logical: Size, scale: f64) -> (SurfaceRenderer, Rc<RefCell<Vec<Call>>>) {
    let surface = RecordingSurface::default();
    let calls = surface.calls.clone();
    (
        SurfaceRenderer::new(Box::new(surface), logical, scale),
        calls,
    )
}

#[test]
fn first_paint_sizes_surface_then_blits_full_box() {
    let pool = pool(&["a.png", "b.png"]);
    let (mut r, calls) = renderer(Size::new(130.0, 130.0), 2.0);

    assert!(r.on_frame_changed(1, &pool));
    assert_eq!(
        *calls.borrow(),
        vec![
            Call::Resize(Size::new(130.0, 130.0), 2.0),
            Call::Blit(2, Rect::new(0.0, 0.0, 130.0, 130.0)),
        ]
    );
    assert_eq!(r.last_painted(), Some(1));
}

#[test]
fn same_geometry_frames_clear_instead_of_reallocating() {
    let pool = pool(&["a.png", "b.png", "c.png"]);
    let (mut r, calls) = renderer(Size::new(10.0, 10.0), 1.0);

    r.on_frame_changed(0, &pool);
    r.on_frame_changed(1, &pool);
    r.on_frame_changed(2, &pool);

    let calls = calls.borrow();
    let resizes = calls
        .iter()
        .filter(|c| matches!(c, Call::Resize(..)))
        .count();
    assert_eq!(resizes, 1);
    assert_eq!(calls.iter().filter(|c| **c == Call::Clear).count(), 2);
    assert_eq!(r.stats().paints, 3);
    assert_eq!(r.stats().reallocations, 1);
}

#[test]
fn not_ready_frames_are_skipped_silently() {
    let pool = pool(&["a.png", "bad.png"]);
    let (mut r, calls) = renderer(Size::new(10.0, 10.0), 1.0);

    assert!(!r.on_frame_changed(1, &pool));
    assert!(!r.on_frame_changed(42, &pool));
    assert!(calls.borrow().is_empty());
    assert_eq!(r.stats().skipped_not_ready, 2);

    assert!(r.on_frame_changed(0, &pool));
}

#[test]
fn unmeasured_container_skips_until_resized() {
    let pool = pool(&["a.png"]);
    let (mut r, calls) = renderer(Size::ZERO, 1.0);

    assert!(!r.on_frame_changed(0, &pool));
    assert!(calls.borrow().is_empty());
    assert_eq!(r.stats().skipped_unmeasured, 1);

    // Re-measure repaints the pending frame immediately.
    assert!(r.set_container(Size::new(20.0, 20.0), 1.5, &pool));
    assert_eq!(calls.borrow()[0], Call::Resize(Size::new(20.0, 20.0), 1.5));
    assert_eq!(r.last_painted(), Some(0));
}

#[test]
fn container_change_reallocates_once() {
    let pool = pool(&["a.png", "b.png"]);
    let (mut r, calls) = renderer(Size::new(10.0, 10.0), 1.0);
    r.on_frame_changed(0, &pool);

    assert!(!r.set_container(Size::new(10.0, 10.0), 1.0, &pool));
    assert!(r.set_container(Size::new(10.0, 10.0), 2.0, &pool));
    r.on_frame_changed(1, &pool);

    let calls = calls.borrow();
    assert_eq!(
        calls
            .iter()
            .filter(|c| matches!(c, Call::Resize(..)))
            .count(),
        2
    );
    assert_eq!(*calls.last().unwrap(), Call::Blit(2, Rect::new(0.0, 0.0, 10.0, 10.0)));
}

#[test]
fn failed_resize_is_counted_not_raised() {
    let pool = pool(&["a.png"]);
    let surface = RecordingSurface {
        fail_resize: true,
        ..RecordingSurface::default()
    };
    let mut r = SurfaceRenderer::new(Box::new(surface), Size::new(5.0, 5.0), 1.0);
    assert!(!r.on_frame_changed(0, &pool));
    assert_eq!(r.stats().skipped_surface_error, 1);
    assert_eq!(r.last_painted(), None);
}

/// Holds every fetch until `open` is set.
struct GatedSource {
    inner: MemorySource,
    open: AtomicBool,
}

impl AssetSource for GatedSource {
    fn fetch(&self, uri: &str) -> StageResult<Vec<u8>> {
        while !self.open.load(Ordering::SeqCst) {
            std::thread::sleep(Duration::from_millis(1));
        }
        self.inner.fetch(uri)
    }
}

#[test]
fn pending_frame_skips_then_later_change_paints_once_loaded() {
    let src = Arc::new(GatedSource {
        inner: MemorySource::new()
            .with("a.png", png(1))
            .with("b.png", png(2)),
        open: AtomicBool::new(false),
    });
    let handle = ImagePool::new(src.clone()).load(&["a.png".to_owned(), "b.png".to_owned()]);
    let (mut r, calls) = renderer(Size::new(10.0, 10.0), 1.0);

    assert_eq!(handle.get(0).readiness(), Readiness::Pending);
    assert!(!r.on_frame_changed(0, &handle));
    assert!(calls.borrow().is_empty());
    assert_eq!(r.stats().skipped_not_ready, 1);
    assert_eq!(r.last_painted(), None);

    src.open.store(true, Ordering::SeqCst);
    assert!(handle.wait_settled(Duration::from_secs(10)));

    assert!(r.on_frame_changed(1, &handle));
    assert_eq!(r.last_painted(), Some(1));
    assert_eq!(
        *calls.borrow(),
        vec![
            Call::Resize(Size::new(10.0, 10.0), 1.0),
            Call::Blit(2, Rect::new(0.0, 0.0, 10.0, 10.0)),
        ]
    );
    assert_eq!(r.stats().paints, 1);
}
