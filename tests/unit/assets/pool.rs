use std::{
    collections::HashMap,
    io::Cursor,
    sync::{
        Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

use super::*;
use crate::{assets::source::MemorySource, foundation::error::StageResult};

const WAIT: Duration = Duration::from_secs(10);

fn png(rgba: [u8; 4]) -> Vec<u8> {
    let img = image::RgbaImage::from_raw(1, 1, rgba.to_vec()).unwrap();
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn uris(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("seq/{i:03}.png")).collect()
}

fn memory_source(n: usize) -> MemorySource {
    let mut src = MemorySource::new();
    for (i, uri) in uris(n).into_iter().enumerate() {
        src.insert(uri, png([i as u8, 0, 0, 255]));
    }
    src
}

struct CountingSource {
    inner: MemorySource,
    fetches: Mutex<HashMap<String, usize>>,
}

impl CountingSource {
    fn new(inner: MemorySource) -> Self {
        Self {
            inner,
            fetches: Mutex::new(HashMap::new()),
        }
    }

    fn counts(&self) -> HashMap<String, usize> {
        self.fetches.lock().unwrap().clone()
    }
}

impl AssetSource for CountingSource {
    fn fetch(&self, uri: &str) -> StageResult<Vec<u8>> {
        *self
            .fetches
            .lock()
            .unwrap()
            .entry(uri.to_owned())
            .or_default() += 1;
        self.inner.fetch(uri)
    }
}

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
fn load_decodes_every_source_in_order() {
    let pool = ImagePool::new(Arc::new(memory_source(5)));
    let handle = pool.load(&uris(5));
    assert_eq!(handle.len(), 5);
    assert!(handle.wait_settled(WAIT));
    assert_eq!(handle.ready_count(), 5);

    for i in 0..5 {
        let asset = handle.get(i);
        assert_eq!(asset.index(), i);
        assert_eq!(asset.readiness(), Readiness::Loaded);
        let img = asset.image().unwrap();
        assert_eq!((img.width, img.height), (1, 1));
        assert_eq!(img.rgba8_premul[0], i as u8);
    }
}

#[test]
fn failed_sources_stay_failed_without_failing_the_pool() {
    let src = memory_source(2).with("broken.png", b"not an image".to_vec());
    let pool = ImagePool::new(Arc::new(src));
    let sources = vec![
        "seq/000.png".to_owned(),
        "broken.png".to_owned(),
        "missing.png".to_owned(),
        "seq/001.png".to_owned(),
    ];
    let handle = pool.load(&sources);
    assert!(handle.wait_settled(WAIT));

    assert!(handle.get(0).is_ready());
    assert_eq!(handle.get(1).readiness(), Readiness::Failed);
    assert_eq!(handle.get(2).readiness(), Readiness::Failed);
    assert!(handle.get(1).image().is_none());
    assert!(handle.get(3).is_ready());
    assert_eq!(handle.ready_count(), 2);
    assert_eq!(handle.failed_count(), 2);
}

#[test]
fn out_of_range_reads_as_failed() {
    let pool = ImagePool::new(Arc::new(memory_source(1)));
    let handle = pool.load(&uris(1));
    assert_eq!(handle.get(7).readiness(), Readiness::Failed);
}

#[test]
fn assets_read_pending_until_decoded() {
    let src = Arc::new(GatedSource {
        inner: memory_source(1),
        open: AtomicBool::new(false),
    });
    let pool = ImagePool::new(src.clone());
    let handle = pool.load(&uris(1));

    assert_eq!(handle.get(0).readiness(), Readiness::Pending);
    assert!(!handle.is_settled());
    assert!(!handle.wait_settled(Duration::from_millis(20)));

    src.open.store(true, Ordering::SeqCst);
    assert!(handle.wait_settled(WAIT));
    assert!(handle.get(0).is_ready());
}

#[test]
fn concurrent_first_load_fetches_each_source_once() {
    let src = Arc::new(CountingSource::new(memory_source(8)));
    let pool = ImagePool::new(src.clone());
    let sources = uris(8);

    let handles: Vec<PoolHandle> = std::thread::scope(|s| {
        let joins: Vec<_> = (0..16).map(|_| s.spawn(|| pool.load(&sources))).collect();
        joins.into_iter().map(|j| j.join().unwrap()).collect()
    });

    for h in &handles[1..] {
        assert!(PoolHandle::same_session(&handles[0], h));
    }
    assert!(handles[0].wait_settled(WAIT));

    let counts = src.counts();
    assert_eq!(counts.len(), 8);
    assert!(counts.values().all(|&n| n == 1), "{counts:?}");
}

#[test]
fn later_load_with_other_sources_reuses_first_session() {
    let pool = ImagePool::new(Arc::new(memory_source(3)));
    let a = pool.load(&uris(3));
    let b = pool.load(&uris(2));
    assert!(PoolHandle::same_session(&a, &b));
    assert_eq!(b.len(), 3);
}

#[test]
fn dispose_ends_the_session() {
    let src = Arc::new(CountingSource::new(memory_source(2)));
    let mut pool = ImagePool::new(src.clone());
    let first = pool.load(&uris(2));
    assert!(first.wait_settled(WAIT));

    pool.dispose();
    assert!(pool.handle().is_none());
    // Outstanding handles keep working.
    assert!(first.get(1).is_ready());

    let second = pool.load(&uris(2));
    assert!(!PoolHandle::same_session(&first, &second));
    assert!(second.wait_settled(WAIT));
    assert!(src.counts().values().all(|&n| n == 2));
}
