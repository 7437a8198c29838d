//! Integration tests for the pool swapper.

use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tessera_core::{
    Buffer, BufferError, BufferId, BufferProperties, BufferSwapper, BufferUsage, PoolSwapper,
    SoftwareAllocator, SwapperConfig, SwapperFactory,
};
use tessera_shared::{PixelFormat, Size};

fn swapper_from_toml(source: &str) -> PoolSwapper {
    let config = SwapperConfig::from_toml_str(source).unwrap();
    SwapperFactory::new(Arc::new(SoftwareAllocator::new()))
        .create_swapper(
            &config,
            BufferProperties::new(Size::new(16, 16), PixelFormat::Abgr8888, BufferUsage::Software),
        )
        .unwrap()
}

#[test]
fn test_ready_buffers_reach_compositor_in_release_order() {
    let swapper = swapper_from_toml("buffer_count = 3\nbackend = \"software\"");

    let released: Vec<BufferId> = (0..3)
        .map(|_| {
            let frame = swapper.producer_acquire().unwrap();
            swapper.producer_release(&frame).unwrap();
            frame.id()
        })
        .collect();
    let distinct: HashSet<BufferId> = released.iter().copied().collect();
    assert_eq!(distinct.len(), 3);

    let composited: Vec<BufferId> = (0..3)
        .map(|_| swapper.compositor_acquire().unwrap().id())
        .collect();
    assert_eq!(composited, released);
    assert!(matches!(
        swapper.compositor_acquire(),
        Err(BufferError::NoFrameAvailable)
    ));
}

#[test]
fn test_single_buffer_cycles_without_blocking() {
    let swapper = swapper_from_toml("buffer_count = 1\nbackend = \"software\"");

    for _ in 0..5 {
        let frame = swapper.producer_acquire().unwrap();
        swapper.producer_release(&frame).unwrap();
        let shown = swapper.compositor_acquire().unwrap();
        assert_eq!(shown.id(), frame.id());
        swapper.compositor_release(&shown).unwrap();
    }

    let stats = swapper.stats();
    assert_eq!(stats.frames_produced, 5);
    assert_eq!(stats.producer_waits, 0);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Party {
    Producer,
    Compositor,
}

fn claim(owners: &Mutex<HashMap<BufferId, Party>>, buffer: &Arc<dyn Buffer>, who: Party) {
    let previous = owners.lock().insert(buffer.id(), who);
    assert_eq!(previous, None, "{who:?} got {} while it was held", buffer.id());
}

fn run_exclusivity_stress(toml: &str, frames: u64) {
    let swapper = Arc::new(swapper_from_toml(toml));
    let owners: Arc<Mutex<HashMap<BufferId, Party>>> = Arc::new(Mutex::new(HashMap::new()));
    let producer_done = Arc::new(AtomicBool::new(false));

    let producer = {
        let swapper = Arc::clone(&swapper);
        let owners = Arc::clone(&owners);
        let done = Arc::clone(&producer_done);
        thread::spawn(move || {
            for _ in 0..frames {
                let frame = swapper.producer_acquire().unwrap();
                claim(&owners, &frame, Party::Producer);
                thread::yield_now();
                owners.lock().remove(&frame.id());
                swapper.producer_release(&frame).unwrap();
            }
            done.store(true, Ordering::Release);
        })
    };

    let compositor = {
        let swapper = Arc::clone(&swapper);
        let owners = Arc::clone(&owners);
        let done = Arc::clone(&producer_done);
        thread::spawn(move || loop {
            let stats = swapper.stats();
            if done.load(Ordering::Acquire) && stats.frames_composited - stats.stale_frames == frames
            {
                break;
            }
            match swapper.compositor_acquire() {
                Ok(frame) => {
                    claim(&owners, &frame, Party::Compositor);
                    thread::yield_now();
                    owners.lock().remove(&frame.id());
                    swapper.compositor_release(&frame).unwrap();
                }
                Err(BufferError::NoFrameAvailable) => thread::yield_now(),
                Err(e) => panic!("compositor failed: {e}"),
            }
        })
    };

    producer.join().unwrap();
    compositor.join().unwrap();

    let stats = swapper.stats();
    assert_eq!(stats.frames_produced, frames);
    assert_eq!(stats.frames_composited - stats.stale_frames, frames);
}

#[test]
fn test_exclusivity_double_buffered() {
    run_exclusivity_stress("buffer_count = 2\nbackend = \"software\"", 2_000);
}

#[test]
fn test_exclusivity_triple_buffered() {
    run_exclusivity_stress("buffer_count = 3\nbackend = \"software\"", 2_000);
}

#[test]
fn test_shutdown_stops_every_party() {
    let swapper = Arc::new(swapper_from_toml("buffer_count = 2\nbackend = \"software\""));
    let frame = swapper.producer_acquire().unwrap();
    swapper.producer_release(&frame).unwrap();

    swapper.shutdown();
    assert_eq!(swapper.producer_acquire().unwrap_err(), BufferError::ShutDown);
    assert_eq!(swapper.compositor_acquire().unwrap_err(), BufferError::ShutDown);
}
