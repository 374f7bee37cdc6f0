use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicUsize, Ordering};

use dewpoint_mlp::{CancelToken, Dataset, Discard, Network, Shuffle, TrainConfig};

struct CountingAlloc {
    allocs: AtomicUsize,
    reallocs: AtomicUsize,
    deallocs: AtomicUsize,
    bytes: AtomicUsize,
}

impl CountingAlloc {
    const fn new() -> Self {
        Self {
            allocs: AtomicUsize::new(0),
            reallocs: AtomicUsize::new(0),
            deallocs: AtomicUsize::new(0),
            bytes: AtomicUsize::new(0),
        }
    }

    fn reset(&self) {
        self.allocs.store(0, Ordering::Relaxed);
        self.reallocs.store(0, Ordering::Relaxed);
        self.deallocs.store(0, Ordering::Relaxed);
        self.bytes.store(0, Ordering::Relaxed);
    }

    fn snapshot(&self) -> AllocSnapshot {
        AllocSnapshot {
            allocs: self.allocs.load(Ordering::Relaxed),
            reallocs: self.reallocs.load(Ordering::Relaxed),
            deallocs: self.deallocs.load(Ordering::Relaxed),
            bytes: self.bytes.load(Ordering::Relaxed),
        }
    }

    fn alloc_events(&self) -> usize {
        self.allocs.load(Ordering::Relaxed) + self.reallocs.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AllocSnapshot {
    allocs: usize,
    reallocs: usize,
    deallocs: usize,
    bytes: usize,
}

unsafe impl GlobalAlloc for CountingAlloc {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        self.allocs.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(layout.size(), Ordering::Relaxed);
        unsafe { System.alloc(layout) }
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        self.allocs.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(layout.size(), Ordering::Relaxed);
        unsafe { System.alloc_zeroed(layout) }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        self.deallocs.fetch_add(1, Ordering::Relaxed);
        unsafe { System.dealloc(ptr, layout) }
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        self.reallocs.fetch_add(1, Ordering::Relaxed);
        // Approximate accounting: record the new size.
        self.bytes.fetch_add(new_size, Ordering::Relaxed);
        unsafe { System.realloc(ptr, layout, new_size) }
    }
}

#[global_allocator]
static ALLOC: CountingAlloc = CountingAlloc::new();

fn make_dataset(len: usize) -> Dataset {
    let inputs = vec![0.1_f32; len * 3];
    let targets = vec![0.2_f32; len];
    Dataset::from_flat(inputs, targets).unwrap()
}

#[test]
fn fit_allocation_count_is_independent_of_batch_count() {
    let batch_size = 16;
    let base = Network::new_with_seed(0);

    let train_small = make_dataset(batch_size);
    let train_large = make_dataset(batch_size * 64);

    let cfg = TrainConfig {
        epochs: 1,
        batch_size,
        learning_rate: 1e-2,
        shuffle: Shuffle::Seeded(0),
        ..TrainConfig::default()
    };
    let cancel = CancelToken::new();

    // Warm up one-time lazy state (logging callsites) outside the measured runs.
    base.clone()
        .fit(&train_small, &cfg, &mut Discard, &cancel)
        .unwrap();

    let mut net_small = base.clone();
    ALLOC.reset();
    let before_small = ALLOC.snapshot();
    net_small
        .fit(&train_small, &cfg, &mut Discard, &cancel)
        .unwrap();
    let alloc_small = ALLOC.alloc_events();
    let after_small = ALLOC.snapshot();

    let mut net_large = base;
    ALLOC.reset();
    let before_large = ALLOC.snapshot();
    net_large
        .fit(&train_large, &cfg, &mut Discard, &cancel)
        .unwrap();
    let alloc_large = ALLOC.alloc_events();
    let after_large = ALLOC.snapshot();

    // Buffers and the epoch snapshot are allocated per run and per epoch, never per batch.
    assert_eq!(
        alloc_small, alloc_large,
        "expected allocation event count to be independent of batches.\n\
small: before={before_small:?} after={after_small:?}\n\
large: before={before_large:?} after={after_large:?}"
    );
}
