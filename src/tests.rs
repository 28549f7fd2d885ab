use std::{
    alloc::{GlobalAlloc, Layout, System},
    any::Any,
    cell::Cell,
    collections::HashSet,
    ptr::NonNull,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Barrier, Mutex,
    },
    thread,
};

use crate::{
    block::FusedBlock, const_pointer_cast, dynamic_pointer_cast, impl_shared_from_this,
    reinterpret_pointer_cast, static_pointer_cast, BlockKind, Error, FusedLayout, SharedFromThis,
    Shrc, ThisSlot,
};

// Counts the bytes allocated on the current thread, so tests can check that a block frees
// exactly what it allocated.
struct Tracking;

thread_local! {
    static LIVE_BYTES: Cell<isize> = const { Cell::new(0) };
    static LAST_ALLOC: Cell<Option<Layout>> = const { Cell::new(None) };
    static FAIL_NEXT: Cell<bool> = const { Cell::new(false) };
}

unsafe impl GlobalAlloc for Tracking {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        if FAIL_NEXT.try_with(|fail| fail.replace(false)) == Ok(true) {
            return std::ptr::null_mut();
        }
        let _ = LIVE_BYTES.try_with(|live| live.set(live.get() + layout.size() as isize));
        let _ = LAST_ALLOC.try_with(|last| last.set(Some(layout)));
        System.alloc(layout)
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        let _ = LIVE_BYTES.try_with(|live| live.set(live.get() - layout.size() as isize));
        System.dealloc(ptr, layout)
    }
}

#[global_allocator]
static GLOBAL: Tracking = Tracking;

fn live_bytes() -> isize {
    LIVE_BYTES.with(Cell::get)
}

// No logger is installed in these tests, so logging never allocates while bytes are counted.
fn fail_next_allocation() {
    FAIL_NEXT.with(|fail| fail.set(true));
}

struct Data {
    string: String,
    int: i32,
}

struct Tracked {
    drops: Arc<AtomicUsize>,
}

impl Tracked {
    fn new(drops: &Arc<AtomicUsize>) -> Self {
        Tracked {
            drops: drops.clone(),
        }
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.drops.fetch_add(1, Ordering::SeqCst);
    }
}

struct Node {
    this: ThisSlot,
    label: &'static str,
    drops: Arc<AtomicUsize>,
}

impl_shared_from_this!(Node, this);

impl Node {
    fn new(label: &'static str, drops: &Arc<AtomicUsize>) -> Self {
        Node {
            this: ThisSlot::new(),
            label,
            drops: drops.clone(),
        }
    }

    fn handle(&self) -> Shrc<Node> {
        self.shared_from_this().unwrap()
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        self.drops.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn test_singlethreaded() {
    let data = Data {
        string: String::from("This is data."),
        int: 123,
    };

    let mut shrc = Shrc::make(data);
    assert_eq!(shrc.int, 123);
    Shrc::get_mut(&mut shrc).unwrap().string = String::from("This is also data");
    assert_eq!(shrc.string, "This is also data");
}

#[test]
fn test_multithread() {
    let drops = Arc::new(AtomicUsize::new(0));
    let shrc = Shrc::make(Tracked::new(&drops));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let local = shrc.clone();
            thread::spawn(move || {
                for _ in 0..1000 {
                    let copy = local.clone();
                    assert!(Shrc::use_count(&copy) >= 2);
                    drop(copy);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(Shrc::use_count(&shrc), 1);
    assert_eq!(drops.load(Ordering::SeqCst), 0);
    drop(shrc);
    assert_eq!(drops.load(Ordering::SeqCst), 1);
}

#[test]
fn test_last_owner_on_another_thread() {
    let drops = Arc::new(AtomicUsize::new(0));
    let shrc = Shrc::from_box(Box::new(Tracked::new(&drops)));
    let moved = shrc.clone();
    drop(shrc);

    thread::spawn(move || drop(moved)).join().unwrap();
    assert_eq!(drops.load(Ordering::SeqCst), 1);
}

#[test]
fn test_exactly_once_destruction() {
    let drops = Arc::new(AtomicUsize::new(0));
    let first = Shrc::make(Tracked::new(&drops));
    let mut copies: Vec<_> = (0..9).map(|_| first.clone()).collect();
    copies.insert(4, first);

    // Drop from both ends towards the middle.
    while !copies.is_empty() {
        copies.remove(0);
        if let Some(last) = copies.pop() {
            drop(last);
        }
        if !copies.is_empty() {
            assert_eq!(drops.load(Ordering::SeqCst), 0);
        }
    }
    assert_eq!(drops.load(Ordering::SeqCst), 1);
}

#[test]
fn test_count_accuracy() {
    let shrc = Shrc::from_box(Box::new(5));
    let mut copies: Vec<_> = (0..4).map(|_| shrc.clone()).collect();
    for copy in &copies {
        assert_eq!(Shrc::use_count(copy), 5);
    }
    assert!(!Shrc::is_unique(&shrc));

    copies.truncate(1);
    assert_eq!(Shrc::use_count(&shrc), 2);
    copies.clear();
    assert_eq!(Shrc::use_count(&shrc), 1);
    assert!(Shrc::is_unique(&shrc));
}

#[test]
fn test_move_empties_source() {
    let mut a = Shrc::make(7);
    let extra = a.clone();
    let b = Shrc::take(&mut a);

    assert!(Shrc::as_ptr(&a).is_none());
    assert!(Shrc::get(&a).is_none());
    assert_eq!(Shrc::use_count(&a), 0);
    assert!(Shrc::is_unique(&a));
    assert_eq!(Shrc::use_count(&b), 2);
    drop(extra);
    assert_eq!(Shrc::use_count(&b), 1);
}

#[test]
fn test_self_assignment() {
    let drops = Arc::new(AtomicUsize::new(0));
    let mut shrc = Shrc::make(Tracked::new(&drops));

    shrc = shrc.clone();
    assert_eq!(Shrc::use_count(&shrc), 1);

    let moved = Shrc::take(&mut shrc);
    shrc = moved;
    assert_eq!(Shrc::use_count(&shrc), 1);

    let mut other = Shrc::null();
    Shrc::swap(&mut shrc, &mut other);
    Shrc::swap(&mut shrc, &mut other);
    assert_eq!(Shrc::use_count(&shrc), 1);
    assert!(Shrc::is_null(&other));
    assert_eq!(drops.load(Ordering::SeqCst), 0);

    // Assigning over a live handle releases what it owned.
    shrc = Shrc::make(Tracked::new(&drops));
    assert_eq!(drops.load(Ordering::SeqCst), 1);
    drop(shrc);
    assert_eq!(drops.load(Ordering::SeqCst), 2);
}

#[repr(align(32))]
struct Aligned32([u8; 32]);

#[test]
fn test_fused_layout() {
    let before = live_bytes();
    {
        let shrc = Shrc::make(Aligned32([7; 32]));
        let expected = FusedLayout::new::<Aligned32, FusedBlock<Aligned32>>().unwrap();
        assert_eq!(LAST_ALLOC.with(Cell::get), Some(expected.layout));
        assert_eq!(live_bytes() - before, expected.layout.size() as isize);

        let addr = Shrc::as_ptr(&shrc).unwrap().as_ptr() as usize;
        assert_eq!(addr % 32, 0);
        assert_eq!(Shrc::block_kind(&shrc), Some(BlockKind::Fused));
        assert_eq!(addr - Shrc::owner(&shrc).get(), expected.offset);
        assert_eq!(shrc.0[31], 7);
    }
    assert_eq!(live_bytes(), before);
}

#[test]
fn test_separate_block_frees_everything() {
    let before = live_bytes();
    {
        let shrc: Shrc<[u64]> = Shrc::from(vec![1, 2, 3]);
        let copy = shrc.clone();
        assert_eq!(Shrc::block_kind(&copy), Some(BlockKind::Separate));
        assert_eq!(copy[2], 3);
    }
    assert_eq!(live_bytes(), before);
}

#[test]
fn test_uninit_drop_skips_payload() {
    let drops = Arc::new(AtomicUsize::new(0));
    let before = live_bytes();
    drop(Shrc::<Tracked>::make_for_overwrite());
    assert_eq!(live_bytes(), before);
    assert_eq!(drops.load(Ordering::SeqCst), 0);

    let slot = Shrc::<Tracked>::make_for_overwrite();
    let shrc = slot.write(Tracked::new(&drops));
    assert_eq!(Shrc::use_count(&shrc), 1);
    drop(shrc);
    assert_eq!(drops.load(Ordering::SeqCst), 1);
}

#[test]
fn test_self_reference_before_ownership() {
    let drops = Arc::new(AtomicUsize::new(0));
    let node = Node::new("loose", &drops);
    assert!(!node.this_slot().is_owned());
    assert_eq!(node.shared_from_this().err(), Some(Error::NotYetOwned));
    assert_eq!(node.shared_from_this_const().err(), Some(Error::NotYetOwned));

    let owned = Shrc::make_enabled(node);
    assert!(owned.this_slot().is_owned());
    let again = owned.handle();
    assert!(Shrc::owner_equal(&owned, &again));
    assert!(owned == again);
    assert_eq!(Shrc::use_count(&owned), 2);
}

#[test]
fn test_self_reference_separate_block() {
    let drops = Arc::new(AtomicUsize::new(0));
    let owned = Shrc::from_box_enabled(Box::new(Node::new("boxed", &drops)));
    assert_eq!(Shrc::block_kind(&owned), Some(BlockKind::Separate));

    let view = owned.shared_from_this_const().unwrap();
    assert!(Shrc::owner_equal(&owned, &view));
    assert_eq!(view.label, "boxed");
    assert_eq!(Shrc::use_count(&owned), 2);

    drop(owned);
    assert_eq!(drops.load(Ordering::SeqCst), 0);
    drop(view);
    assert_eq!(drops.load(Ordering::SeqCst), 1);
}

#[test]
fn test_plain_constructors_do_not_wire() {
    let drops = Arc::new(AtomicUsize::new(0));
    let owned = Shrc::make(Node::new("plain", &drops));
    assert_eq!(owned.shared_from_this().err(), Some(Error::NotYetOwned));
}

#[test]
fn test_shared_from_this_scenario() {
    let drops = Arc::new(AtomicUsize::new(0));

    let p1 = Shrc::from_box_enabled(Box::new(Node::new("p1", &drops)));
    assert_eq!(Shrc::use_count(&p1), 1);

    let p2 = Shrc::make_enabled(Node::new("p2", &drops));
    assert_eq!(Shrc::use_count(&p2), 1);

    let p3 = p2.handle();
    assert_eq!(Shrc::use_count(&p2), 2);
    assert!(Shrc::owner_equal(&p2, &p3));
    assert!(!Shrc::owner_equal(&p1, &p3));

    drop(p2);
    assert_eq!(Shrc::use_count(&p3), 1);
    assert_eq!(drops.load(Ordering::SeqCst), 0);
    assert_eq!(p3.label, "p2");

    drop(p3);
    assert_eq!(drops.load(Ordering::SeqCst), 1);
    drop(p1);
    assert_eq!(drops.load(Ordering::SeqCst), 2);
}

struct Reentrant {
    this: ThisSlot,
    seen: Arc<Mutex<Option<Error>>>,
}

impl_shared_from_this!(Reentrant, this);

impl Drop for Reentrant {
    fn drop(&mut self) {
        *self.seen.lock().unwrap() = self.shared_from_this().err();
    }
}

#[test]
fn test_shared_from_this_during_destruction() {
    for fused in [true, false] {
        let seen = Arc::new(Mutex::new(None));
        let value = Reentrant {
            this: ThisSlot::new(),
            seen: seen.clone(),
        };
        let shrc = if fused {
            Shrc::make_enabled(value)
        } else {
            Shrc::from_box_enabled(Box::new(value))
        };
        drop(shrc);
        assert_eq!(*seen.lock().unwrap(), Some(Error::Expired));
    }
}

#[test]
fn test_dynamic_cast_mismatch() {
    let shrc = Shrc::make(String::from("text"));
    let any = static_pointer_cast(&shrc, |v| v as &dyn Any);
    assert_eq!(Shrc::use_count(&shrc), 2);

    let wrong = any.downcast::<u64>();
    assert!(Shrc::is_null(&wrong));
    assert_eq!(Shrc::use_count(&shrc), 2);
    drop(wrong);
    assert_eq!(Shrc::use_count(&shrc), 2);

    let shared = static_pointer_cast(&shrc, |v| v as &(dyn Any + Send + Sync));
    let missed = dynamic_pointer_cast(&shared, |v| v.downcast_ref::<u64>());
    assert!(Shrc::is_null(&missed));
    assert_eq!(Shrc::use_count(&shrc), 3);

    let right = dynamic_pointer_cast(&shared, |v| v.downcast_ref::<String>());
    assert_eq!(&*right, "text");
    assert_eq!(Shrc::use_count(&shrc), 4);
    assert!(right == shrc);
}

#[test]
fn test_casts_on_empty_handles() {
    let empty = Shrc::<u32>::null();
    assert!(Shrc::is_null(&static_pointer_cast(&empty, |v| v as &dyn Any)));
    assert!(Shrc::is_null(&Shrc::as_const(&empty)));
    assert!(Shrc::is_null(&unsafe {
        reinterpret_pointer_cast::<_, i32>(&empty)
    }));
    assert!(Shrc::is_null(&Shrc::alias(&empty, |v| v)));
}

#[test]
fn test_const_round_trip() {
    let mut shrc = Shrc::make(vec![1]);
    let view = Shrc::as_const(&shrc);
    assert!(Shrc::get_mut(&mut shrc).is_none());

    let back = const_pointer_cast(&view);
    assert_eq!(Shrc::use_count(&shrc), 3);
    assert!(back == shrc);
    drop(view);
    drop(back);
    Shrc::get_mut(&mut shrc).unwrap().push(2);
    assert_eq!(*shrc, [1, 2]);
}

#[test]
fn test_reinterpret_cast() {
    #[repr(transparent)]
    struct Celsius(i32);

    let shrc = Shrc::make(Celsius(-4));
    let raw = unsafe { reinterpret_pointer_cast::<_, i32>(&shrc) };
    assert_eq!(*raw, -4);
    assert!(Shrc::owner_equal(&shrc, &raw));
    assert_eq!(shrc.0, -4);
}

#[repr(C)]
struct Pair {
    first: u64,
    second: u64,
}

#[test]
fn test_value_and_owner_identity() {
    let pair = Shrc::make(Pair {
        first: 1,
        second: 2,
    });
    let second = Shrc::alias(&pair, |p| &p.second);
    let first = Shrc::alias(&pair, |p| &p.first);

    // Same owner, different payload addresses.
    assert!(Shrc::owner_equal(&pair, &second));
    assert!(!Shrc::owner_before(&pair, &second));
    assert!(!Shrc::owner_before(&second, &pair));
    assert!(pair != second);
    assert!(first < second);

    // Same payload address as the whole pair, under another type.
    assert!(first == pair);

    let other = Shrc::make(Pair {
        first: 1,
        second: 2,
    });
    assert!(!Shrc::owner_equal(&pair, &other));
    assert!(Shrc::owner_before(&pair, &other) != Shrc::owner_before(&other, &pair));

    let set: HashSet<_> = [pair.clone(), pair.clone(), other.clone()].into_iter().collect();
    assert_eq!(set.len(), 2);

    let empty = Shrc::<Pair>::null();
    assert!(empty < pair);
    assert!(Shrc::owner_equal(&empty, &Shrc::<u8>::null()));
}

#[test]
fn test_alias_into_keeps_count() {
    let drops = Arc::new(AtomicUsize::new(0));
    let shrc = Shrc::make((Tracked::new(&drops), 5u8));
    let number = Shrc::alias_into(shrc, |pair| &pair.1);
    assert_eq!(Shrc::use_count(&number), 1);
    assert_eq!(*number, 5);
    drop(number);
    assert_eq!(drops.load(Ordering::SeqCst), 1);
}

#[test]
fn test_reset() {
    let drops = Arc::new(AtomicUsize::new(0));
    let mut shrc = Shrc::<Tracked>::null();
    Shrc::reset(&mut shrc);
    assert!(Shrc::is_null(&shrc));

    Shrc::reset_box(&mut shrc, Box::new(Tracked::new(&drops)));
    assert_eq!(Shrc::use_count(&shrc), 1);
    let copy = shrc.clone();

    Shrc::reset_box(&mut shrc, Box::new(Tracked::new(&drops)));
    assert!(!Shrc::owner_equal(&shrc, &copy));
    assert_eq!(drops.load(Ordering::SeqCst), 0);
    drop(copy);
    assert_eq!(drops.load(Ordering::SeqCst), 1);

    Shrc::reset(&mut shrc);
    assert_eq!(drops.load(Ordering::SeqCst), 2);
    Shrc::reset(&mut shrc);
    assert_eq!(drops.load(Ordering::SeqCst), 2);
}

#[test]
fn test_reset_rewires() {
    let drops = Arc::new(AtomicUsize::new(0));
    let mut shrc = Shrc::make_enabled(Node::new("old", &drops));
    Shrc::reset_box_enabled(&mut shrc, Box::new(Node::new("new", &drops)));
    assert_eq!(drops.load(Ordering::SeqCst), 1);

    let again = shrc.handle();
    assert!(Shrc::owner_equal(&shrc, &again));
    assert_eq!(again.label, "new");
}

#[test]
fn test_custom_deleter() {
    let deletes = Arc::new(AtomicUsize::new(0));
    let raw = NonNull::from(Box::leak(Box::new(41)));

    let counter = deletes.clone();
    let shrc = unsafe {
        Shrc::from_raw_with_deleter(raw, move |ptr: NonNull<i32>| {
            counter.fetch_add(1, Ordering::SeqCst);
            drop(Box::from_raw(ptr.as_ptr()));
        })
    };
    let copies: Vec<_> = (0..3).map(|_| shrc.clone()).collect();
    assert_eq!(*copies[2], 41);
    drop(shrc);
    drop(copies);
    assert_eq!(deletes.load(Ordering::SeqCst), 1);

    let mut replaced = Shrc::make(0);
    let counter = deletes.clone();
    let raw = NonNull::from(Box::leak(Box::new(43)));
    unsafe {
        Shrc::reset_with_deleter(&mut replaced, raw, move |ptr: NonNull<i32>| {
            counter.fetch_add(1, Ordering::SeqCst);
            drop(Box::from_raw(ptr.as_ptr()));
        })
    };
    assert_eq!(*replaced, 43);
    assert_eq!(Shrc::block_kind(&replaced), Some(BlockKind::Separate));
    drop(replaced);
    assert_eq!(deletes.load(Ordering::SeqCst), 2);
}

#[test]
fn test_from_raw() {
    let null = unsafe { Shrc::<u8>::from_raw(std::ptr::null_mut()) };
    assert!(Shrc::is_null(&null));

    let drops = Arc::new(AtomicUsize::new(0));
    let raw = Box::into_raw(Box::new(Node::new("raw", &drops)));
    let shrc = unsafe { Shrc::from_raw_enabled(raw) };
    assert_eq!(Shrc::use_count(&shrc.handle()), 2);
    drop(shrc);
    assert_eq!(drops.load(Ordering::SeqCst), 1);
}

#[test]
fn test_trait_object_payload() {
    trait Shape: Send + Sync {
        fn area(&self) -> f64;
    }
    struct Square(f64);
    impl Shape for Square {
        fn area(&self) -> f64 {
            self.0 * self.0
        }
    }

    let boxed: Box<dyn Shape> = Box::new(Square(3.0));
    let shape = Shrc::from_box(boxed);
    assert_eq!(shape.area(), 9.0);

    let square = Shrc::make(Square(2.0));
    let upcast = static_pointer_cast(&square, |s| s as &dyn Shape);
    assert_eq!(upcast.area(), 4.0);
    assert!(upcast == square);
}

#[test]
#[should_panic(expected = "dereferenced an empty Shrc")]
fn test_deref_empty_panics() {
    let shrc = Shrc::<i32>::default();
    let _ = *shrc;
}

#[test]
fn test_checked_access_on_empty() {
    let shrc = Shrc::<str>::null();
    assert_eq!(Shrc::try_get(&shrc), Err(Error::EmptyHandle));
    assert_eq!(format!("{shrc:?}"), "(empty)");
    assert_eq!(Shrc::block_kind(&shrc), None);
    assert!(Shrc::address(&shrc).is_null());
}

#[test]
fn test_last_owners_race() {
    let drops = Arc::new(AtomicUsize::new(0));
    for _ in 0..50 {
        let shrc = Shrc::make(Tracked::new(&drops));
        let barrier = Arc::new(Barrier::new(8));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let local = shrc.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    drop(local);
                })
            })
            .collect();
        drop(shrc);
        for handle in handles {
            handle.join().unwrap();
        }
    }
    assert_eq!(drops.load(Ordering::SeqCst), 50);
}

#[test]
fn test_fused_allocation_failure() {
    let drops = Arc::new(AtomicUsize::new(0));
    let value = Tracked::new(&drops);
    let before = live_bytes();

    fail_next_allocation();
    let result = Shrc::try_make(value);
    let expected = FusedLayout::new::<Tracked, FusedBlock<Tracked>>().unwrap();
    assert_eq!(
        result.err(),
        Some(Error::AllocationFailed {
            layout: expected.layout
        })
    );
    assert_eq!(live_bytes(), before);
    assert_eq!(drops.load(Ordering::SeqCst), 1);

    fail_next_allocation();
    assert!(Shrc::<Tracked>::try_make_for_overwrite().is_err());
    assert_eq!(live_bytes(), before);
}

#[test]
fn test_separate_allocation_failure() {
    let drops = Arc::new(AtomicUsize::new(0));
    let deletes = Arc::new(AtomicUsize::new(0));
    let before = live_bytes();
    let boxed = Box::new(Tracked::new(&drops));

    fail_next_allocation();
    let result = Shrc::try_from_box(boxed);
    assert!(matches!(result, Err(Error::AllocationFailed { .. })));
    assert_eq!(drops.load(Ordering::SeqCst), 1);
    drop(result);
    assert_eq!(live_bytes(), before);

    let counter = deletes.clone();
    let raw = NonNull::from(Box::leak(Box::new(Tracked::new(&drops))));
    fail_next_allocation();
    let result = unsafe {
        Shrc::try_from_raw_with_deleter(raw, move |ptr: NonNull<Tracked>| {
            counter.fetch_add(1, Ordering::SeqCst);
            drop(Box::from_raw(ptr.as_ptr()));
        })
    };
    assert!(result.is_err());
    assert_eq!(deletes.load(Ordering::SeqCst), 1);
    assert_eq!(drops.load(Ordering::SeqCst), 2);
    drop(result);
    assert_eq!(live_bytes(), before);
}

static ANSWER: i32 = 42;

#[test]
fn test_views_are_read_only() {
    let owner = Shrc::make(1);
    let mut outside = Shrc::alias(&owner, |_| &ANSWER);
    drop(owner);
    assert!(Shrc::is_unique(&outside));
    assert!(Shrc::get_mut(&mut outside).is_none());
    assert_eq!(*outside, 42);

    let pair = Shrc::make(Pair {
        first: 1,
        second: 2,
    });
    let mut second = Shrc::alias_into(pair, |p| &p.second);
    assert!(Shrc::is_unique(&second));
    assert!(Shrc::get_mut(&mut second).is_none());
    assert!(Shrc::get_pin_mut(&mut second).is_none());

    let shrc = Shrc::make(String::from("text"));
    let shared = static_pointer_cast(&shrc, |v| v as &(dyn Any + Send + Sync));
    let mut checked = dynamic_pointer_cast(&shared, |v| v.downcast_ref::<String>());
    drop(shrc);
    drop(shared);
    assert!(Shrc::is_unique(&checked));
    assert!(Shrc::get_mut(&mut checked).is_none());
}

#[test]
fn test_whole_payload_casts_stay_writable() {
    let boxed: Box<dyn Any> = Box::new(5u32);
    let any = Shrc::from_box(boxed);
    let mut number = any.downcast::<u32>();
    drop(any);
    *Shrc::get_mut(&mut number).unwrap() += 1;
    assert_eq!(*number, 6);

    let mut back = const_pointer_cast(&Shrc::into_const(number));
    *Shrc::get_mut(&mut back).unwrap() += 1;
    assert_eq!(*back, 7);
}

#[test]
fn test_self_handles_are_read_only() {
    let drops = Arc::new(AtomicUsize::new(0));
    let owned = Shrc::make_enabled(Node::new("pinned", &drops));
    let mut again = owned.handle();
    drop(owned);
    assert!(Shrc::is_unique(&again));
    assert!(Shrc::get_pin_mut(&mut again).is_none());
}

#[test]
fn test_pin_set_unwires_self_reference() {
    let drops = Arc::new(AtomicUsize::new(0));
    let mut owned = Shrc::make_enabled(Node::new("first", &drops));
    Shrc::get_pin_mut(&mut owned)
        .unwrap()
        .set(Node::new("second", &drops));
    assert_eq!(drops.load(Ordering::SeqCst), 1);
    assert_eq!(owned.label, "second");
    assert_eq!(owned.shared_from_this().err(), Some(Error::NotYetOwned));
}
