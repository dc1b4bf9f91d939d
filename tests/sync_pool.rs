use std::sync::Arc;
use std::thread;
use std::time::Duration;

use respool::error::Error;
use respool::sync::Pool;

#[test]
fn lease_install_recycle_lease_again() {
    let pool = Pool::<String>::builder(1).build().unwrap();
    {
        let mut handle = pool.get_auto_recycle(Duration::from_millis(100)).unwrap();
        assert!(handle.empty());
        handle.reset("first".to_string()).unwrap();
    }
    assert_eq!(pool.stats().available, 1);
    let handle = pool.get_auto_recycle(Duration::from_millis(100)).unwrap();
    assert_eq!(handle.get().unwrap(), "first");
}

#[test]
fn zero_idle_timeout_discards_stale_cell_on_release() {
    let pool = Pool::<u32>::builder(1)
        .idle_timeout(Duration::from_nanos(1))
        .build()
        .unwrap();
    {
        let mut handle = pool.get_auto_recycle(Duration::from_millis(100)).unwrap();
        handle.reset(1).unwrap();
    }
    thread::sleep(Duration::from_millis(5));
    let handle = pool.get_auto_recycle(Duration::from_millis(100)).unwrap();
    assert!(handle.empty());
}

#[test]
fn timeout_fires_when_pool_is_exhausted() {
    let pool = Pool::<u32>::builder(1).build().unwrap();
    let _held = pool.get_auto_recycle(Duration::from_millis(200)).unwrap();
    let result = pool.get_auto_recycle(Duration::from_millis(20));
    assert!(matches!(result, Err(Error::GetResourceTimeout)));
}

#[test]
fn disable_rejects_subsequent_gets_and_is_idempotent() {
    let pool = Pool::<u32>::builder(1).build().unwrap();
    pool.disable();
    pool.disable();
    let result = pool.get_auto_recycle(Duration::from_millis(10));
    assert!(matches!(result, Err(Error::Disabled)));
}

#[test]
fn waste_drops_the_payload_instead_of_recycling() {
    let pool = Pool::<u32>::builder(1).build().unwrap();
    {
        let mut handle = pool.get_auto_waste(Duration::from_millis(100)).unwrap();
        handle.reset(42).unwrap();
    }
    let stats = pool.stats();
    assert_eq!(stats.available, 0);
    assert_eq!(stats.wasted, 1);
}

#[test]
fn a_blocked_thread_is_woken_by_a_recycling_return() {
    let pool = Pool::<u32>::builder(1).build().unwrap();
    let handle = pool.get_auto_recycle(Duration::from_millis(200)).unwrap();
    let waiter_pool = pool.clone();
    let waiter = thread::spawn(move || waiter_pool.get_auto_recycle(Duration::from_secs(5)));
    thread::sleep(Duration::from_millis(30));
    drop(handle);
    assert!(waiter.join().unwrap().is_ok());
}

#[test]
fn invalidate_wastes_available_cells_and_flags_leased_ones() {
    let pool = Pool::<u32>::builder(2)
        .with_values(vec![1u32, 2u32])
        .build()
        .unwrap();
    let mut leased = pool.get_auto_recycle(Duration::from_millis(100)).unwrap();
    pool.invalidate();
    assert_eq!(pool.stats().wasted, 1);
    leased.recycle().unwrap();
    assert_eq!(pool.stats().wasted, 2);
    assert_eq!(pool.stats().available, 0);
}

#[test]
fn explicit_recycle_then_recycle_again_is_unusable() {
    let pool = Pool::<u32>::builder(1).build().unwrap();
    let mut handle = pool.get_auto_recycle(Duration::from_millis(100)).unwrap();
    handle.reset(5).unwrap();
    assert!(handle.recycle().is_ok());
    assert!(matches!(handle.recycle(), Err(Error::UnusableHandle)));
    assert!(matches!(handle.waste(), Err(Error::UnusableHandle)));
    assert!(matches!(handle.reset(9), Err(Error::UnusableHandle)));
}

#[test]
fn explicit_waste_then_drop_does_not_double_return() {
    let pool = Pool::<u32>::builder(1).build().unwrap();
    let mut handle = pool.get_auto_recycle(Duration::from_millis(100)).unwrap();
    handle.reset(5).unwrap();
    assert!(handle.waste().is_ok());
    drop(handle);
    let stats = pool.stats();
    assert_eq!(stats.wasted, 1);
    assert_eq!(stats.available, 0);
}

#[test]
fn capacity_conserved_across_many_threads() {
    let pool = Arc::new(Pool::<u32>::builder(4).build().unwrap());
    let mut threads = Vec::new();
    for _ in 0..16 {
        let pool = pool.clone();
        threads.push(thread::spawn(move || {
            if let Ok(mut h) = pool.get_auto_recycle(Duration::from_millis(500)) {
                h.reset(1).unwrap();
                thread::sleep(Duration::from_millis(5));
            }
        }));
    }
    for t in threads {
        t.join().unwrap();
    }
    assert_eq!(pool.stats().capacity(), 4);
}
