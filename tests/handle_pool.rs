extern crate glcanvas;
extern crate rand;

use glcanvas::utils::prelude::*;
use rand::Rng;

#[test]
fn handle_pool() {
    let mut pool: HandlePool<Handle> = HandlePool::new();
    assert_eq!(pool.len(), 0);
    assert!(pool.is_empty());

    let e1 = pool.create();
    assert!(e1.is_valid());
    assert!(pool.contains(e1));
    assert_eq!(pool.len(), 1);

    let e2 = pool.create();
    assert_eq!(e2.index(), 1);
    assert_eq!(pool.len(), 2);

    assert!(pool.free(e1));
    assert!(!pool.contains(e1));
    assert!(!pool.free(e1));
    assert_eq!(pool.len(), 1);

    // The freed index is recycled with a newer version.
    let e3 = pool.create();
    assert_eq!(e3.index(), e1.index());
    assert!(e3.version() > e1.version());
    assert!(pool.contains(e3));
    assert!(!pool.contains(e1));

    assert!(!pool.contains(Handle::nil()));
    assert!(!pool.contains(Handle::new(7, 1)));
}

#[test]
fn reuse_smallest_index() {
    let mut pool: HandlePool<Handle> = HandlePool::new();
    let handles: Vec<_> = (0..8).map(|_| pool.create()).collect();

    pool.free(handles[5]);
    pool.free(handles[2]);
    pool.free(handles[6]);

    assert_eq!(pool.create().index(), 2);
    assert_eq!(pool.create().index(), 5);
    assert_eq!(pool.create().index(), 6);
    assert_eq!(pool.create().index(), 8);
}

#[test]
fn random_free() {
    let mut rng = rand::thread_rng();
    let mut pool: HandlePool<Handle> = HandlePool::new();
    let mut alive = Vec::new();

    for _ in 0..1000 {
        if alive.is_empty() || rng.gen_range(0, 3) > 0 {
            alive.push(pool.create());
        } else {
            let i = rng.gen_range(0, alive.len());
            let handle = alive.swap_remove(i);
            assert!(pool.free(handle));
            assert!(!pool.contains(handle));
        }

        assert_eq!(pool.len(), alive.len());
    }

    for handle in &alive {
        assert!(pool.contains(*handle));
    }
}
