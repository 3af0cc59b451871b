use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Barrier,
    },
    thread,
};

use paste::paste;
use stripemap::sync::StripedHashMap;

const NUM_THREADS: u64 = 100;
const NUM_KEYS_PER_THREAD: u64 = 1_000;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn value(key: u64) -> String {
    format!("Value {}", key)
}

fn populate<S>(map: &StripedHashMap<u64, String, S>, num_keys: u64)
where
    S: std::hash::BuildHasher + Send + Sync + 'static,
{
    for key in 0..num_keys {
        map.insert(key, value(key));
    }
}

// Spawns `$num_threads` threads that start together. Each one gets a clone of
// the map, its thread id and the range of keys it owns.
macro_rules! run_threads {
    ($map:expr, $num_threads:expr, $keys_per_thread:expr, |$m:ident, $t:ident, $keys:ident| $body:block) => {{
        let barrier = Arc::new(Barrier::new($num_threads as usize));
        let threads: Vec<_> = (0..$num_threads)
            .map(|thread_id| {
                let $m = $map.clone();
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    let $t = thread_id;
                    let $keys = (thread_id * $keys_per_thread)..((thread_id + 1) * $keys_per_thread);
                    barrier.wait();
                    $body
                })
            })
            .collect();

        threads
            .into_iter()
            .for_each(|t| t.join().expect("Thread failed"));
    }};
}

macro_rules! generate_concurrency_tests {
    ($name:ident, $map_init:expr) => {
        paste! {
            #[test]
            fn [<test_ $name _insert_thread_safety>]() {
                init_logger();
                let map = $map_init;

                run_threads!(map, NUM_THREADS, NUM_KEYS_PER_THREAD, |m, _t, keys| {
                    for key in keys {
                        m.insert(key, value(key));
                    }
                });

                let num_keys = NUM_THREADS * NUM_KEYS_PER_THREAD;
                for key in 0..num_keys {
                    assert_eq!(map.get(&key), Some(value(key)), "Value mismatch for key: {}", key);
                }
                assert_eq!(map.len(), num_keys as usize);
                assert!(map.capacity().is_power_of_two());
            }

            #[test]
            fn [<test_ $name _get_thread_safety>]() {
                init_logger();
                let map = $map_init;
                populate(&map, NUM_THREADS * NUM_KEYS_PER_THREAD);

                run_threads!(map, NUM_THREADS, NUM_KEYS_PER_THREAD, |m, _t, keys| {
                    for key in keys {
                        assert_eq!(m.get(&key), Some(value(key)), "Value mismatch for key: {}", key);
                    }
                });
            }

            #[test]
            fn [<test_ $name _remove_thread_safety>]() {
                init_logger();
                let map = $map_init;
                populate(&map, NUM_THREADS * NUM_KEYS_PER_THREAD);

                run_threads!(map, NUM_THREADS, NUM_KEYS_PER_THREAD, |m, _t, keys| {
                    for key in keys {
                        assert_eq!(m.remove(&key), Some(value(key)));
                    }
                });

                for key in 0..(NUM_THREADS * NUM_KEYS_PER_THREAD) {
                    assert_eq!(map.get(&key), None, "Map should not contain key: {}", key);
                }
                assert!(map.is_empty());
            }

            #[test]
            fn [<test_ $name _clear_thread_safety>]() {
                init_logger();
                let map = $map_init;
                populate(&map, NUM_THREADS * NUM_KEYS_PER_THREAD);
                let capacity = map.capacity();

                run_threads!(map, NUM_THREADS, NUM_KEYS_PER_THREAD, |m, _t, _keys| {
                    m.clear();
                });

                assert_eq!(map.len(), 0, "Map should be empty.");
                assert!(map.keys().is_empty());
                assert_eq!(map.capacity(), capacity);
            }

            #[test]
            fn [<test_ $name _contains_key_thread_safety>]() {
                init_logger();
                let map = $map_init;
                populate(&map, NUM_THREADS * NUM_KEYS_PER_THREAD);

                run_threads!(map, NUM_THREADS, NUM_KEYS_PER_THREAD, |m, _t, keys| {
                    for key in keys {
                        assert!(m.contains_key(&key), "Key not found: {}", key);
                    }
                });
            }

            #[test]
            fn [<test_ $name _contains_value_thread_safety>]() {
                // Every call scans the whole map, so use fewer keys.
                const NUM_THREADS: u64 = 16;
                const NUM_KEYS_PER_THREAD: u64 = 64;

                init_logger();
                let map = $map_init;
                populate(&map, NUM_THREADS * NUM_KEYS_PER_THREAD);

                run_threads!(map, NUM_THREADS, NUM_KEYS_PER_THREAD, |m, t, keys| {
                    println!("Thread {} started.", t);
                    for key in keys {
                        assert!(m.contains_value(&value(key)), "Value not found: {}", value(key));
                    }
                    println!("Thread {} finished.", t);
                });
            }

            #[test]
            fn [<test_ $name _read_your_writes_across_resizes>]() {
                init_logger();
                let map = $map_init;

                run_threads!(map, 16u64, 2_000u64, |m, _t, keys| {
                    for key in keys.clone() {
                        assert_eq!(m.insert(key, value(key)), None);
                        assert_eq!(m.get(&key), Some(value(key)));
                    }
                    for key in keys.step_by(2) {
                        assert_eq!(m.remove(&key), Some(value(key)));
                        assert!(!m.contains_key(&key));
                    }
                });

                assert_eq!(map.len(), 16 * 1_000);
                assert_eq!(map.keys().len(), map.len());
            }

            #[test]
            fn [<test_ $name _len_matches_contents_after_mixed_writes>]() {
                init_logger();
                let map = $map_init;
                populate(&map, 5_000);

                let clearer = {
                    let map = map.clone();
                    thread::spawn(move || {
                        for _ in 0..10 {
                            map.clear();
                            thread::yield_now();
                        }
                    })
                };

                run_threads!(map, 8u64, 5_000u64, |m, t, keys| {
                    for key in keys {
                        m.insert(key, value(key));
                        if key % 3 == t % 3 {
                            m.remove(&key);
                        }
                    }
                });
                clearer.join().expect("Thread failed");

                // In a quiescent state the counter agrees with the buckets.
                let present = (0..(8 * 5_000u64))
                    .filter(|key| map.contains_key(key))
                    .count();
                assert_eq!(map.len(), present);
                assert_eq!(map.entries().len(), present);
            }

            #[test]
            fn [<test_ $name _scans_during_resizes>]() {
                init_logger();
                let map = $map_init;

                // These entries stay in the map for the whole test.
                let sentinels = 1_000_000..1_000_100;
                for key in sentinels.clone() {
                    map.insert(key, value(key));
                }

                let done = Arc::new(AtomicBool::new(false));
                let scanner = {
                    let map = map.clone();
                    let done = Arc::clone(&done);
                    let sentinels = sentinels.clone();
                    thread::spawn(move || {
                        let mut scans = 0;
                        while !done.load(Ordering::Acquire) || scans == 0 {
                            assert!(map.contains_value(&value(sentinels.start)));

                            let keys = map.keys();
                            let unique = keys.iter().collect::<HashSet<_>>();
                            assert_eq!(unique.len(), keys.len(), "Snapshot has duplicate keys");
                            for key in sentinels.clone() {
                                assert!(unique.contains(&Some(key)), "Snapshot misses key: {}", key);
                            }
                            scans += 1;
                        }
                        println!("Scanned {} times.", scans);
                    })
                };

                run_threads!(map, 8u64, 4_000u64, |m, _t, keys| {
                    for key in keys {
                        m.insert(key, value(key));
                    }
                });
                done.store(true, Ordering::Release);
                scanner.join().expect("Thread failed");

                assert_eq!(map.len(), 8 * 4_000 + 100);
            }
        }
    };
}

generate_concurrency_tests!(default, StripedHashMap::<u64, String>::new());
generate_concurrency_tests!(
    ahash,
    StripedHashMap::<u64, String, _>::with_hasher(ahash::RandomState::default())
);
generate_concurrency_tests!(
    tiny,
    StripedHashMap::<u64, String>::builder()
        .name("tiny")
        .initial_capacity(1)
        .load_factor(0.25)
        .build()
);

// Grows a map to two million entries.
#[cfg(not(skip_large_mem_tests))]
#[test]
fn test_large_map_keeps_every_entry() {
    init_logger();
    let map = StripedHashMap::<u64, u64>::new();

    run_threads!(map, 8u64, 250_000u64, |m, _t, keys| {
        for key in keys {
            m.insert(key, key * 2);
        }
    });

    assert_eq!(map.len(), 2_000_000);
    assert!(map.capacity() >= 1 << 16);
    assert!((0..2_000_000).all(|key| map.get(&key) == Some(key * 2)));
}

#[test]
fn test_clear_with_concurrent_readers_and_unkeyed_writers() {
    init_logger();
    let map = StripedHashMap::<u64, String>::new();
    populate(&map, 10_000);

    let done = Arc::new(AtomicBool::new(false));
    let readers = (0..4u64)
        .map(|t| {
            let map = map.clone();
            let done = Arc::clone(&done);
            thread::spawn(move || {
                while !done.load(Ordering::Acquire) {
                    for key in (t..10_000).step_by(4) {
                        // Either the entry is gone or it still has its value.
                        if let Some(v) = map.get(&key) {
                            assert_eq!(v, value(key));
                        }
                    }
                }
            })
        })
        .collect::<Vec<_>>();

    let unkeyed_writer = {
        let map = map.clone();
        thread::spawn(move || {
            for i in 0..10_000 {
                if i % 2 == 0 {
                    map.insert_unkeyed(value(i));
                } else {
                    map.remove_unkeyed();
                }
            }
        })
    };

    for _ in 0..20 {
        map.clear();
    }
    unkeyed_writer.join().expect("Thread failed");
    done.store(true, Ordering::Release);
    readers
        .into_iter()
        .for_each(|t| t.join().expect("Thread failed"));

    // The last unkeyed operation was a remove, and every keyed entry was
    // cleared.
    assert!(!map.contains_unkeyed());
    assert!((0..10_000u64).all(|key| !map.contains_key(&key)));
    assert_eq!(map.len(), 0);
}
