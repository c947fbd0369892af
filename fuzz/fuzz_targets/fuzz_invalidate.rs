#![no_main]

use libfuzzer_sys::fuzz_target;
use quiesce_cache::{CacheKey, ResponseCache};

fuzz_target!(|ops: Vec<(Vec<String>, bool, bool)>| {
    let mut cache: ResponseCache<u32> = ResponseCache::new();
    for (i, (segments, invalidate, exact)) in ops.into_iter().enumerate() {
        let key = CacheKey::new(segments);
        if invalidate {
            let first = cache.invalidate(&key, exact);
            // Idempotence: the second sweep must mark nothing new.
            assert_eq!(cache.invalidate(&key, exact), 0);
            let _ = first;
        } else {
            cache.insert(key.clone(), i as u32);
            assert_eq!(cache.is_stale(&key), Some(false));
        }
        assert_eq!(cache.fresh_len() + cache.stale_len(), cache.len());
    }
});
