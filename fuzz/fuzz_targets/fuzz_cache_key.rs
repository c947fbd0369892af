#![no_main]

use libfuzzer_sys::fuzz_target;
use quiesce_cache::CacheKey;

fuzz_target!(|segments: Vec<Option<String>>| {
    let key = CacheKey::from_optional(segments.clone());
    let present = segments.iter().flatten().count();
    assert_eq!(key.len(), present);
    assert!(key.starts_with(&CacheKey::root()));
    assert!(key.starts_with(&key.clone()));
    let _ = key.to_string();
});
