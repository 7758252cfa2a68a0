pub mod key;
pub mod meta;
pub mod store;

pub use key::CacheKey;
pub use meta::{CacheEntry, CacheMeta};
pub use store::CacheStore;
