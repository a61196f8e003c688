pub mod gallery;
pub mod local_store;
#[cfg(test)]
pub mod memory_store;
pub mod metadata;
pub mod naming;
pub mod object_store;
pub mod retry;
pub mod s3_store;
pub mod thumbnail;
pub mod thumbnail_cache;
