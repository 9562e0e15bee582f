mod kv;
mod transfer;

#[cfg(test)]
pub use kv::MemoryKvStore;
pub use kv::{FileKvStore, KeyValueStore, StorageError, keys};
pub use transfer::{read_import, write_export};
