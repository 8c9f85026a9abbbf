pub mod sqlite_store;

#[cfg(test)]
mod in_memory;

#[cfg(test)]
pub use in_memory::InMemoryPropertyStore;
pub use sqlite_store::SqlitePropertyStore;
