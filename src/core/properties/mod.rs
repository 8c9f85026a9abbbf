pub mod property_store;

pub use property_store::{load_timestamp, save_timestamp, PropertyError, PropertyStore};
