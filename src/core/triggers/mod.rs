pub mod trigger_models;
pub mod trigger_service;

pub use trigger_models::{next_fire, Job, TriggerConfig};
pub use trigger_service::{JobRunner, TriggerError, TriggerService, TriggerStore};
