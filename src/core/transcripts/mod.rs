pub mod transcript_builder;
pub mod transcript_models;

pub use transcript_builder::{build_transcript, is_too_short};
pub use transcript_models::{CallFile, CallRecord, CallTime};
