pub mod summary_models;
pub mod summary_service;

pub use summary_models::{extract_summary, summary_prompt, CallSummary, DocBlock, SummaryDocument};
pub use summary_service::{
    reset_watermark, CallSummaryService, FileOutcome, RunReport, SummaryError, Summarizer,
};
