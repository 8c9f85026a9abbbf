// Incremental call summarization.
//
// Each run lists the plain-text call exports in the source folder, keeps the
// ones modified after the stored watermark, and turns each into a summary
// document inside the customer's folder. Per-file failures are logged and
// skipped; the watermark only moves past files that were fully handled.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use thiserror::Error;

use super::summary_models::{CallSummary, SummaryDocument};
use crate::core::drive::{DriveError, DriveFile, DriveStore};
use crate::core::folders::{FolderError, FolderService};
use crate::core::properties::{load_timestamp, save_timestamp, PropertyError, PropertyStore};
use crate::core::transcripts::{
    build_transcript, is_too_short, CallFile, CallRecord, CallTime,
};

/// Property key holding the newest handled file's modification time.
pub const LAST_PROCESSED_TIMESTAMP: &str = "LAST_PROCESSED_TIMESTAMP";

/// Transcripts with fewer space-separated words than this are not summarized.
const MIN_TRANSCRIPT_WORDS: usize = 10;

#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("Summarization API error: {0}")]
    Api(String),
    #[error("Unusable summarization response: {0}")]
    InvalidResponse(String),
}

/// Anything that can turn a transcript into a structured summary.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, transcript: &str) -> Result<CallSummary, SummaryError>;
}

/// Why a single call file could not be handled. These never abort a run.
#[derive(Debug, Error)]
pub enum CallFileError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("Missing call data or title")]
    MissingData,
    #[error("Missing transcript")]
    MissingTranscript,
    #[error("Failed to generate summary: {0}")]
    Summary(#[from] SummaryError),
    #[error(transparent)]
    Folder(#[from] FolderError),
    #[error(transparent)]
    Drive(#[from] DriveError),
}

/// Errors that stop the whole run.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error(transparent)]
    Properties(#[from] PropertyError),
    #[error("Could not list source folder: {0}")]
    Listing(#[from] DriveError),
}

/// What happened to a file that counts as handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Created {
        document_id: String,
        title: String,
        customer: String,
    },
    /// The transcript was too short to be worth a summary.
    TooShort,
    /// A document with the same title is already in the customer folder.
    Duplicate { title: String },
}

/// Summary of one polling run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub evaluated: usize,
    pub handled: Vec<(String, FileOutcome)>,
    pub failed: Vec<(String, String)>,
    /// Set when the watermark was moved.
    pub new_watermark: Option<DateTime<Utc>>,
}

impl RunReport {
    pub fn created(&self) -> usize {
        self.handled
            .iter()
            .filter(|(_, outcome)| matches!(outcome, FileOutcome::Created { .. }))
            .count()
    }
}

/// Forget the watermark so the next run re-evaluates every file. Returns
/// whether one was stored.
pub async fn reset_watermark<P: PropertyStore + ?Sized>(
    properties: &P,
) -> Result<bool, PropertyError> {
    let existed = properties.delete(LAST_PROCESSED_TIMESTAMP).await?;
    tracing::info!(existed, "Last processed timestamp reset");
    Ok(existed)
}

pub struct CallSummaryService<D: DriveStore, A: Summarizer, P: PropertyStore> {
    folders: FolderService<D>,
    summarizer: A,
    properties: P,
    source_folder_id: String,
    time_zone: Tz,
}

impl<D, A, P> CallSummaryService<D, A, P>
where
    D: DriveStore,
    A: Summarizer,
    P: PropertyStore,
{
    pub fn new(
        folders: FolderService<D>,
        summarizer: A,
        properties: P,
        source_folder_id: impl Into<String>,
        time_zone: Tz,
    ) -> Self {
        Self {
            folders,
            summarizer,
            properties,
            source_folder_id: source_folder_id.into(),
            time_zone,
        }
    }

    pub async fn reset_watermark(&self) -> Result<bool, PropertyError> {
        reset_watermark(&self.properties).await
    }

    pub async fn process_new_call_files(&self) -> Result<RunReport, ProcessError> {
        let watermark = load_timestamp(&self.properties, LAST_PROCESSED_TIMESTAMP).await?;
        let mut candidates: Vec<DriveFile> = self
            .folders
            .drive()
            .list_text_files(&self.source_folder_id)
            .await?
            .into_iter()
            .filter(|file| file.modified_time > watermark)
            .collect();

        let mut report = RunReport {
            evaluated: candidates.len(),
            ..Default::default()
        };

        if candidates.is_empty() {
            tracing::info!("No new call files to process");
            return Ok(report);
        }
        tracing::info!(count = candidates.len(), %watermark, "Found new call files to evaluate");

        // Oldest first, so the watermark can stop right before the first failure.
        candidates.sort_by_key(|file| file.modified_time);

        let mut handled_times = Vec::new();
        let mut first_failure: Option<DateTime<Utc>> = None;

        for file in &candidates {
            match self.process_file(file).await {
                Ok(outcome) => {
                    tracing::info!(file = %file.name, ?outcome, "Call file handled");
                    handled_times.push(file.modified_time);
                    report.handled.push((file.name.clone(), outcome));
                }
                Err(err) => {
                    tracing::warn!(file = %file.name, "Error processing call file: {err}");
                    first_failure.get_or_insert(file.modified_time);
                    report.failed.push((file.name.clone(), err.to_string()));
                }
            }
        }

        // Stay strictly below the first failure so files sharing its
        // timestamp are retried.
        let advance_to = handled_times
            .into_iter()
            .filter(|ts| first_failure.map_or(true, |failed| *ts < failed))
            .max();

        if let Some(ts) = advance_to {
            save_timestamp(&self.properties, LAST_PROCESSED_TIMESTAMP, ts).await?;
            tracing::info!(watermark = %ts, "Last processed timestamp updated");
            report.new_watermark = Some(ts);
        } else {
            tracing::info!("Finished processing; watermark unchanged");
        }

        Ok(report)
    }

    async fn process_file(&self, file: &DriveFile) -> Result<FileOutcome, CallFileError> {
        let content = self.folders.drive().read_text(&file.id).await?;
        let parsed: CallFile = serde_json::from_str(&content)?;
        let call = parsed
            .call
            .filter(|call| call.title().is_some())
            .ok_or(CallFileError::MissingData)?;

        self.create_summary_document(&call).await
    }

    /// Summarize one call into a document in its customer folder.
    pub async fn create_summary_document(
        &self,
        call: &CallRecord,
    ) -> Result<FileOutcome, CallFileError> {
        let turns = call
            .transcript
            .as_deref()
            .ok_or(CallFileError::MissingTranscript)?;

        let transcript = build_transcript(turns, &call.users, &call.external_participants);
        if is_too_short(&transcript, MIN_TRANSCRIPT_WORDS) {
            tracing::info!(title = ?call.title(), "Skipping short or empty transcript");
            return Ok(FileOutcome::TooShort);
        }

        let customer = call.customer_name();
        let folder = self.folders.get_or_create_folder(customer).await?;

        let title = document_title(call, self.time_zone);
        if self.folders.drive().file_exists(&folder.id, &title).await? {
            tracing::info!(%title, "Skipping duplicate document");
            return Ok(FileOutcome::Duplicate { title });
        }

        let summary = self.summarizer.summarize(&transcript).await?;
        let document = SummaryDocument::new(title.clone(), &summary, &transcript);
        let document_id = self
            .folders
            .drive()
            .create_document(&folder.id, &document)
            .await?;

        tracing::info!(%title, folder = %folder.name, "Created summary document");
        Ok(FileOutcome::Created {
            document_id,
            title,
            customer: customer.to_string(),
        })
    }
}

/// `"{title} - {M/D/YYYY}"`, dated in the team's time zone.
pub fn document_title(call: &CallRecord, time_zone: Tz) -> String {
    let title = call.title().unwrap_or("Call Summary");
    let date = call
        .time
        .as_ref()
        .and_then(CallTime::to_utc)
        .map(|ts| {
            ts.with_timezone(&time_zone)
                .format("%-m/%-d/%Y")
                .to_string()
        })
        .unwrap_or_else(|| "Unknown Date".to_string());

    format!("{title} - {date}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::summaries::DocBlock;
    use crate::infra::drive::InMemoryDrive;
    use crate::infra::properties::InMemoryPropertyStore;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const LONG_TEXT: &str = "we reviewed the renewal terms and agreed to send a revised quote";

    struct FakeSummarizer {
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    #[async_trait]
    impl Summarizer for FakeSummarizer {
        async fn summarize(&self, _transcript: &str) -> Result<CallSummary, SummaryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(SummaryError::Api("500 Internal Server Error".into()));
            }
            Ok(CallSummary {
                discussion_topics: vec!["Renewal".into()],
                key_takeaways: vec!["Likely to renew".into()],
                action_items: vec!["Send quote".into()],
            })
        }
    }

    fn call_json(title: &str, account: &str, time: &str, text: &str) -> String {
        serde_json::json!({
            "call": {
                "title": title,
                "account_name": account,
                "time": time,
                "transcript": [{"personId": 1, "text": text}],
                "users": [{"personId": 1, "userEmail": "sam@example.com"}],
                "externalParticipants": []
            }
        })
        .to_string()
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 4, hour, 0, 0).unwrap()
    }

    struct Harness {
        service: CallSummaryService<InMemoryDrive, FakeSummarizer, InMemoryPropertyStore>,
        source: String,
        root: String,
        calls: Arc<AtomicUsize>,
    }

    fn harness(fail: bool) -> Harness {
        let drive = InMemoryDrive::new();
        let source = drive.add_folder("root", "Call Exports");
        let root = drive.add_folder("root", "Call Summaries");
        let calls = Arc::new(AtomicUsize::new(0));
        let summarizer = FakeSummarizer {
            calls: Arc::clone(&calls),
            fail,
        };
        let service = CallSummaryService::new(
            FolderService::new(drive, root.clone()),
            summarizer,
            InMemoryPropertyStore::default(),
            source.clone(),
            chrono_tz::America::Vancouver,
        );
        Harness {
            service,
            source,
            root,
            calls,
        }
    }

    impl Harness {
        fn drive(&self) -> &InMemoryDrive {
            self.service.folders.drive()
        }

        async fn watermark(&self) -> DateTime<Utc> {
            load_timestamp(&self.service.properties, LAST_PROCESSED_TIMESTAMP)
                .await
                .unwrap()
        }
    }

    #[tokio::test]
    async fn creates_document_in_customer_folder_and_advances_watermark() {
        let h = harness(false);
        h.drive().add_text_file(
            &h.source,
            "call-1.txt",
            &call_json("Quarterly review", "Audette", "2025-03-04T17:30:00Z", LONG_TEXT),
            at(9),
        );

        let report = h.service.process_new_call_files().await.unwrap();

        assert_eq!(report.created(), 1);
        assert_eq!(report.new_watermark, Some(at(9)));
        assert_eq!(h.watermark().await, at(9));

        let folder = h.drive().find_folder(&h.root, "Audette").await.unwrap().unwrap();
        let docs = h.drive().documents_in(&folder.id);
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].title, "Quarterly review - 3/4/2025");
        assert_eq!(docs[0].blocks[0], DocBlock::Heading("Key Discussion Topics".into()));
        assert!(docs[0]
            .blocks
            .contains(&DocBlock::Paragraph(format!("sam:\n{LONG_TEXT}"))));
    }

    #[tokio::test]
    async fn files_at_or_before_watermark_are_ignored() {
        let h = harness(false);
        save_timestamp(&h.service.properties, LAST_PROCESSED_TIMESTAMP, at(9))
            .await
            .unwrap();
        h.drive().add_text_file(
            &h.source,
            "old.txt",
            &call_json("Old", "Contoso", "2025-03-01T17:00:00Z", LONG_TEXT),
            at(9),
        );

        let report = h.service.process_new_call_files().await.unwrap();

        assert_eq!(report.evaluated, 0);
        assert_eq!(h.calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.watermark().await, at(9));
    }

    #[tokio::test]
    async fn failed_summary_keeps_watermark_before_the_failure() {
        let h = harness(true);
        h.drive().add_text_file(
            &h.source,
            "short.txt",
            &call_json("Hello", "Contoso", "2025-03-04T16:00:00Z", "hi"),
            at(8),
        );
        h.drive().add_text_file(
            &h.source,
            "long.txt",
            &call_json("Review", "Contoso", "2025-03-04T17:00:00Z", LONG_TEXT),
            at(10),
        );
        h.drive().add_text_file(
            &h.source,
            "later-short.txt",
            &call_json("Bye", "Contoso", "2025-03-04T18:00:00Z", "bye"),
            at(11),
        );

        let report = h.service.process_new_call_files().await.unwrap();

        assert_eq!(report.handled.len(), 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "long.txt");
        // Only the short call before the failure moves the watermark.
        assert_eq!(h.watermark().await, at(8));
    }

    #[tokio::test]
    async fn failure_sharing_a_timestamp_with_a_handled_file_is_retried() {
        let h = harness(true);
        h.drive().add_text_file(
            &h.source,
            "a.txt",
            &call_json("Hello", "Contoso", "2025-03-04T16:00:00Z", "hi"),
            at(9),
        );
        h.drive().add_text_file(
            &h.source,
            "b.txt",
            &call_json("Review", "Contoso", "2025-03-04T17:00:00Z", LONG_TEXT),
            at(9),
        );

        let first = h.service.process_new_call_files().await.unwrap();

        assert_eq!(first.handled.len(), 1);
        assert_eq!(first.failed[0].0, "b.txt");
        assert_eq!(first.new_watermark, None);
        assert_eq!(h.watermark().await, DateTime::<Utc>::UNIX_EPOCH);

        let second = h.service.process_new_call_files().await.unwrap();
        assert_eq!(second.evaluated, 2);
        assert_eq!(second.failed[0].0, "b.txt");
    }

    #[tokio::test]
    async fn duplicate_titles_are_skipped_without_calling_the_api() {
        let h = harness(false);
        let folder = h.drive().add_folder(&h.root, "Audette");
        h.drive().add_file(&folder, "Quarterly review - 3/4/2025");
        h.drive().add_text_file(
            &h.source,
            "call-1.txt",
            &call_json("Quarterly review", "Audette", "2025-03-04T17:30:00Z", LONG_TEXT),
            at(9),
        );

        let report = h.service.process_new_call_files().await.unwrap();

        assert_eq!(
            report.handled[0].1,
            FileOutcome::Duplicate {
                title: "Quarterly review - 3/4/2025".into()
            }
        );
        assert_eq!(h.calls.load(Ordering::SeqCst), 0);
        assert_eq!(h.watermark().await, at(9));
    }

    #[tokio::test]
    async fn malformed_and_untitled_files_are_failures() {
        let h = harness(false);
        h.drive()
            .add_text_file(&h.source, "broken.txt", "{ not json", at(9));
        h.drive()
            .add_text_file(&h.source, "untitled.txt", r#"{"call": {"title": ""}}"#, at(10));
        h.drive()
            .add_text_file(&h.source, "no-transcript.txt", r#"{"call": {"title": "X"}}"#, at(11));

        let report = h.service.process_new_call_files().await.unwrap();

        assert!(report.handled.is_empty());
        assert_eq!(report.failed.len(), 3);
        assert!(report.failed[0].1.starts_with("Invalid JSON"));
        assert_eq!(report.failed[1].1, "Missing call data or title");
        assert_eq!(report.failed[2].1, "Missing transcript");
        assert_eq!(report.new_watermark, None);
        assert_eq!(h.watermark().await, DateTime::<Utc>::UNIX_EPOCH);
    }

    #[tokio::test]
    async fn reset_watermark_reprocesses_everything() {
        let h = harness(false);
        save_timestamp(&h.service.properties, LAST_PROCESSED_TIMESTAMP, at(12))
            .await
            .unwrap();

        assert!(h.service.reset_watermark().await.unwrap());
        assert_eq!(h.watermark().await, DateTime::<Utc>::UNIX_EPOCH);
        assert!(!h.service.reset_watermark().await.unwrap());
    }

    #[test]
    fn document_title_uses_local_date() {
        let call = CallRecord {
            title: Some("Kickoff".into()),
            time: Some(CallTime::Text("2025-03-04T03:00:00Z".into())),
            ..Default::default()
        };
        assert_eq!(
            document_title(&call, chrono_tz::America::Vancouver),
            "Kickoff - 3/3/2025"
        );

        let epoch = CallRecord {
            title: Some("Kickoff".into()),
            time: Some(CallTime::EpochMillis(1_741_057_200_000.0)),
            ..Default::default()
        };
        assert_eq!(
            document_title(&epoch, chrono_tz::America::Vancouver),
            "Kickoff - 3/3/2025"
        );

        let undated = CallRecord {
            title: Some("Kickoff".into()),
            time: Some(CallTime::Text("soon".into())),
            ..Default::default()
        };
        assert_eq!(
            document_title(&undated, chrono_tz::UTC),
            "Kickoff - Unknown Date"
        );
    }
}
