// Composition root for the command line: builds each service from the
// configuration on demand, so a command only needs the settings it uses.

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::OnceCell;

use crate::config::AppConfig;
use crate::core::csv_sync::CsvSyncService;
use crate::core::folders::FolderService;
use crate::core::snapshots::SnapshotService;
use crate::core::summaries::CallSummaryService;
use crate::core::triggers::TriggerService;
use crate::infra::ai::GeminiClient;
use crate::infra::csv_fetch::HttpCsvFetcher;
use crate::infra::google::{GoogleApi, GoogleDriveStore, GoogleWorkbook, ServiceAccountAuth};
use crate::infra::properties::SqlitePropertyStore;
use crate::infra::triggers::TriggerFileStore;

pub type CallSummaries = CallSummaryService<GoogleDriveStore, GeminiClient, SqlitePropertyStore>;
pub type Folders = FolderService<GoogleDriveStore>;
pub type Snapshots = SnapshotService<GoogleWorkbook>;
pub type CsvSync = CsvSyncService<HttpCsvFetcher, GoogleWorkbook>;
pub type Triggers = TriggerService<TriggerFileStore>;

pub struct AppContext {
    pub config: AppConfig,
    auth: OnceCell<Arc<ServiceAccountAuth>>,
}

impl AppContext {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            auth: OnceCell::new(),
        }
    }

    /// Service account credentials, loaded once per process.
    async fn auth(&self) -> anyhow::Result<Arc<ServiceAccountAuth>> {
        let auth = self
            .auth
            .get_or_try_init(|| async {
                let auth = ServiceAccountAuth::load(
                    self.config.service_account_key_path.as_deref(),
                    self.config.service_account_json.as_deref(),
                )
                .await?;
                tracing::info!(account = %auth.client_email(), "Loaded service account");
                Ok::<_, anyhow::Error>(Arc::new(auth))
            })
            .await?;
        Ok(Arc::clone(auth))
    }

    async fn google_api(&self) -> anyhow::Result<GoogleApi> {
        Ok(GoogleApi::new(self.auth().await?))
    }

    pub async fn folders(&self) -> anyhow::Result<Folders> {
        let root = self.config.require_summary_root_folder_id()?;
        let drive = GoogleDriveStore::new(self.google_api().await?);
        Ok(FolderService::new(drive, root))
    }

    pub async fn call_summaries(&self) -> anyhow::Result<CallSummaries> {
        let source = self.config.require_call_source_folder_id()?;
        let api_key = self.config.require_gemini_api_key()?;
        let folders = self.folders().await?;
        let properties = self.properties().await?;

        Ok(CallSummaryService::new(
            folders,
            GeminiClient::new(api_key, self.config.gemini_model.clone()),
            properties,
            source,
            self.config.time_zone,
        ))
    }

    pub async fn properties(&self) -> anyhow::Result<SqlitePropertyStore> {
        let url = self.config.properties_db_url();
        SqlitePropertyStore::new(&url)
            .await
            .with_context(|| format!("Failed to open property store at {url}"))
    }

    async fn workbook(&self) -> anyhow::Result<GoogleWorkbook> {
        let spreadsheet_id = self.config.require_spreadsheet_id()?;
        Ok(GoogleWorkbook::new(self.google_api().await?, spreadsheet_id))
    }

    pub async fn snapshots(&self) -> anyhow::Result<Snapshots> {
        Ok(SnapshotService::new(
            self.workbook().await?,
            self.config.time_zone,
        ))
    }

    pub async fn csv_sync(&self) -> anyhow::Result<CsvSync> {
        let sources = self.config.require_csv_sources()?.to_vec();
        let workbook = self.workbook().await?;
        let fetcher = HttpCsvFetcher::new(Some(self.auth().await?));
        Ok(CsvSyncService::new(fetcher, workbook, sources))
    }

    pub async fn triggers(&self) -> anyhow::Result<Triggers> {
        let path = self.config.triggers_path();
        TriggerService::new(TriggerFileStore::new(&path))
            .await
            .with_context(|| {
                format!(
                    "Trigger registry {} could not be read; fix or remove it",
                    path.display()
                )
            })
    }
}
