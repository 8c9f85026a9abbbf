pub mod docs_requests;
pub mod drive_client;
pub mod google_api;
pub mod service_account;
pub mod sheets_client;

pub use drive_client::GoogleDriveStore;
pub use google_api::GoogleApi;
pub use service_account::ServiceAccountAuth;
pub use sheets_client::GoogleWorkbook;
