//! The upload dialog as a state machine.
//!
//! ```text
//! Idle --open--> DialogOpen --submit--> Submitting --ok--> Idle (form reset)
//!                    ^                      |
//!                    +-------- error -------+ (fields kept)
//! ```
//!
//! [`UploadForm::submit`] borrows the form mutably for the whole submission, so a second submit
//! cannot start before the first resolves. Submitting is two phases: the bytes are uploaded, then
//! the file record is created. If the second phase fails, the uploaded object is deleted again.

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{info, instrument, warn};
use url::Url;

use super::{ClientError, Result};
use crate::types::{OrgId, StorageId};

pub const TITLE_REQUIRED: &str = "the title must be at least 1 character long";
pub const FILE_REQUIRED: &str = "a file is required";
pub const SINGLE_FILE_REQUIRED: &str = "exactly one file must be attached";

/// The operations a submission needs
#[async_trait]
pub trait UploadBackend: Send + Sync {
    async fn generate_upload_url(&self) -> Result<Url>;

    async fn upload(&self, upload_url: &Url, file: &SelectedFile) -> Result<StorageId>;

    async fn create_file(&self, name: &str, file_id: StorageId, org_id: &str) -> Result<()>;

    async fn delete_storage_object(&self, storage_id: StorageId) -> Result<()>;
}

/// A file picked by the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    /// Declared content type, sent with the upload
    pub content_type: String,
    pub content: Bytes,
}

/// The organization new files are shared with
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActiveOrganization {
    /// The organization selected in the caller's context
    Selected(OrgId),
    /// No organization is selected: the user's own id
    Personal(String),
}

impl ActiveOrganization {
    /// The selected organization, else the user's personal one. `None` until either is known.
    pub fn resolve(selected_org: Option<&str>, user_id: Option<&str>) -> Option<Self> {
        match (selected_org.filter(|s| !s.is_empty()), user_id.filter(|s| !s.is_empty())) {
            (Some(org_id), _) => Some(ActiveOrganization::Selected(org_id.to_string())),
            (None, Some(user_id)) => Some(ActiveOrganization::Personal(user_id.to_string())),
            (None, None) => None,
        }
    }

    pub fn org_id(&self) -> &str {
        match self {
            ActiveOrganization::Selected(org_id) => org_id,
            ActiveOrganization::Personal(user_id) => user_id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormState {
    Idle,
    DialogOpen,
    Submitting,
}

/// Per-field validation messages
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    pub title: Option<&'static str>,
    pub file: Option<&'static str>,
}

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.file.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
}

/// A toast shown after a submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: &'static str,
    pub description: &'static str,
}

impl Notification {
    pub const UPLOADED: Notification = Notification {
        kind: NotificationKind::Success,
        title: "File uploaded",
        description: "Everyone can now see your file",
    };

    pub const FAILED: Notification = Notification {
        kind: NotificationKind::Error,
        title: "Upload failed",
        description: "Your file could not be uploaded, please try again",
    };
}

#[derive(Debug)]
pub enum SubmitOutcome {
    /// The dialog is not open; nothing happened
    Ignored,
    /// No active organization is known yet; nothing happened
    NotReady,
    /// Validation failed; the dialog stays open with these errors
    Invalid(FieldErrors),
    /// The file record exists; the dialog is closed and the form reset
    Uploaded { file_id: StorageId, notification: Notification },
    /// The dialog stays open with its fields intact
    Failed { error: ClientError, notification: Notification },
}

#[derive(Debug)]
pub struct UploadForm {
    state: FormState,
    title: String,
    files: Vec<SelectedFile>,
    errors: FieldErrors,
    /// Set when the last submission failed, until the fields change or the dialog closes
    failure: Option<Notification>,
}

impl Default for UploadForm {
    fn default() -> Self {
        Self::new()
    }
}

impl UploadForm {
    pub fn new() -> Self {
        Self {
            state: FormState::Idle,
            title: String::new(),
            files: Vec::new(),
            errors: FieldErrors::default(),
            failure: None,
        }
    }

    pub fn state(&self) -> FormState {
        self.state
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn files(&self) -> &[SelectedFile] {
        &self.files
    }

    pub fn field_errors(&self) -> &FieldErrors {
        &self.errors
    }

    /// The failure shown in the open dialog, if the last submission failed
    pub fn failure(&self) -> Option<&Notification> {
        self.failure.as_ref()
    }

    pub fn open(&mut self) {
        if self.state == FormState::Idle {
            self.state = FormState::DialogOpen;
        }
    }

    /// Close the dialog and discard its fields
    pub fn close(&mut self) {
        if self.state == FormState::DialogOpen {
            self.reset();
        }
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
        self.errors.title = None;
        self.failure = None;
    }

    pub fn attach_file(&mut self, file: SelectedFile) {
        self.files.push(file);
        self.errors.file = None;
        self.failure = None;
    }

    pub fn is_submit_enabled(&self) -> bool {
        self.state == FormState::DialogOpen
    }

    fn reset(&mut self) {
        *self = Self::new();
    }

    fn validate(&self) -> FieldErrors {
        FieldErrors {
            title: self.title.chars().next().is_none().then_some(TITLE_REQUIRED),
            file: match self.files.len() {
                0 => Some(FILE_REQUIRED),
                1 => None,
                _ => Some(SINGLE_FILE_REQUIRED),
            },
        }
    }

    /// Validate, upload and register the file under `org`.
    #[instrument(skip_all, fields(org_id = org.map(ActiveOrganization::org_id)))]
    pub async fn submit(&mut self, backend: &dyn UploadBackend, org: Option<&ActiveOrganization>) -> SubmitOutcome {
        if self.state != FormState::DialogOpen {
            return SubmitOutcome::Ignored;
        }
        let Some(org) = org else {
            return SubmitOutcome::NotReady;
        };

        let errors = self.validate();
        if !errors.is_empty() {
            self.errors = errors.clone();
            return SubmitOutcome::Invalid(errors);
        }
        let [file] = self.files.as_slice() else {
            return SubmitOutcome::Invalid(self.validate());
        };

        self.state = FormState::Submitting;
        self.failure = None;
        let result = upload_and_register(backend, &self.title, file, org.org_id()).await;

        match result {
            Ok(file_id) => {
                info!(%file_id, "File uploaded");
                self.reset();
                SubmitOutcome::Uploaded {
                    file_id,
                    notification: Notification::UPLOADED,
                }
            }
            Err(error) => {
                warn!("Upload failed: {error}");
                self.state = FormState::DialogOpen;
                self.failure = Some(Notification::FAILED);
                SubmitOutcome::Failed {
                    error,
                    notification: Notification::FAILED,
                }
            }
        }
    }
}

/// Upload the bytes, then create the record. A failed creation deletes the upload again.
async fn upload_and_register(backend: &dyn UploadBackend, title: &str, file: &SelectedFile, org_id: &str) -> Result<StorageId> {
    let upload_url = backend.generate_upload_url().await?;
    let storage_id = backend.upload(&upload_url, file).await?;

    if let Err(e) = backend.create_file(title, storage_id, org_id).await {
        if let Err(cleanup) = backend.delete_storage_object(storage_id).await {
            warn!(%storage_id, "Could not delete orphaned upload: {cleanup}");
        }
        return Err(e);
    }

    Ok(storage_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use reqwest::StatusCode;
    use uuid::Uuid;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Call {
        GenerateUploadUrl,
        Upload { content_type: String },
        CreateFile { name: String, file_id: StorageId, org_id: String },
        Delete(StorageId),
    }

    struct FakeBackend {
        storage_id: StorageId,
        reject_create: bool,
        reject_upload_url: bool,
        calls: Mutex<Vec<Call>>,
    }

    impl FakeBackend {
        fn new() -> Self {
            Self {
                storage_id: Uuid::new_v4(),
                reject_create: false,
                reject_upload_url: false,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().clone()
        }
    }

    fn rejected(status: StatusCode, message: &str) -> ClientError {
        ClientError::Rejected {
            status,
            message: message.to_string(),
        }
    }

    #[async_trait]
    impl UploadBackend for FakeBackend {
        async fn generate_upload_url(&self) -> Result<Url> {
            self.calls.lock().push(Call::GenerateUploadUrl);
            if self.reject_upload_url {
                return Err(rejected(StatusCode::UNAUTHORIZED, "you must be logged in to upload a file"));
            }
            Ok("http://filehub.test/api/v1/storage/upload/t".parse().unwrap())
        }

        async fn upload(&self, _upload_url: &Url, file: &SelectedFile) -> Result<StorageId> {
            self.calls.lock().push(Call::Upload {
                content_type: file.content_type.clone(),
            });
            Ok(self.storage_id)
        }

        async fn create_file(&self, name: &str, file_id: StorageId, org_id: &str) -> Result<()> {
            self.calls.lock().push(Call::CreateFile {
                name: name.to_string(),
                file_id,
                org_id: org_id.to_string(),
            });
            if self.reject_create {
                return Err(rejected(StatusCode::FORBIDDEN, "you do not have permission for this organization"));
            }
            Ok(())
        }

        async fn delete_storage_object(&self, storage_id: StorageId) -> Result<()> {
            self.calls.lock().push(Call::Delete(storage_id));
            Ok(())
        }
    }

    fn pdf() -> SelectedFile {
        SelectedFile {
            name: "report.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            content: Bytes::from_static(b"%PDF-1.7"),
        }
    }

    fn filled_form() -> UploadForm {
        let mut form = UploadForm::new();
        form.open();
        form.set_title("report.pdf");
        form.attach_file(pdf());
        form
    }

    #[test]
    fn test_active_organization_precedence() {
        assert_eq!(
            ActiveOrganization::resolve(Some("org_9"), Some("user_42")),
            Some(ActiveOrganization::Selected("org_9".to_string()))
        );
        assert_eq!(
            ActiveOrganization::resolve(None, Some("user_42")),
            Some(ActiveOrganization::Personal("user_42".to_string()))
        );
        assert_eq!(
            ActiveOrganization::resolve(Some(""), Some("user_42")).unwrap().org_id(),
            "user_42"
        );
        assert_eq!(ActiveOrganization::resolve(None, None), None);
    }

    #[test_log::test(tokio::test)]
    async fn test_successful_submit_resets_form() {
        let backend = FakeBackend::new();
        let org = ActiveOrganization::resolve(None, Some("user_42")).unwrap();
        let mut form = filled_form();

        let outcome = form.submit(&backend, Some(&org)).await;
        match outcome {
            SubmitOutcome::Uploaded { file_id, notification } => {
                assert_eq!(file_id, backend.storage_id);
                assert_eq!(notification, Notification::UPLOADED);
                assert_eq!(notification.title, "File uploaded");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }

        assert_eq!(
            backend.calls(),
            vec![
                Call::GenerateUploadUrl,
                Call::Upload {
                    content_type: "application/pdf".to_string()
                },
                Call::CreateFile {
                    name: "report.pdf".to_string(),
                    file_id: backend.storage_id,
                    org_id: "user_42".to_string(),
                },
            ]
        );
        assert_eq!(form.state(), FormState::Idle);
        assert_eq!(form.title(), "");
        assert!(form.files().is_empty());
    }

    #[test_log::test(tokio::test)]
    async fn test_validation_errors_keep_dialog_open() {
        let backend = FakeBackend::new();
        let org = ActiveOrganization::resolve(Some("org_9"), None).unwrap();
        let mut form = UploadForm::new();
        form.open();

        match form.submit(&backend, Some(&org)).await {
            SubmitOutcome::Invalid(errors) => {
                assert_eq!(errors.title, Some(TITLE_REQUIRED));
                assert_eq!(errors.file, Some(FILE_REQUIRED));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(form.state(), FormState::DialogOpen);
        assert!(backend.calls().is_empty());

        form.set_title("two files");
        form.attach_file(pdf());
        form.attach_file(pdf());
        match form.submit(&backend, Some(&org)).await {
            SubmitOutcome::Invalid(errors) => {
                assert_eq!(errors.title, None);
                assert_eq!(errors.file, Some(SINGLE_FILE_REQUIRED));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(form.field_errors().file, Some(SINGLE_FILE_REQUIRED));
        assert!(backend.calls().is_empty());
    }

    #[test_log::test(tokio::test)]
    async fn test_failed_create_deletes_upload_and_keeps_fields() {
        let backend = FakeBackend {
            reject_create: true,
            ..FakeBackend::new()
        };
        let org = ActiveOrganization::resolve(Some("org_9"), Some("user_B")).unwrap();
        let mut form = filled_form();

        match form.submit(&backend, Some(&org)).await {
            SubmitOutcome::Failed { error, notification } => {
                assert_eq!(error.to_string(), "you do not have permission for this organization");
                assert_eq!(notification, Notification::FAILED);
            }
            other => panic!("unexpected outcome: {other:?}"),
        }

        assert_eq!(backend.calls().last(), Some(&Call::Delete(backend.storage_id)));
        assert_eq!(form.state(), FormState::DialogOpen);
        assert_eq!(form.title(), "report.pdf");
        assert_eq!(form.files(), &[pdf()]);
    }

    #[test_log::test(tokio::test)]
    async fn test_failure_before_upload_needs_no_cleanup() {
        let backend = FakeBackend {
            reject_upload_url: true,
            ..FakeBackend::new()
        };
        let org = ActiveOrganization::resolve(None, Some("user_42")).unwrap();
        let mut form = filled_form();

        assert!(matches!(form.submit(&backend, Some(&org)).await, SubmitOutcome::Failed { .. }));
        assert_eq!(backend.calls(), vec![Call::GenerateUploadUrl]);
        assert!(form.is_submit_enabled());
    }

    #[test_log::test(tokio::test)]
    async fn test_submit_requires_open_dialog_and_organization() {
        let backend = FakeBackend::new();
        let org = ActiveOrganization::resolve(None, Some("user_42")).unwrap();

        let mut closed = UploadForm::new();
        assert!(matches!(closed.submit(&backend, Some(&org)).await, SubmitOutcome::Ignored));

        let mut form = filled_form();
        assert!(matches!(form.submit(&backend, None).await, SubmitOutcome::NotReady));
        assert!(backend.calls().is_empty());
        assert_eq!(form.state(), FormState::DialogOpen);
    }

    #[test_log::test(tokio::test)]
    async fn test_failure_stays_on_form_until_edited() {
        let backend = FakeBackend {
            reject_create: true,
            ..FakeBackend::new()
        };
        let org = ActiveOrganization::resolve(Some("org_9"), None).unwrap();
        let mut form = filled_form();
        assert_eq!(form.failure(), None);

        form.submit(&backend, Some(&org)).await;
        assert_eq!(form.failure(), Some(&Notification::FAILED));

        form.set_title("report v2.pdf");
        assert_eq!(form.failure(), None);

        form.submit(&backend, Some(&org)).await;
        form.close();
        assert_eq!(form.failure(), None);
    }

    #[test]
    fn test_close_discards_fields() {
        let mut form = filled_form();
        form.close();
        assert_eq!(form.state(), FormState::Idle);
        assert_eq!(form.title(), "");
        assert!(!form.is_submit_enabled());
    }
}
