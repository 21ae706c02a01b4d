//! Upload, selection, and summarization pipeline over the document store.

pub mod selection;
mod service;
pub mod summarize;
pub mod types;
pub mod upload;

pub use selection::{INVALID_CHOICE, select_document_set};
pub use service::{DocumentApi, DocumentService, UPLOAD_SUCCESS};
pub use summarize::{EMPTY_SET_SUMMARY, ERROR_SUMMARY, NO_VALID_SUMMARY};
pub use types::{
    FieldErrors, InitError, NON_FIELD_ERRORS, Notice, NoticeLevel, SelectionError,
    SummarizeError, SummaryOutcome, SummaryStatus, UploadError, UploadOutcome, UploadSubmission,
    UploadedFile,
};
pub use upload::{MAX_SET_NAME_CHARS, ValidatedUpload, validate_upload};
