//! Validation of upload submissions.

use super::types::{FieldErrors, UploadSubmission, UploadedFile};
use crate::store::NewDocument;

/// Maximum length of a set name, in characters.
pub const MAX_SET_NAME_CHARS: usize = 255;

pub(crate) const REQUIRED: &str = "This field is required.";
const NOT_A_FILE: &str = "The submitted data was not a file. Check the encoding type on the form.";

/// Upload that passed validation and may be persisted.
#[derive(Debug, Clone)]
pub struct ValidatedUpload {
    /// Trimmed set name.
    pub set_name: String,
    /// Files to store, in submission order.
    pub documents: Vec<NewDocument>,
}

/// Check an upload submission, collecting every field error rather than stopping at the first.
pub fn validate_upload(submission: UploadSubmission) -> Result<ValidatedUpload, FieldErrors> {
    let mut errors = FieldErrors::new();

    let set_name = submission
        .set_name
        .as_deref()
        .map(str::trim)
        .unwrap_or_default()
        .to_string();
    if set_name.is_empty() {
        errors.add("set_name", REQUIRED);
    } else {
        let length = set_name.chars().count();
        if length > MAX_SET_NAME_CHARS {
            errors.add(
                "set_name",
                format!(
                    "Ensure this value has at most {MAX_SET_NAME_CHARS} characters (it has {length})."
                ),
            );
        }
    }

    let mut documents = Vec::with_capacity(submission.documents.len());
    if submission.documents.is_empty() {
        errors.add("documents", REQUIRED);
    }
    for UploadedFile { filename, bytes } in submission.documents {
        match filename.filter(|name| !name.trim().is_empty()) {
            Some(filename) => documents.push(NewDocument { filename, bytes }),
            None => {
                if !errors.get("documents").iter().any(|message| message == NOT_A_FILE) {
                    errors.add("documents", NOT_A_FILE);
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(ValidatedUpload {
            set_name,
            documents,
        })
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str) -> UploadedFile {
        UploadedFile {
            filename: Some(name.to_string()),
            bytes: b"content".to_vec(),
        }
    }

    #[test]
    fn valid_submission_trims_name_and_keeps_order() {
        let upload = validate_upload(UploadSubmission {
            set_name: Some("  Reading list ".into()),
            documents: vec![file("b.pdf"), file("a.pdf")],
        })
        .expect("valid");

        assert_eq!(upload.set_name, "Reading list");
        let names: Vec<_> = upload.documents.iter().map(|d| d.filename.as_str()).collect();
        assert_eq!(names, vec!["b.pdf", "a.pdf"]);
    }

    #[test]
    fn blank_name_and_missing_files_report_both_fields() {
        let errors = validate_upload(UploadSubmission {
            set_name: Some("   ".into()),
            documents: Vec::new(),
        })
        .expect_err("invalid");

        assert_eq!(errors.get("set_name"), [REQUIRED.to_string()]);
        assert_eq!(errors.get("documents"), [REQUIRED.to_string()]);
    }

    #[test]
    fn overlong_name_is_rejected_with_length() {
        let errors = validate_upload(UploadSubmission {
            set_name: Some("n".repeat(256)),
            documents: vec![file("a.pdf")],
        })
        .expect_err("too long");

        assert!(errors.get("set_name")[0].contains("it has 256"));
        assert!(errors.get("documents").is_empty());
    }

    #[test]
    fn name_at_limit_is_accepted() {
        let upload = validate_upload(UploadSubmission {
            set_name: Some("é".repeat(MAX_SET_NAME_CHARS)),
            documents: vec![file("a.pdf")],
        });
        assert!(upload.is_ok());
    }

    #[test]
    fn parts_without_filename_are_not_files() {
        let errors = validate_upload(UploadSubmission {
            set_name: Some("Set".into()),
            documents: vec![
                file("a.pdf"),
                UploadedFile {
                    filename: None,
                    bytes: Vec::new(),
                },
                UploadedFile {
                    filename: Some(" ".into()),
                    bytes: Vec::new(),
                },
            ],
        })
        .expect_err("not a file");

        assert_eq!(errors.get("documents").len(), 1);
        assert!(errors.get("documents")[0].starts_with("The submitted data was not a file"));
    }
}
