use crate::prelude::{SurveyError, SurveyResult, UploadKind};

pub const CSV_MIME: &str = "text/csv";

/// A file handed over by the user, before any parsing.
#[derive(Debug, Clone, Copy)]
pub struct FileUpload<'a> {
    pub content: Option<&'a [u8]>,
    pub mime: Option<&'a str>,
    pub kind: UploadKind,
}

impl<'a> FileUpload<'a> {
    pub fn csv(content: &'a str, kind: UploadKind) -> Self {
        Self {
            content: Some(content.as_bytes()),
            mime: Some(CSV_MIME),
            kind,
        }
    }

    /// Returns the text to parse once presence, MIME type, encoding and
    /// non-emptiness check out.
    pub fn accept(&self) -> SurveyResult<&'a str> {
        let content = self.content.ok_or(SurveyError::MissingFile)?;

        let essence = self
            .mime
            .map(|mime| mime.split(';').next().unwrap_or("").trim().to_ascii_lowercase());
        match essence.as_deref() {
            Some(CSV_MIME) => {}
            other => {
                return Err(SurveyError::WrongMimeType {
                    found: other.unwrap_or("none").to_string(),
                })
            }
        }

        let content = std::str::from_utf8(content).map_err(|err| SurveyError::NotText {
            offset: err.valid_up_to(),
        })?;
        if content.trim().is_empty() {
            return Err(SurveyError::EmptyFile);
        }
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_content_is_missing_file() {
        let upload = FileUpload {
            content: None,
            mime: Some(CSV_MIME),
            kind: UploadKind::Survey,
        };
        assert_eq!(upload.accept().unwrap_err(), SurveyError::MissingFile);
    }

    #[test]
    fn mime_parameters_are_ignored() {
        let upload = FileUpload {
            content: Some(b"a,b,c\n1,2,3\n".as_slice()),
            mime: Some("Text/CSV; charset=utf-8"),
            kind: UploadKind::Survey,
        };
        assert!(upload.accept().is_ok());
    }

    #[test]
    fn other_mime_types_are_rejected() {
        let upload = FileUpload {
            content: Some(b"{}".as_slice()),
            mime: Some("application/json"),
            kind: UploadKind::Survey,
        };
        assert_eq!(
            upload.accept().unwrap_err(),
            SurveyError::WrongMimeType {
                found: "application/json".into()
            }
        );

        let untyped = FileUpload { mime: None, ..upload };
        assert_eq!(
            untyped.accept().unwrap_err(),
            SurveyError::WrongMimeType { found: "none".into() }
        );
    }

    #[test]
    fn invalid_utf8_is_rejected_not_replaced() {
        let upload = FileUpload {
            content: Some(b"x,y,\xffz\n0,0,1\n".as_slice()),
            mime: Some(CSV_MIME),
            kind: UploadKind::Survey,
        };
        assert_eq!(upload.accept().unwrap_err(), SurveyError::NotText { offset: 4 });
    }

    #[test]
    fn blank_file_is_empty() {
        let upload = FileUpload::csv("\n  \n", UploadKind::Survey);
        assert_eq!(upload.accept().unwrap_err(), SurveyError::EmptyFile);
    }
}
