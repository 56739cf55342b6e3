use std::fmt;

use crate::protocol::ArgumentError;

/// The outcome of a file upload as reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UploadError {
    Ok,
    IniSize,
    FormSize,
    Partial,
    NoFile,
    NoTmpDir,
    CantWrite,
    Extension,
}

static UPLOAD_ERRORS: [(i32, UploadError, &str); 8] = [
    (0, UploadError::Ok, "There is no error, the file uploaded with success"),
    (1, UploadError::IniSize, "The uploaded file exceeds the maximum upload size of the server"),
    (2, UploadError::FormSize, "The uploaded file exceeds the MAX_FILE_SIZE directive that was specified in the HTML form"),
    (3, UploadError::Partial, "The uploaded file was only partially uploaded"),
    (4, UploadError::NoFile, "No file was uploaded"),
    (6, UploadError::NoTmpDir, "Missing a temporary folder"),
    (7, UploadError::CantWrite, "Failed to write file to disk"),
    (8, UploadError::Extension, "A server extension stopped the file upload"),
];

impl UploadError {
    /// # Errors
    ///
    /// Returns an invalid-argument error for codes outside the defined outcomes.
    pub fn from_code(code: i32) -> Result<Self, ArgumentError> {
        UPLOAD_ERRORS
            .iter()
            .find(|(candidate, _, _)| *candidate == code)
            .map(|(_, error, _)| *error)
            .ok_or(ArgumentError::InvalidUploadError { code })
    }

    pub fn code(self) -> i32 {
        self.entry().0
    }

    pub fn message(self) -> &'static str {
        self.entry().2
    }

    #[inline]
    pub fn is_ok(self) -> bool {
        self == UploadError::Ok
    }

    fn entry(self) -> &'static (i32, UploadError, &'static str) {
        // every variant has exactly one row
        let index = match self {
            UploadError::Ok => 0,
            UploadError::IniSize => 1,
            UploadError::FormSize => 2,
            UploadError::Partial => 3,
            UploadError::NoFile => 4,
            UploadError::NoTmpDir => 5,
            UploadError::CantWrite => 6,
            UploadError::Extension => 7,
        };
        &UPLOAD_ERRORS[index]
    }
}

impl fmt::Display for UploadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}
