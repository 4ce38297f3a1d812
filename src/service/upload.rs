use bytes::Bytes;

use crate::models::{Document, is_text_mime};

/// A file as received from the picker or a drop.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub mime_type: String,
    pub data: Bytes,
}

/// Only the first file of a multi-file drop is uploaded.
pub fn first_file(files: impl IntoIterator<Item = UploadedFile>) -> Option<UploadedFile> {
    files.into_iter().next()
}

impl Document {
    /// Reads the text eagerly for `text/*` uploads; other types keep only the
    /// name as chat context.
    pub fn from_upload(id: String, file: UploadedFile) -> Self {
        let content = if is_text_mime(&file.mime_type) {
            String::from_utf8_lossy(&file.data).into_owned()
        } else {
            String::new()
        };
        Document {
            id,
            name: file.name,
            mime_type: file.mime_type,
            content,
            data: file.data,
        }
    }
}
