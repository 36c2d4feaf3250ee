use serde::Serialize;
use std::{collections::BTreeMap, path::PathBuf};

/// One file accepted during intake. Lives on disk until the response carrying
/// it has been flushed.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDescriptor {
    pub field: String,
    pub original_name: String,
    pub mime_type: String,
    pub size: u64,
    pub filename: String,
    pub path: PathBuf,
}

/// Files written for the current request, shaped after the intake mode.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum UploadedFiles {
    Single(FileDescriptor),
    Many(Vec<FileDescriptor>),
    Fields(BTreeMap<String, Vec<FileDescriptor>>),
}

impl UploadedFiles {
    pub fn descriptors(&self) -> Vec<&FileDescriptor> {
        match self {
            UploadedFiles::Single(file) => vec![file],
            UploadedFiles::Many(files) => files.iter().collect(),
            UploadedFiles::Fields(map) => map.values().flatten().collect(),
        }
    }

    /// The cleanup set: one entry per written file.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.descriptors().into_iter().map(|f| f.path.clone()).collect()
    }

    pub fn count(&self) -> usize {
        match self {
            UploadedFiles::Single(_) => 1,
            UploadedFiles::Many(files) => files.len(),
            UploadedFiles::Fields(map) => map.values().map(Vec::len).sum(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSlot {
    pub name: &'static str,
    pub max_count: usize,
}

pub const MEDIA_FIELDS: &[FieldSlot] = &[
    FieldSlot { name: "referenceImage", max_count: 1 },
    FieldSlot { name: "videoFile", max_count: 1 },
    FieldSlot { name: "audioFile", max_count: 1 },
];

/// Which file fields an upload endpoint accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntakeMode {
    Single { field: &'static str },
    Array { field: &'static str, max_count: usize },
    Fields(&'static [FieldSlot]),
}

impl IntakeMode {
    pub fn single() -> Self {
        IntakeMode::Single { field: "file" }
    }

    pub fn array() -> Self {
        IntakeMode::Array { field: "files", max_count: crate::constants::MAX_FILES }
    }

    pub fn media_fields() -> Self {
        IntakeMode::Fields(MEDIA_FIELDS)
    }
}

/// Text parts of the form plus whatever files were accepted.
#[derive(Debug, Clone, Default)]
pub struct IntakeOutcome {
    pub files: Option<UploadedFiles>,
    pub fields: BTreeMap<String, String>,
}
