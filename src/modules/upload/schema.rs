use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::modules::upload::model::{IntakeOutcome, UploadedFiles};

#[derive(Debug, Default, Deserialize)]
pub struct UploadQuery {
    #[serde(rename = "type")]
    pub category: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub files: Option<UploadedFiles>,
    pub count: usize,
    pub fields: BTreeMap<String, String>,
}

impl From<IntakeOutcome> for UploadResponse {
    fn from(outcome: IntakeOutcome) -> Self {
        let count = outcome.files.as_ref().map(UploadedFiles::count).unwrap_or(0);
        UploadResponse { files: outcome.files, count, fields: outcome.fields }
    }
}
