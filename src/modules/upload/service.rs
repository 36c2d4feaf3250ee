use actix_multipart::{Field, Multipart};
use actix_web::{web, HttpMessage, HttpRequest};
use futures_util::TryStreamExt;
use std::{
    collections::{BTreeMap, HashMap},
    path::{Path, PathBuf},
};
use tokio::io::AsyncWriteExt;

use crate::api::error::{self, UploadError};
use crate::configs::UploadLimits;
use crate::modules::upload::{
    category::UploadCategory,
    filename::generate_filename,
    model::{FileDescriptor, IntakeMode, IntakeOutcome, UploadedFiles},
    schema::UploadQuery,
};

const CATEGORY_FIELD: &str = "type";

/// Parses multipart bodies and stores accepted files in the temp directory.
///
/// Built once at startup and shared through `web::Data`.
#[derive(Debug, Clone)]
pub struct Intake {
    limits: UploadLimits,
    temp_dir: PathBuf,
}

fn multipart_error(err: actix_multipart::MultipartError) -> UploadError {
    UploadError::other(err.to_string())
}

fn detect_mime(field: &Field, original_name: &str) -> String {
    field
        .content_type()
        .map(|m| m.to_string())
        .or_else(|| mime_guess::from_path(original_name).first_raw().map(str::to_string))
        .unwrap_or_else(|| "application/octet-stream".to_string())
}

/// Files go into the request extensions as soon as they are complete, so the
/// cleanup hook still sees them when a later part fails.
fn record(req: &HttpRequest, mode: &IntakeMode, file: FileDescriptor) {
    let mut extensions = req.extensions_mut();
    match mode {
        IntakeMode::Single { .. } => {
            extensions.insert(UploadedFiles::Single(file));
        }
        IntakeMode::Array { .. } => match extensions.get_mut::<UploadedFiles>() {
            Some(UploadedFiles::Many(files)) => files.push(file),
            _ => {
                extensions.insert(UploadedFiles::Many(vec![file]));
            }
        },
        IntakeMode::Fields(_) => match extensions.get_mut::<UploadedFiles>() {
            Some(UploadedFiles::Fields(map)) => map.entry(file.field.clone()).or_default().push(file),
            _ => {
                let mut map = BTreeMap::new();
                map.insert(file.field.clone(), vec![file]);
                extensions.insert(UploadedFiles::Fields(map));
            }
        },
    }
}

async fn discard_partial(path: &Path) {
    if let Err(err) = tokio::fs::remove_file(path).await {
        tracing::warn!(path = %path.display(), error = %err, "Failed to remove partial upload");
    }
}

impl Intake {
    pub fn new(limits: UploadLimits, temp_dir: impl Into<PathBuf>) -> Self {
        Self { limits, temp_dir: temp_dir.into() }
    }

    /// Field name and count checks for the `files`-th file of the request.
    fn check_slot(
        &self,
        mode: &IntakeMode,
        name: &str,
        files: usize,
        per_field: &mut HashMap<String, usize>,
    ) -> Result<(), UploadError> {
        let too_many = |max: usize| UploadError::TooManyFiles { field: name.to_string(), max };
        let unexpected = || UploadError::UnexpectedField { field: name.to_string() };

        match mode {
            IntakeMode::Single { field } => {
                if name != *field || files > 1 {
                    return Err(unexpected());
                }
            }
            IntakeMode::Array { field, max_count } => {
                let max = (*max_count).min(self.limits.max_files);
                if files > max {
                    return Err(too_many(max));
                }
                if name != *field {
                    return Err(unexpected());
                }
            }
            IntakeMode::Fields(slots) => {
                // Slot capacities may add up to more than the batch limit.
                if files > self.limits.max_files {
                    return Err(too_many(self.limits.max_files));
                }
                let slot = slots.iter().find(|s| s.name == name).ok_or_else(unexpected)?;
                let count = per_field.entry(name.to_string()).or_insert(0);
                *count += 1;
                if *count > slot.max_count {
                    return Err(unexpected());
                }
            }
        }
        Ok(())
    }

    async fn read_text(&self, name: &str, field: &mut Field) -> Result<String, UploadError> {
        let mut value = Vec::new();
        while let Some(chunk) = field.try_next().await.map_err(multipart_error)? {
            if value.len() + chunk.len() > self.limits.max_field_value_size {
                return Err(UploadError::Other {
                    field: Some(name.to_string()),
                    message: "Field value too long".to_string(),
                });
            }
            value.extend_from_slice(&chunk);
        }
        Ok(String::from_utf8_lossy(&value).into_owned())
    }

    /// Streams one file part to disk, returning its size. Stops at the first
    /// chunk that pushes the total over the limit.
    async fn write_part(
        &self,
        name: &str,
        field: &mut Field,
        file: &mut tokio::fs::File,
    ) -> Result<u64, error::SystemError> {
        let mut size: u64 = 0;
        while let Some(chunk) = field.try_next().await.map_err(multipart_error)? {
            size += chunk.len() as u64;
            if size > self.limits.max_file_size {
                return Err(UploadError::FileTooLarge {
                    field: name.to_string(),
                    max_size: self.limits.max_size_label(),
                }
                .into());
            }
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        Ok(size)
    }

    async fn store(
        &self,
        name: &str,
        original_name: String,
        mime_type: String,
        field: &mut Field,
    ) -> Result<FileDescriptor, error::SystemError> {
        let filename = generate_filename(&original_name);
        let path = self.temp_dir.join(&filename);
        let mut file = tokio::fs::File::create(&path).await?;

        let written = self.write_part(name, field, &mut file).await;
        drop(file);

        match written {
            Ok(size) => Ok(FileDescriptor {
                field: name.to_string(),
                original_name,
                mime_type,
                size,
                filename,
                path,
            }),
            Err(err) => {
                discard_partial(&path).await;
                Err(err)
            }
        }
    }

    /// Consumes the whole multipart body according to `mode`.
    ///
    /// The category comes from the `type` query parameter, else from the last
    /// `type` text part seen before the file, else defaults to image.
    pub async fn accept(
        &self,
        req: &HttpRequest,
        mode: &IntakeMode,
        mut payload: Multipart,
    ) -> Result<IntakeOutcome, error::SystemError> {
        let query_category = web::Query::<UploadQuery>::from_query(req.query_string())
            .ok()
            .and_then(|q| q.into_inner().category);

        let mut fields = BTreeMap::new();
        let mut text_parts = 0usize;
        let mut files = 0usize;
        let mut per_field = HashMap::new();

        while let Some(mut field) = payload.try_next().await.map_err(multipart_error)? {
            let name = field.name().unwrap_or_default().to_string();
            let original_name =
                field.content_disposition().and_then(|cd| cd.get_filename()).map(str::to_string);

            let Some(original_name) = original_name else {
                text_parts += 1;
                if text_parts > self.limits.max_fields {
                    return Err(UploadError::other("Too many fields").into());
                }
                let value = self.read_text(&name, &mut field).await?;
                fields.insert(name, value);
                continue;
            };

            files += 1;
            self.check_slot(mode, &name, files, &mut per_field)?;

            let category = UploadCategory::from_param(
                query_category.as_deref().or(fields.get(CATEGORY_FIELD).map(String::as_str)),
            );
            let mime_type = detect_mime(&field, &original_name);
            category.classify(&name, &mime_type)?;

            let file = self.store(&name, original_name, mime_type, &mut field).await?;
            tracing::debug!(
                field = %file.field,
                path = %file.path.display(),
                size = file.size,
                category = %category,
                "Upload stored"
            );
            record(req, mode, file);
        }

        let files = req.extensions().get::<UploadedFiles>().cloned();
        Ok(IntakeOutcome { files, fields })
    }
}
