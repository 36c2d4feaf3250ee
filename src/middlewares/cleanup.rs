use actix_web::{
    body::{BodySize, BoxBody, MessageBody},
    dev::{ServiceRequest, ServiceResponse},
    middleware::Next,
    web::Bytes,
    Error, HttpMessage, HttpRequest,
};
use std::{
    path::PathBuf,
    pin::Pin,
    task::{Context, Poll},
};

use crate::{middlewares::get_request_id, modules::upload::UploadedFiles};

/// Temp paths recorded on the request, read at send time.
pub fn cleanup_set(req: &HttpRequest) -> Vec<PathBuf> {
    req.extensions().get::<UploadedFiles>().map(UploadedFiles::paths).unwrap_or_default()
}

/// Deletes every path, one attempt each. Failures are logged and skipped.
pub async fn remove_temp_files(paths: Vec<PathBuf>, request_id: String) {
    for path in paths {
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!(path = %path.display(), request_id = %request_id, "Removed temp upload")
            }
            Err(err) => tracing::warn!(
                path = %path.display(),
                error = %err,
                request_id = %request_id,
                "Failed to remove temp upload"
            ),
        }
    }
}

/// Response body that schedules removal of the request's temp files once the
/// transport has finished with it (or dropped it on disconnect).
pub struct CleanupBody {
    inner: BoxBody,
    paths: Vec<PathBuf>,
    request_id: String,
}

impl CleanupBody {
    fn new(inner: BoxBody, paths: Vec<PathBuf>, request_id: String) -> Self {
        Self { inner, paths, request_id }
    }
}

impl MessageBody for CleanupBody {
    type Error = <BoxBody as MessageBody>::Error;

    fn size(&self) -> BodySize {
        self.inner.size()
    }

    fn poll_next(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Bytes, Self::Error>>> {
        Pin::new(&mut self.get_mut().inner).poll_next(cx)
    }
}

impl Drop for CleanupBody {
    fn drop(&mut self) {
        if self.paths.is_empty() {
            return;
        }
        let paths = std::mem::take(&mut self.paths);
        let request_id = std::mem::take(&mut self.request_id);
        actix_web::rt::spawn(remove_temp_files(paths, request_id));
    }
}

pub async fn cleanup_uploads<B>(
    req: ServiceRequest,
    next: Next<B>,
) -> Result<ServiceResponse<CleanupBody>, Error>
where
    B: MessageBody + 'static,
{
    let res = next.call(req).await?.map_into_boxed_body();

    let paths = cleanup_set(res.request());
    let request_id = get_request_id(res.request());

    Ok(res.map_body(|_, body| CleanupBody::new(body, paths, request_id)))
}
