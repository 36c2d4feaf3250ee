use actix_web::{
    body::{EitherBody, MessageBody},
    dev::{ServiceRequest, ServiceResponse},
    http::header::{HeaderName, HeaderValue},
    middleware::Next,
    Error, HttpMessage, HttpRequest, HttpResponse, ResponseError,
};
use std::fmt;
use uuid::Uuid;

use crate::{
    api::error::{self, UploadError},
    constants::REQUEST_ID_HEADER,
};

mod cleanup;

pub use cleanup::cleanup_uploads;

/// Per-request correlation identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestId(pub Uuid);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

pub fn get_request_id(req: &HttpRequest) -> String {
    req.extensions().get::<RequestId>().map(ToString::to_string).unwrap_or_else(|| "-".to_string())
}

pub async fn request_id<B>(req: ServiceRequest, next: Next<B>) -> Result<ServiceResponse<B>, Error>
where
    B: MessageBody + 'static,
{
    let id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(Uuid::now_v7);

    req.extensions_mut().insert(RequestId(id));

    let mut res = next.call(req).await?;
    if let Ok(value) = HeaderValue::from_str(&id.to_string()) {
        res.headers_mut().insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }
    Ok(res)
}

fn as_upload_error(err: &Error) -> Option<&UploadError> {
    err.as_error::<UploadError>().or_else(|| match err.as_error::<error::Error>() {
        Some(error::Error::Upload(upload)) => Some(upload),
        _ => None,
    })
}

/// Renders upload-layer failures as their 400 JSON bodies. `None` means the
/// error belongs to someone else and must be left as is.
pub fn translate(err: &Error, request_id: &str) -> Option<HttpResponse> {
    let upload = as_upload_error(err)?;

    match upload {
        UploadError::FileTooLarge { .. }
        | UploadError::TooManyFiles { .. }
        | UploadError::UnexpectedField { .. }
        | UploadError::InvalidFileType { .. } => {
            tracing::warn!(
                code = upload.code(),
                field = upload.field().unwrap_or("-"),
                request_id,
                "Upload rejected: {}",
                upload
            );
        }
        UploadError::Other { .. } => {}
    }

    Some(upload.error_response())
}

pub async fn translate_upload_errors<B>(
    req: ServiceRequest,
    next: Next<B>,
) -> Result<ServiceResponse<EitherBody<B>>, Error>
where
    B: MessageBody + 'static,
{
    let res = next.call(req).await?;

    let translated = match res.response().error() {
        Some(err) => translate(err, &get_request_id(res.request())),
        None => None,
    };

    match translated {
        Some(response) => Ok(res.into_response(response).map_into_right_body()),
        None => Ok(res.map_into_left_body()),
    }
}
