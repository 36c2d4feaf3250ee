use actix_multipart::Multipart;
use actix_web::{post, web, HttpRequest};

use crate::api::{error, success};
use crate::modules::upload::{model::IntakeMode, schema::UploadResponse, service::Intake};

#[post("/single")]
pub async fn upload_single(
    req: HttpRequest,
    payload: Multipart,
    intake: web::Data<Intake>,
) -> Result<success::Success<UploadResponse>, error::Error> {
    let outcome = intake.accept(&req, &IntakeMode::single(), payload).await?;
    if outcome.files.is_none() {
        return Err(error::Error::bad_request("No file uploaded"));
    }
    Ok(success::Success::created(Some(outcome.into())).message("File uploaded successfully"))
}

#[post("/multiple")]
pub async fn upload_multiple(
    req: HttpRequest,
    payload: Multipart,
    intake: web::Data<Intake>,
) -> Result<success::Success<UploadResponse>, error::Error> {
    let outcome = intake.accept(&req, &IntakeMode::array(), payload).await?;
    if outcome.files.is_none() {
        return Err(error::Error::bad_request("No files uploaded"));
    }
    Ok(success::Success::created(Some(outcome.into())).message("Files uploaded successfully"))
}

/// Media slots are all optional; a prompt-only form is accepted.
#[post("/fields")]
pub async fn upload_fields(
    req: HttpRequest,
    payload: Multipart,
    intake: web::Data<Intake>,
) -> Result<success::Success<UploadResponse>, error::Error> {
    let outcome = intake.accept(&req, &IntakeMode::media_fields(), payload).await?;
    Ok(success::Success::created(Some(outcome.into())).message("Upload accepted"))
}
