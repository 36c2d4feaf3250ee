use crate::modules::upload::handle::*;
use actix_web::web::{scope, ServiceConfig};

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/uploads").service(upload_single).service(upload_multiple).service(upload_fields),
    );
}
