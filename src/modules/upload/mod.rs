pub mod category;
pub mod filename;
pub mod handle;
pub mod model;
pub mod route;
pub mod schema;
pub mod service;

pub use model::UploadedFiles;
pub use service::Intake;
