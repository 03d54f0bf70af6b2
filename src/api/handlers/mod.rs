mod admin;
mod static_files;
mod uploads;

pub use admin::health;
pub use static_files::serve_upload;
pub use uploads::{delete_upload, list_uploads, upload_image};
