pub mod extract;
pub mod get_artifact;
pub mod health_check;
pub mod upload_image;

pub use extract::extract;
pub use get_artifact::{get_headshot, get_paper};
pub use health_check::health_check;
pub use upload_image::upload_image;
