mod blob_status;
mod digest;
mod media_type;

pub use blob_status::BlobStatus;
pub use digest::Digest;
pub use media_type::*;
