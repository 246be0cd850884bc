//! Blob storage for uploaded PDF bytes
//!
//! The rest of the application only ever uses the narrow
//! store / presign / delete capability; blob bytes never flow through
//! the annotation or registry code.

mod s3_client;

pub use s3_client::{S3Client, StoredObject};
