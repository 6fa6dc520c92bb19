//! Object storage access
//!
//! [`ObjectStorage`] is the port the pipeline talks to; [`SupabaseStorage`]
//! implements it against the Supabase Storage REST API.

pub mod path;
pub mod supabase;

pub use path::{join_object_path, strip_bucket_prefix};
pub use supabase::SupabaseStorage;

use async_trait::async_trait;
use std::path::Path;
use transcribe_common::Result;

/// Bucket/object storage used by the processing pipeline
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Download `bucket/path` into `dest`, returning the number of bytes written
    async fn download(&self, bucket: &str, path: &str, dest: &Path) -> Result<u64>;

    /// Upload `body` to `bucket/path`, overwriting any existing object
    async fn upload(&self, bucket: &str, path: &str, body: Vec<u8>, content_type: &str) -> Result<()>;

    /// Upload a local file to `bucket/path`, overwriting any existing object
    async fn upload_file(&self, bucket: &str, path: &str, file: &Path, content_type: &str) -> Result<()> {
        let body = tokio::fs::read(file).await?;
        self.upload(bucket, path, body, content_type).await
    }
}
