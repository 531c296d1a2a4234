//! s3up-s3: S3 SDK adapter for s3up
//!
//! Implements the `ObjectStore` trait from s3up-core on top of aws-sdk-s3.

pub mod client;

pub use client::S3Client;
