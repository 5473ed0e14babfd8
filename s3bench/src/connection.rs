//! Connection handle for the S3-compatible service under test.

use std::fmt;

use anyhow::{Context, Result};
use s3::creds::Credentials;
use s3::{Bucket, Region};
use secrecy::ExposeSecret;

use crate::config::Storage;

/// A bucket handle on the service under test.
///
/// Creating the handle does not contact the service. The benchmark driver uses it to upload and
/// download test elements.
pub struct S3Connection {
    bucket: Box<Bucket>,
}

impl S3Connection {
    /// Creates a handle for the bucket described by `config`.
    pub fn new(config: &Storage) -> Result<Self> {
        let access_key = config.access_key.as_ref().map(|key| key.expose_secret());
        let secret_key = config.secret_key.as_ref().map(|key| key.expose_secret());

        // Without explicit keys, use the standard AWS variables or access the bucket anonymously.
        let credentials = match (access_key, secret_key) {
            (Some(access_key), Some(secret_key)) => Credentials::new(
                Some(access_key.as_str()),
                Some(secret_key.as_str()),
                None,
                None,
                None,
            ),
            _ => Credentials::from_env().or_else(|_| Credentials::anonymous()),
        }
        .context("invalid storage credentials")?;

        let region = Region::Custom {
            region: config.region.clone(),
            endpoint: match &config.endpoint {
                Some(endpoint) => endpoint.clone(),
                None => format!("s3-{}.amazonaws.com", config.region),
            },
        };

        let mut bucket = Bucket::new(&config.bucket, region, credentials)
            .with_context(|| format!("invalid bucket `{}`", config.bucket))?;
        if config.path_style {
            bucket = bucket.with_path_style();
        }

        Ok(Self { bucket })
    }

    /// The underlying bucket, for issuing requests.
    pub fn bucket(&self) -> &Bucket {
        &self.bucket
    }
}

impl fmt::Debug for S3Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Connection")
            .field("bucket", &self.bucket.name())
            .field("endpoint", &self.bucket.host())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use secrecy::SecretBox;

    use super::*;

    #[test]
    fn connects_to_custom_endpoint() {
        let config = Storage {
            endpoint: Some("http://localhost:9000".into()),
            bucket: "bench".into(),
            access_key: Some(SecretBox::new(Box::new("minio".into()))),
            secret_key: Some(SecretBox::new(Box::new("minio123".into()))),
            ..Default::default()
        };

        let connection = S3Connection::new(&config).unwrap();
        assert_eq!(connection.bucket().name(), "bench");
        assert!(connection.bucket().host().contains("localhost:9000"));

        let debug = format!("{connection:?}");
        assert!(debug.contains("bench"), "{debug}");
        assert!(!debug.contains("minio123"), "{debug}");
    }
}
