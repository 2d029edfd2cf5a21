use async_trait::async_trait;
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::operation::get_object::GetObjectError;
use aws_sdk_s3::types::Object;
use aws_sdk_s3::Client;
use chrono::{DateTime, Utc};

use super::s3_client::create_s3_client;
use super::{ListPage, ObjectReader, ObjectStore};
use crate::catalog::ObjectRecord;
use crate::config::MirrorConfig;
use crate::error::{StoreError, StoreResult};

const MAX_KEYS: i32 = 1000;

/// `ObjectStore` backed by the AWS S3 SDK (also R2 and MinIO through a
/// custom endpoint).
#[derive(Debug, Clone)]
pub struct S3Store {
    client: Client,
}

impl S3Store {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_config(config: &MirrorConfig) -> Self {
        Self::new(create_s3_client(config))
    }
}

fn sdk_error<E, R>(err: SdkError<E, R>) -> StoreError
where
    E: std::error::Error + 'static,
    R: std::fmt::Debug,
{
    StoreError::service(DisplayErrorContext(&err).to_string())
}

fn to_record(obj: &Object) -> Option<ObjectRecord> {
    let key = obj.key()?.to_string();
    Some(ObjectRecord {
        key,
        last_modified: obj
            .last_modified()
            .and_then(|dt| DateTime::<Utc>::from_timestamp(dt.secs(), dt.subsec_nanos())),
        etag: obj.e_tag().map(|s| s.to_string()),
        size: obj.size().unwrap_or(0),
        storage_class: obj.storage_class().map(|c| c.as_str().to_string()),
    })
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn list_page(
        &self,
        bucket: &str,
        continuation_token: Option<&str>,
    ) -> StoreResult<ListPage> {
        let mut request = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .max_keys(MAX_KEYS);

        if let Some(token) = continuation_token {
            request = request.continuation_token(token);
        }

        let response = request.send().await.map_err(sdk_error)?;

        let objects: Vec<ObjectRecord> = response.contents().iter().filter_map(to_record).collect();

        Ok(ListPage {
            objects,
            key_count: response
                .key_count()
                .and_then(|count| usize::try_from(count).ok()),
            next_token: response.next_continuation_token().map(|s| s.to_string()),
            truncated: response.is_truncated().unwrap_or(false),
        })
    }

    async fn get_object(&self, bucket: &str, key: &str) -> StoreResult<ObjectReader> {
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| {
                if err
                    .as_service_error()
                    .is_some_and(GetObjectError::is_no_such_key)
                {
                    StoreError::NotFound {
                        key: key.to_string(),
                    }
                } else {
                    sdk_error(err)
                }
            })?;

        Ok(Box::pin(output.body.into_async_read()))
    }
}
