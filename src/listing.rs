use log::{debug, info};

use crate::catalog::Catalog;
use crate::error::ListingError;
use crate::providers::ObjectStore;

/// List every object in `bucket`, following continuation tokens until the
/// service reports no more pages. Any failed page aborts the whole listing.
pub async fn list_all(store: &dyn ObjectStore, bucket: &str) -> Result<Catalog, ListingError> {
    let mut catalog = Catalog::default();
    let mut continuation_token: Option<String> = None;
    let mut page = 0;

    loop {
        page += 1;
        let response = store
            .list_page(bucket, continuation_token.as_deref())
            .await
            .map_err(|source| ListingError::Page { page, source })?;

        let received = response.objects.len();
        catalog.push_page(response.objects, response.key_count.unwrap_or(received));
        debug!(
            "list_all: {} page {} -> {} objects ({} total)",
            bucket,
            page,
            received,
            catalog.len()
        );

        if !response.truncated {
            break;
        }

        match response.next_token {
            Some(token) => continuation_token = Some(token),
            None => return Err(ListingError::MissingToken { page }),
        }
    }

    info!(
        "list_all: {} -> {} objects in {} pages",
        bucket,
        catalog.len(),
        page
    );
    Ok(catalog)
}
