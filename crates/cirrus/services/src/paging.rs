//! Page collection for numbered remote listings

use std::future::Future;

use cirrus_types::RemoteResult;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ServiceError};

/// One page of a remote listing. Pages are numbered from 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub resources: Vec<T>,
    pub total_pages: u32,
}

impl<T> Page<T> {
    pub fn single(resources: Vec<T>) -> Self {
        Self {
            resources,
            total_pages: 1,
        }
    }
}

/// Fetch every page of a listing, starting at page 1.
pub async fn collect_pages<T, F, Fut>(description: &str, mut fetch: F) -> Result<Vec<T>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = RemoteResult<Page<T>>>,
{
    let mut resources = Vec::new();
    let mut page = 1;

    loop {
        let result = fetch(page)
            .await
            .map_err(ServiceError::remote(format!("fetching {description}")))?;
        resources.extend(result.resources);

        if page >= result.total_pages {
            break;
        }
        page += 1;
    }

    Ok(resources)
}
