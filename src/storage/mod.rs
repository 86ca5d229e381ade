//! Object-storage inspector
//!
//! Lists the buckets visible to the configured credentials and counts the
//! objects in one of them. The network side sits behind [`ObjectStore`] so
//! the printing logic can be driven by an in-memory store in tests.

use std::io::{BufRead, Write};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::types::{AppError, AppResult};

pub mod s3_client;

pub use s3_client::*;

/// One page of an object listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObjectPage {
    pub keys: Vec<String>,
    /// Set only when the listing was truncated.
    pub next_continuation_token: Option<String>,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn list_bucket_names(&self) -> AppResult<Vec<String>>;

    async fn list_objects_page(
        &self,
        bucket: &str,
        continuation_token: Option<String>,
    ) -> AppResult<ObjectPage>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageMode {
    #[default]
    FirstPage,
    AllPages,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectCount {
    Empty,
    Objects(usize),
}

impl ObjectCount {
    pub fn total(&self) -> usize {
        match self {
            ObjectCount::Empty => 0,
            ObjectCount::Objects(n) => *n,
        }
    }
}

pub async fn list_s3_buckets<S, W>(store: &S, out: &mut W) -> AppResult<Vec<String>>
where
    S: ObjectStore + ?Sized,
    W: Write,
{
    let names = store.list_bucket_names().await?;

    writeln!(out, "List of S3 Buckets:")?;
    for name in &names {
        writeln!(out, "{}", name)?;
    }

    info!("Listed {} bucket(s)", names.len());
    Ok(names)
}

pub async fn count_objects_in_bucket<S, W>(
    store: &S,
    bucket: &str,
    mode: PageMode,
    out: &mut W,
) -> AppResult<ObjectCount>
where
    S: ObjectStore + ?Sized,
    W: Write,
{
    let mut total = 0usize;
    let mut token = None;
    let mut previous: Option<String> = None;
    let mut pages = 0usize;

    loop {
        let page = store.list_objects_page(bucket, token.take()).await?;
        pages += 1;
        total += page.keys.len();
        debug!("Page {} of '{}': {} key(s)", pages, bucket, page.keys.len());

        match (mode, page.next_continuation_token) {
            (PageMode::AllPages, Some(next)) if previous.as_deref() != Some(next.as_str()) => {
                previous = Some(next.clone());
                token = Some(next);
            }
            (PageMode::AllPages, Some(next)) => {
                warn!("Listing of '{}' repeated continuation token '{}'; stopping", bucket, next);
                break;
            }
            _ => break,
        }
    }

    let count = if total == 0 {
        writeln!(out, "No objects found in the bucket '{}'.", bucket)?;
        ObjectCount::Empty
    } else {
        writeln!(
            out,
            "Total number of objects in the bucket '{}': {}",
            bucket, total
        )?;
        ObjectCount::Objects(total)
    };

    info!("Counted {} object(s) in '{}' over {} page(s)", total, bucket, pages);
    Ok(count)
}

/// Ask for a bucket name on `out` and read one line from `input`.
pub fn prompt_bucket_name<R, W>(input: &mut R, out: &mut W) -> AppResult<String>
where
    R: BufRead,
    W: Write,
{
    write!(out, "Enter the name of the S3 bucket to count objects: ")?;
    out.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;

    let name = line.trim_end_matches(['\r', '\n']).to_string();
    if name.trim().is_empty() {
        return Err(AppError::InvalidInput("bucket name must not be empty".to_string()));
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Cursor;

    /// In-memory store; each bucket holds a list of pages.
    #[derive(Default)]
    struct MemoryStore {
        buckets: Vec<String>,
        pages: HashMap<String, Vec<Vec<String>>>,
    }

    impl MemoryStore {
        fn with_pages(bucket: &str, pages: Vec<Vec<&str>>) -> Self {
            let pages = pages
                .into_iter()
                .map(|page| page.into_iter().map(str::to_string).collect())
                .collect();
            Self {
                buckets: vec![bucket.to_string()],
                pages: HashMap::from([(bucket.to_string(), pages)]),
            }
        }
    }

    #[async_trait]
    impl ObjectStore for MemoryStore {
        async fn list_bucket_names(&self) -> AppResult<Vec<String>> {
            Ok(self.buckets.clone())
        }

        async fn list_objects_page(
            &self,
            bucket: &str,
            continuation_token: Option<String>,
        ) -> AppResult<ObjectPage> {
            let pages = self
                .pages
                .get(bucket)
                .ok_or_else(|| AppError::Storage(format!("NoSuchBucket: {}", bucket)))?;
            let index: usize = continuation_token.map(|t| t.parse().unwrap()).unwrap_or(0);
            let keys = pages.get(index).cloned().unwrap_or_default();
            let next_continuation_token = (index + 1 < pages.len()).then(|| (index + 1).to_string());
            Ok(ObjectPage {
                keys,
                next_continuation_token,
            })
        }
    }

    #[tokio::test]
    async fn test_list_buckets_one_line_per_bucket() {
        let store = MemoryStore {
            buckets: vec!["alpha".to_string(), "beta".to_string(), "gamma".to_string()],
            ..Default::default()
        };
        let mut out = Vec::new();

        let names = list_s3_buckets(&store, &mut out).await.unwrap();

        assert_eq!(names.len(), 3);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "List of S3 Buckets:\nalpha\nbeta\ngamma\n"
        );
    }

    #[tokio::test]
    async fn test_count_reflects_contents() {
        let store = MemoryStore::with_pages("logs", vec![vec!["a", "b", "c"]]);
        let mut out = Vec::new();

        let count = count_objects_in_bucket(&store, "logs", PageMode::FirstPage, &mut out)
            .await
            .unwrap();

        assert_eq!(count, ObjectCount::Objects(3));
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Total number of objects in the bucket 'logs': 3\n"
        );
    }

    #[tokio::test]
    async fn test_empty_bucket_prints_no_objects() {
        let store = MemoryStore::with_pages("empty", vec![vec![]]);
        let mut out = Vec::new();

        let count = count_objects_in_bucket(&store, "empty", PageMode::FirstPage, &mut out)
            .await
            .unwrap();

        assert_eq!(count, ObjectCount::Empty);
        assert_eq!(count.total(), 0);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "No objects found in the bucket 'empty'.\n"
        );
    }

    #[tokio::test]
    async fn test_first_page_only_by_default() {
        let store = MemoryStore::with_pages("big", vec![vec!["a", "b"], vec!["c"]]);
        let mut out = Vec::new();

        let count = count_objects_in_bucket(&store, "big", PageMode::default(), &mut out)
            .await
            .unwrap();

        assert_eq!(count, ObjectCount::Objects(2));
    }

    #[tokio::test]
    async fn test_all_pages_follows_continuation() {
        let store = MemoryStore::with_pages("big", vec![vec!["a", "b"], vec!["c"], vec!["d", "e"]]);
        let mut out = Vec::new();

        let count = count_objects_in_bucket(&store, "big", PageMode::AllPages, &mut out)
            .await
            .unwrap();

        assert_eq!(count, ObjectCount::Objects(5));
    }

    /// Store whose listing always hands back the same continuation token.
    struct RepeatingTokenStore;

    #[async_trait]
    impl ObjectStore for RepeatingTokenStore {
        async fn list_bucket_names(&self) -> AppResult<Vec<String>> {
            Ok(Vec::new())
        }

        async fn list_objects_page(
            &self,
            _bucket: &str,
            _continuation_token: Option<String>,
        ) -> AppResult<ObjectPage> {
            Ok(ObjectPage {
                keys: vec!["k".to_string()],
                next_continuation_token: Some("same".to_string()),
            })
        }
    }

    #[tokio::test]
    async fn test_all_pages_stops_on_repeated_token() {
        let mut out = Vec::new();

        let count = count_objects_in_bucket(&RepeatingTokenStore, "loop", PageMode::AllPages, &mut out)
            .await
            .unwrap();

        // First page hands out "same", the second repeats it and ends the walk.
        assert_eq!(count, ObjectCount::Objects(2));
    }

    #[tokio::test]
    async fn test_storage_error_propagates() {
        let store = MemoryStore::default();
        let mut out = Vec::new();

        let err = count_objects_in_bucket(&store, "missing", PageMode::FirstPage, &mut out)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Storage(msg) if msg.contains("missing")));
        assert!(out.is_empty());
    }

    #[test]
    fn test_prompt_reads_bucket_name() {
        let mut input = Cursor::new("my-bucket\r\n");
        let mut out = Vec::new();

        let name = prompt_bucket_name(&mut input, &mut out).unwrap();

        assert_eq!(name, "my-bucket");
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Enter the name of the S3 bucket to count objects: "
        );
    }

    #[test]
    fn test_prompt_rejects_empty_answer() {
        let mut input = Cursor::new("\n");
        let mut out = Vec::new();

        let err = prompt_bucket_name(&mut input, &mut out).unwrap_err();

        assert!(matches!(err, AppError::InvalidInput(_)));
    }
}
