//! Filtered, resumable listing.

use tracing::{debug, instrument};

use super::{decode, Registry};
use crate::context::CallContext;
use crate::cursor::PageCursor;
use crate::error::RegistryError;
use crate::filter::FilterPredicate;
use crate::models::Resource;
use crate::names::{parse_parent, ResourceKind};
use crate::store::{ScanQuery, Store, StoreProvider};

/// Arguments of a list call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListRequest {
    /// Owning resource; empty when listing projects.
    pub parent: String,
    /// Filter expression; empty matches everything.
    pub filter: String,
    /// Requested page size; zero or negative asks for the default.
    pub page_size: i32,
    /// Token from a previous page; empty starts from the beginning.
    pub page_token: String,
}

impl ListRequest {
    pub fn new(parent: impl Into<String>) -> Self {
        Self {
            parent: parent.into(),
            ..Default::default()
        }
    }

    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }

    pub fn page_size(mut self, page_size: i32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn page_token(mut self, page_token: impl Into<String>) -> Self {
        self.page_token = page_token.into();
        self
    }
}

/// One page of a list call.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<R> {
    pub items: Vec<R>,
    /// Token for the following page; empty once the scan is exhausted.
    pub next_page_token: String,
}

impl<P: StoreProvider> Registry<P> {
    /// List resources of type `R` under a parent.
    ///
    /// The page token and the filter are both checked before anything is
    /// read. Records are returned in the store's scan order. A page is cut
    /// once it holds the bounded page size; the next token then resumes right
    /// after the last record examined, matching or not.
    #[instrument(skip(self, ctx), fields(kind = %R::KIND))]
    pub fn list<R: Resource>(
        &self,
        ctx: &CallContext,
        request: &ListRequest,
    ) -> Result<Page<R>, RegistryError> {
        let cursor = PageCursor::decode(&request.page_token)?;
        let predicate = FilterPredicate::compile(&request.filter, &R::filter_schema())?;
        let prefix = match parse_parent(&request.parent, R::KIND)? {
            Some(parent) => parent.descendant_prefix(),
            None => format!("{}/", ResourceKind::Project.collection()),
        };
        let page_size = self.options.page_size.bound(request.page_size);

        let store = self.connect(ctx)?;
        let query = ScanQuery::new(R::KIND.entity())
            .prefix(prefix)
            .resume_at(cursor.into_resume())
            .distinct();
        let mut scan = store.scan(ctx, query)?;

        let mut items = Vec::with_capacity(page_size.min(64));
        let mut resume = Vec::new();
        let mut examined = 0usize;
        while items.len() < page_size {
            let Some(item) = scan.next() else {
                debug!(examined, returned = items.len(), "scan exhausted");
                return Ok(Page {
                    items,
                    next_page_token: String::new(),
                });
            };
            let item = item?;
            ctx.check()?;
            examined += 1;

            let record: R = decode(&item.value)?;
            if predicate.matches(&record)? {
                items.push(record);
            }
            resume = item.resume;
        }

        // A full page only gets a token if something follows it.
        let next_page_token = match scan.next() {
            Some(Ok(_)) => PageCursor::new(resume, items.len() as u64).encode(),
            Some(Err(err)) => return Err(err.into()),
            None => String::new(),
        };
        debug!(examined, returned = items.len(), "page full");
        Ok(Page {
            items,
            next_page_token,
        })
    }
}
