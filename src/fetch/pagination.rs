use std::future::Future;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use crate::error::{Error, Result};
use crate::fetch::http;

/// A decoded page of a link-chained listing.
pub trait Page: DeserializeOwned {
    type Item;

    /// Splits the page into its items and the link to the next page.
    /// An empty or absent link ends the walk.
    fn into_parts(self) -> (Vec<Self::Item>, Option<String>);
}

/// Follows next-page links until the chain ends. The walk is all or
/// nothing: any failing page discards what was gathered so far.
#[derive(Clone)]
pub struct PageWalker {
    client: Client,
}

impl PageWalker {
    pub fn new(client: Client) -> Self {
        PageWalker { client }
    }

    pub async fn fetch_all_pages<P: Page>(
        &self,
        cancel: &CancellationToken,
        first_url: Url,
    ) -> Result<Vec<P::Item>> {
        walk(first_url, |url| http::get_json::<P>(cancel, self.client.get(url))).await
    }
}

async fn walk<P, F, Fut>(first_url: Url, mut fetch_page: F) -> Result<Vec<P::Item>>
where
    P: Page,
    F: FnMut(Url) -> Fut,
    Fut: Future<Output = Result<P>>,
{
    let mut items = Vec::new();
    let mut url = first_url;
    let mut pages = 0usize;

    loop {
        let page = fetch_page(url.clone()).await?;
        let (page_items, next_link) = page.into_parts();
        pages += 1;

        debug!(page = pages, items = page_items.len(), "fetched page");
        items.extend(page_items);

        match next_link.as_deref().map(str::trim) {
            None | Some("") => break,
            Some(link) => url = resolve_next_link(&url, link)?,
        }
    }

    Ok(items)
}

/// Resolves a next-page link, which may be absolute or relative to the
/// page it came from.
pub fn resolve_next_link(current: &Url, link: &str) -> Result<Url> {
    current
        .join(link)
        .map_err(|e| Error::DecodeError(format!("malformed next page link {:?}: {}", link, e)))
}
