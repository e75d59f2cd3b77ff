use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use crate::error::Result;
use crate::types::node::Node;

#[cfg(test)]
use mockall::automock;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait NodeInventory: Send + Sync {
    async fn list_nodes(&self, cancel: &CancellationToken) -> Result<Vec<Node>>;
}
