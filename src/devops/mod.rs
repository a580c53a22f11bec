//! Azure DevOps REST client: iteration resolution, WIQL queries and batched
//! work item hydration.

pub mod api_types;
pub mod client;
pub mod error;
pub mod hydrate;
pub mod iteration;
pub mod transport;
pub mod types;
pub mod wiql;

pub use client::DevOpsClient;
pub use error::UpstreamError;
pub use types::{Iteration, RawWorkItem, WorkItemId};
