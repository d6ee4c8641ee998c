// Adapters layer: concrete implementations of the domain ports.

pub mod execution;
pub mod http;
pub mod memory;
pub mod prospects;
pub mod storage;

pub use execution::FileExecutionBackend;
pub use http::{ApiClient, HttpContactHistory, HttpDraftStore, HttpExecutionBackend};
pub use memory::{InMemoryContactHistory, InMemoryDraftStore, InMemoryExecutionBackend};
pub use prospects::FileProspectSource;
pub use storage::LocalStorage;
