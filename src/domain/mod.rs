// Domain layer: data model and ports (interfaces) implemented by adapters.

pub mod model;
pub mod ports;

pub use crate::domain::model::{AccountConnections, ChannelType, ContactRecord, Prospect};
pub use crate::domain::ports::{ContactHistoryStore, DraftStore, ExecutionBackend, ProspectSource, Storage};
