pub mod board;
pub mod connect;
pub mod enrich;
pub mod inspector;
pub mod lookup;
pub mod model;
pub mod persist;
pub mod search;

pub use board::{Board, EnrichSummary};
pub use connect::{ConnectGesture, GestureOutcome};
pub use enrich::{enrich_node, extract_emails, Enrichment};
pub use inspector::InspectorForm;
pub use lookup::{DnsRecords, LookupProvider, NetLookup, WhoisInfo};
pub use model::{Attachment, Edge, EdgeStyle, Graph, Group, Node, Status};
pub use persist::PersistError;
