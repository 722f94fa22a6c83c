//! Common imports for application code.
//!
//! `use recordsync::prelude::*;` brings in the container, the client, the
//! codec trait and the query builders.

pub use crate::{
    ClientConfig, Container, DatabaseScope, Filter, RecordClient, RecordCodec, RecordId,
    RecordListModel, ListRequest, SortDescriptor, SyncError,
};
