pub mod error;
pub mod types;
pub mod value;

pub use error::{ErrorKind, RemoteError, Result, SyncError};
pub use types::{CREATION_DATE_KEY, MODIFICATION_DATE_KEY, RawRecord, RecordId, SystemFields};
pub use value::{AssetRef, FieldValue};
