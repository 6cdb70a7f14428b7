//! State snapshots keyed by state root.
//!
//! The snapshot encoding belongs to the state implementation; this module
//! only stores and fetches it.

use huc_types::Hash;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::schema::state_key;
use crate::{decode, encode, Database, StoreError};

pub fn read_state_snapshot<T: DeserializeOwned>(db: &dyn Database, root: &Hash) -> Result<Option<T>, StoreError> {
    db.get(&state_key(root))?
        .map(|bytes| decode(&bytes))
        .transpose()
}

pub fn write_state_snapshot<T: Serialize>(db: &dyn Database, root: &Hash, snapshot: &T) -> Result<(), StoreError> {
    db.put(&state_key(root), &encode(snapshot)?)
}

pub fn has_state(db: &dyn Database, root: &Hash) -> Result<bool, StoreError> {
    db.has(&state_key(root))
}
