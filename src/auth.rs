use crate::models::{Identity, SessionFile, SCHEMA_VERSION};
use crate::storage::{Storage, StorageError};

/// Thin adapter over the external identity provider: the provider itself is
/// opaque, so all that is kept here is the identity it last handed out,
/// persisted in `session.json`. A missing or unreadable session simply
/// means nobody is signed in.
pub fn current_identity(storage: &Storage) -> Option<Identity> {
    storage.load_session().ok().and_then(|file| file.identity)
}

pub fn sign_in(storage: &Storage, identity: Identity) -> Result<(), StorageError> {
    storage.ensure_dirs()?;
    storage.save_session(&SessionFile {
        schema_version: SCHEMA_VERSION,
        identity: Some(identity),
    })
}

pub fn sign_out(storage: &Storage) -> Result<(), StorageError> {
    storage.ensure_dirs()?;
    storage.save_session(&SessionFile {
        schema_version: SCHEMA_VERSION,
        identity: None,
    })
}
