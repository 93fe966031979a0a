pub mod fs;
pub mod memory;

use futures::future::BoxFuture;

use crate::dao::models::SessionEntity;
use crate::dao::storage::StorageResult;

/// Reduce a room name to the key it is stored under.
///
/// Every character that is not alphanumeric is stripped, not escaped, so two
/// visually distinct names can map to the same key ("mesa 1" and "mesa-1"
/// share a session). A name with no alphanumeric characters at all yields an
/// empty key, which callers must reject before reaching the store.
pub fn room_storage_key(room_id: &str) -> String {
    room_id.chars().filter(|c| c.is_alphanumeric()).collect()
}

/// Abstraction over the persistence layer for room snapshots.
pub trait SessionStore: Send + Sync {
    fn save_session(
        &self,
        room_key: String,
        session: SessionEntity,
    ) -> BoxFuture<'static, StorageResult<()>>;
    fn load_session(
        &self,
        room_key: String,
    ) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>>;
    fn delete_session(&self, room_key: String) -> BoxFuture<'static, StorageResult<bool>>;
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_key_strips_everything_but_alphanumerics() {
        assert_eq!(room_storage_key("Mesa Grande 1"), "MesaGrande1");
        assert_eq!(room_storage_key("los-tigres!"), "lostigres");
        assert_eq!(room_storage_key("../../etc/passwd"), "etcpasswd");
    }

    #[test]
    fn storage_key_keeps_accented_letters() {
        assert_eq!(room_storage_key("Peña Dominó"), "PeñaDominó");
    }

    #[test]
    fn distinct_names_can_share_a_key() {
        assert_eq!(room_storage_key("mesa 1"), room_storage_key("mesa-1"));
    }

    #[test]
    fn symbol_only_names_yield_an_empty_key() {
        assert_eq!(room_storage_key("!!!"), "");
    }
}
