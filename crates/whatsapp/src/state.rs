use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
};

use crate::{config::WhatsAppAccountConfig, types::ConnectionState};

/// Shared account state map.
pub type AccountStateMap = Arc<RwLock<HashMap<String, AccountState>>>;

/// Per-account runtime state.
#[derive(Debug, Clone)]
pub struct AccountState {
    pub account_id: String,
    pub config: WhatsAppAccountConfig,
    pub connection_state: ConnectionState,
}

/// Run `f` on the account's state, if the account is known.
pub fn with_account<R>(
    accounts: &AccountStateMap,
    account_id: &str,
    f: impl FnOnce(&mut AccountState) -> R,
) -> Option<R> {
    let mut map = accounts.write().unwrap_or_else(PoisonError::into_inner);
    map.get_mut(account_id).map(f)
}

/// Set the connection state of one account.
pub fn set_connection_state(accounts: &AccountStateMap, account_id: &str, state: ConnectionState) {
    with_account(accounts, account_id, |s| s.connection_state = state);
}

/// Mark every account disconnected, e.g. when the sidecar link drops.
pub fn disconnect_all(accounts: &AccountStateMap) {
    let mut map = accounts.write().unwrap_or_else(PoisonError::into_inner);
    for state in map.values_mut() {
        state.connection_state = ConnectionState::Disconnected;
    }
}
