use crate::accounts::AccountService;
use crate::manager::LedgerManager;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<LedgerManager>,
    pub accounts: Arc<AccountService>,
}

impl AppState {
    pub fn new(ledger: LedgerManager, accounts: AccountService) -> Self {
        Self {
            ledger: Arc::new(ledger),
            accounts: Arc::new(accounts),
        }
    }
}
