//! # Balance Updater
//!
//! Direct changes to a client's running balance.
//!
//! Sales with a client already move the balance as part of posting and
//! cancellation. These operations cover everything else: settlements,
//! corrections, opening balances.

use chrono::Utc;
use tracing::{info, instrument};

use tally_core::{Client, Money};

use super::{Ledger, LedgerError, LedgerResult};
use crate::repository::client;

impl Ledger {
    /// Adds `delta` to the client's balance. A negative delta reduces it.
    #[instrument(
        skip_all,
        fields(
            instance_id = %self.config.instance_id,
            pid = std::process::id(),
            client_id = %client_id,
            delta = %delta,
        )
    )]
    pub async fn adjust_client_balance(&self, client_id: &str, delta: Money) -> LedgerResult<Client> {
        let mut tx = self.pool.begin().await?;

        client::lock(&mut *tx, client_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Client", client_id))?;
        let now = Utc::now();

        client::apply_balance_delta(&mut *tx, client_id, delta.cents(), now).await?;

        let updated = client::find(&mut *tx, client_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Client", client_id))?;

        tx.commit().await?;

        info!(balance = %updated.balance(), "Client balance adjusted");
        Ok(updated)
    }

    /// Overwrites the client's balance.
    #[instrument(
        skip_all,
        fields(
            instance_id = %self.config.instance_id,
            pid = std::process::id(),
            client_id = %client_id,
            balance = %balance,
        )
    )]
    pub async fn set_client_balance(&self, client_id: &str, balance: Money) -> LedgerResult<Client> {
        let mut tx = self.pool.begin().await?;

        client::lock(&mut *tx, client_id)
            .await?
            .ok_or_else(|| LedgerError::not_found("Client", client_id))?;
        let now = Utc::now();

        let updated = client::set_balance(&mut *tx, client_id, balance.cents(), now)
            .await?
            .ok_or_else(|| LedgerError::not_found("Client", client_id))?;

        tx.commit().await?;

        info!("Client balance set");
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{ledger, seed_client};
    use super::*;

    #[tokio::test]
    async fn test_adjust_in_both_directions() {
        let (db, ledger) = ledger().await;
        let client = seed_client(&ledger, "Ahmed Traders", 5000).await;

        let raised = ledger
            .adjust_client_balance(&client.id, Money::from_cents(2500))
            .await
            .unwrap();
        assert_eq!(raised.current_balance_cents, 7500);

        let settled = ledger
            .adjust_client_balance(&client.id, Money::from_cents(-9000))
            .await
            .unwrap();
        assert_eq!(settled.current_balance_cents, -1500);

        let stored = db.clients().get_by_id(&client.id).await.unwrap().unwrap();
        assert_eq!(stored, settled);
    }

    #[tokio::test]
    async fn test_set_balance() {
        let (_db, ledger) = ledger().await;
        let client = seed_client(&ledger, "Ahmed Traders", 5000).await;

        let updated = ledger.set_client_balance(&client.id, Money::zero()).await.unwrap();
        assert!(updated.balance().is_zero());
        assert_eq!(updated.name, "Ahmed Traders");
    }

    #[tokio::test]
    async fn test_unknown_client() {
        let (_db, ledger) = ledger().await;

        let err = ledger
            .adjust_client_balance("missing", Money::from_cents(100))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound { ref entity, .. } if entity == "Client"));

        let err = ledger
            .set_client_balance("missing", Money::from_cents(100))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::NotFound { .. }));
    }
}
