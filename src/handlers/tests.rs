//! Cross-handler tests
//!
//! Exercise cash-in and transfer together against the in-memory store.

#[cfg(test)]
mod tests {
    use crate::domain::{AccountId, LedgerError, TransferCode};
    use crate::handlers::{CashInCommand, CashInHandler, TransferCommand, TransferHandler};
    use crate::store::{LedgerStore, MemoryLedgerStore, SharedStore};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    async fn setup(accounts: usize) -> (MemoryLedgerStore, CashInHandler, TransferHandler, Vec<AccountId>) {
        let store = MemoryLedgerStore::new();
        let mut ids = Vec::with_capacity(accounts);
        for n in 0..accounts {
            ids.push(store.add_account(&format!("user{n}")).await);
        }
        let shared: SharedStore = Arc::new(store.clone());
        (
            store,
            CashInHandler::new(shared.clone()),
            TransferHandler::new(shared),
            ids,
        )
    }

    async fn total(store: &MemoryLedgerStore, ids: &[AccountId]) -> Decimal {
        let mut sum = Decimal::ZERO;
        for id in ids {
            if let Some(balance) = store.find_balance(*id).await.unwrap() {
                sum += balance.amount;
            }
        }
        sum
    }

    // =========================================================================
    // Conservation
    // =========================================================================

    #[tokio::test]
    async fn test_transfer_conserves_money() {
        let (store, cash_in, transfer, ids) = setup(2).await;
        cash_in.execute(CashInCommand::new(ids[0], dec!(200))).await.unwrap();
        cash_in.execute(CashInCommand::new(ids[1], dec!(15.25))).await.unwrap();
        let before = total(&store, &ids).await;

        transfer
            .execute(TransferCommand::new(ids[0], ids[1], dec!(50.75)))
            .await
            .unwrap();
        transfer
            .execute(TransferCommand::new(ids[1], ids[0], dec!(0.01)))
            .await
            .unwrap();

        assert_eq!(total(&store, &ids).await, before);
    }

    #[tokio::test]
    async fn test_exact_balance_can_be_sent() {
        let (store, cash_in, transfer, ids) = setup(2).await;
        cash_in.execute(CashInCommand::new(ids[0], dec!(100))).await.unwrap();

        let result = transfer
            .execute(TransferCommand::new(ids[0], ids[1], dec!(100)))
            .await
            .unwrap();

        assert_eq!(result.from_balance, Decimal::ZERO);
        let sender = store.find_balance(ids[0]).await.unwrap().unwrap();
        assert_eq!(sender.amount, Decimal::ZERO);
    }

    // =========================================================================
    // Self-transfer and rejection
    // =========================================================================

    #[tokio::test]
    async fn test_self_transfer_never_succeeds() {
        let (store, cash_in, transfer, ids) = setup(1).await;
        cash_in.execute(CashInCommand::new(ids[0], dec!(10))).await.unwrap();

        for amount in [dec!(1), dec!(10), dec!(1000)] {
            let err = transfer
                .execute(TransferCommand::new(ids[0], ids[0], amount))
                .await
                .unwrap_err();
            assert!(matches!(err, LedgerError::SameAccount));
        }
        assert_eq!(store.transaction_count().await, 1);
    }

    #[tokio::test]
    async fn test_rejected_transfer_writes_nothing() {
        let (store, cash_in, transfer, ids) = setup(2).await;
        cash_in.execute(CashInCommand::new(ids[0], dec!(100))).await.unwrap();

        let code = transfer
            .execute_code(TransferCommand::new(ids[0], ids[1], dec!(150)))
            .await;

        assert_eq!(code, TransferCode::InsufficientFunds);
        assert_eq!(store.transaction_count().await, 1);
        assert!(store.find_balance(ids[1]).await.unwrap().is_none());
    }

    // =========================================================================
    // Concurrency
    // =========================================================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_transfers_conserve_money() {
        let (store, cash_in, transfer, ids) = setup(4).await;
        for id in &ids {
            cash_in.execute(CashInCommand::new(*id, dec!(100))).await.unwrap();
        }

        let mut tasks = Vec::new();
        for n in 0..40usize {
            let transfer = transfer.clone();
            let from = ids[n % ids.len()];
            let to = ids[(n + 1) % ids.len()];
            tasks.push(tokio::spawn(async move {
                transfer
                    .execute_code(TransferCommand::new(from, to, dec!(7.5)))
                    .await
            }));
        }

        for task in tasks {
            let code = task.await.unwrap();
            assert!(matches!(code, TransferCode::Success | TransferCode::InsufficientFunds));
        }

        assert_eq!(total(&store, &ids).await, dec!(400));
        for id in &ids {
            let balance = store.find_balance(*id).await.unwrap().unwrap();
            assert!(balance.amount >= Decimal::ZERO);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_cash_in_creates_one_row() {
        let (store, cash_in, _, ids) = setup(1).await;

        let mut tasks = Vec::new();
        for _ in 0..20 {
            let cash_in = cash_in.clone();
            let id = ids[0];
            tasks.push(tokio::spawn(async move {
                cash_in.execute(CashInCommand::new(id, dec!(1))).await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(store.balance_row_count().await, 1);
        let balance = store.find_balance(ids[0]).await.unwrap().unwrap();
        assert_eq!(balance.amount, dec!(20));
    }
}
