//! Swap service: one request from wallet lookup to ledger record

use std::sync::Arc;

use alloy_primitives::{Address, U256};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use zeroize::Zeroizing;

use swap_core::{
    parse_amount, parse_native_amount, to_base_units, to_decimal, ExecutionConfig, NewTrade,
    SlippageBps, SwapError, SwapReceipt, SwapResult, TradeRecord, TradeSide, UserWallet,
    NATIVE_DECIMALS,
};
use swap_executor::{
    address_of, token_decimals, AccountLocks, ChainClient, QuoteEngine, RequestBudget,
    TransactionBuilder, TransactionSubmitter,
};
use swap_ledger::TradeLedger;
use swap_vault::KeyVault;

/// Spend native currency on a token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuyRequest {
    pub external_id: String,
    pub token: Address,
    /// Human amount, e.g. "0.01"
    pub amount_native: String,
    pub profit_target_percent: Option<u32>,
    /// Overrides the configured default
    pub slippage_bps: Option<i64>,
}

/// Sell a token amount for native currency
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SellRequest {
    pub external_id: String,
    pub token: Address,
    /// Human amount in whole tokens, e.g. "125.5"
    pub amount_tokens: String,
    pub slippage_bps: Option<i64>,
}

/// Custodial swap service.
///
/// Owns every collaborator explicitly; nothing here is global. Requests for
/// the same account are serialized from nonce fetch through broadcast.
pub struct SwapService {
    client: Arc<dyn ChainClient>,
    vault: KeyVault,
    ledger: TradeLedger,
    locks: AccountLocks,
    quotes: QuoteEngine,
    builder: TransactionBuilder,
    submitter: TransactionSubmitter,
    execution: ExecutionConfig,
}

impl SwapService {
    pub fn new(
        client: Arc<dyn ChainClient>,
        vault: KeyVault,
        ledger: TradeLedger,
        chain_id: u64,
        router: Address,
        execution: ExecutionConfig,
    ) -> Self {
        let builder = TransactionBuilder::new(Arc::clone(&client), chain_id, router)
            .with_deadline_seconds(execution.deadline_seconds)
            .with_gas_price(execution.gas_price_wei);

        Self {
            quotes: QuoteEngine::new(Arc::clone(&client), router),
            submitter: TransactionSubmitter::new(Arc::clone(&client)),
            builder,
            client,
            vault,
            ledger,
            locks: AccountLocks::new(),
            execution,
        }
    }

    pub fn client(&self) -> Arc<dyn ChainClient> {
        Arc::clone(&self.client)
    }

    pub fn quotes(&self) -> &QuoteEngine {
        &self.quotes
    }

    pub fn budget(&self) -> RequestBudget {
        RequestBudget::from_config(&self.execution)
    }

    /// Encrypt and store `private_key` for `external_id`, replacing any
    /// previous key. Returns the wallet address.
    #[instrument(skip(self, private_key))]
    pub fn register_wallet(
        &self,
        external_id: &str,
        private_key: Zeroizing<String>,
    ) -> SwapResult<Address> {
        let address = address_of(&private_key)?;
        let payload = self.vault.encrypt(private_key.trim())?;
        drop(private_key);

        let user_id = self.ledger.upsert_wallet(external_id, &payload)?;
        info!(user_id, %address, "Wallet registered");
        Ok(address)
    }

    /// Swap `amount_native` of the native currency for `token`.
    #[instrument(skip(self, request), fields(external_id = %request.external_id, token = %request.token))]
    pub async fn buy(&self, request: BuyRequest) -> SwapResult<SwapReceipt> {
        let wallet = self.wallet(&request.external_id)?;
        let value_in = parse_native_amount(&request.amount_native)?;
        let amount_native = native_decimal(value_in)?;
        let slippage = self.slippage(request.slippage_bps)?;

        let key = self.vault.decrypt(&wallet.encrypted_wallet)?;
        let from = address_of(&key)?;
        let budget = self.budget();

        let path = self.quotes.buy_path(request.token, &budget).await?;
        let expected_out = self.quotes.estimate_output(value_in, &path, &budget).await?;

        let (unsigned, tx_hash) = {
            let _guard = self.locks.acquire(from).await;
            let unsigned = self
                .builder
                .build_buy(expected_out, slippage, &path, from, value_in, &budget)
                .await?;
            let tx_hash = self.submitter.sign_and_send(key, &unsigned, &budget).await?;
            (unsigned, tx_hash)
        };

        let record_id = self.record(NewTrade {
            user_id: wallet.user_id,
            tx_hash: tx_hash.clone(),
            token: request.token,
            amount_in_native: amount_native,
            amount_token: expected_out,
            profit_target_percent: request.profit_target_percent,
            side: TradeSide::Buy,
        })?;

        Ok(SwapReceipt {
            record_id,
            tx_hash,
            side: TradeSide::Buy,
            from,
            token: request.token,
            amount_in: value_in,
            expected_out,
            amount_out_min: unsigned.amount_out_min,
            nonce: unsigned.nonce,
            deadline: unsigned.deadline,
        })
    }

    /// Swap `amount_tokens` of `token` back to the native currency.
    ///
    /// The router must already be approved to spend the tokens.
    #[instrument(skip(self, request), fields(external_id = %request.external_id, token = %request.token))]
    pub async fn sell(&self, request: SellRequest) -> SwapResult<SwapReceipt> {
        let wallet = self.wallet(&request.external_id)?;
        let amount = parse_amount(&request.amount_tokens)?;
        let slippage = self.slippage(request.slippage_bps)?;

        let key = self.vault.decrypt(&wallet.encrypted_wallet)?;
        let from = address_of(&key)?;
        let budget = self.budget();

        let decimals = token_decimals(self.client.as_ref(), request.token, &budget).await?;
        let amount_in = to_base_units(amount, decimals)?;
        let path = self.quotes.sell_path(request.token, &budget).await?;
        let expected_out = self.quotes.estimate_output(amount_in, &path, &budget).await?;
        // Must be recordable before anything is signed
        let native_out = native_decimal(expected_out)?;

        let (unsigned, tx_hash) = {
            let _guard = self.locks.acquire(from).await;
            let unsigned = self
                .builder
                .build_sell(amount_in, expected_out, slippage, &path, from, &budget)
                .await?;
            let tx_hash = self.submitter.sign_and_send(key, &unsigned, &budget).await?;
            (unsigned, tx_hash)
        };

        let record_id = self.record(NewTrade {
            user_id: wallet.user_id,
            tx_hash: tx_hash.clone(),
            token: request.token,
            amount_in_native: native_out,
            amount_token: amount_in,
            profit_target_percent: None,
            side: TradeSide::Sell,
        })?;

        Ok(SwapReceipt {
            record_id,
            tx_hash,
            side: TradeSide::Sell,
            from,
            token: request.token,
            amount_in,
            expected_out,
            amount_out_min: unsigned.amount_out_min,
            nonce: unsigned.nonce,
            deadline: unsigned.deadline,
        })
    }

    /// Let the router spend `amount` whole tokens, or an unlimited amount
    /// when `None`. Returns the approval transaction hash; approvals are
    /// not trades and are not recorded.
    #[instrument(skip(self))]
    pub async fn approve(
        &self,
        external_id: &str,
        token: Address,
        amount: Option<&str>,
    ) -> SwapResult<String> {
        let wallet = self.wallet(external_id)?;
        let amount = amount.map(parse_amount).transpose()?;

        let key = self.vault.decrypt(&wallet.encrypted_wallet)?;
        let from = address_of(&key)?;
        let budget = self.budget();

        let allowance = match amount {
            Some(amount) => {
                let decimals = token_decimals(self.client.as_ref(), token, &budget).await?;
                to_base_units(amount, decimals)?
            }
            None => U256::MAX,
        };

        let _guard = self.locks.acquire(from).await;
        let unsigned = self.builder.build_approval(token, allowance, from, &budget).await?;
        self.submitter.sign_and_send(key, &unsigned, &budget).await
    }

    /// Trades recorded for `external_id`, newest first
    pub fn trades(&self, external_id: &str) -> SwapResult<Vec<TradeRecord>> {
        let wallet = self.wallet(external_id)?;
        Ok(self.ledger.trades_for_user(wallet.user_id)?)
    }

    fn wallet(&self, external_id: &str) -> SwapResult<UserWallet> {
        self.ledger
            .find_wallet(external_id)?
            .ok_or_else(|| SwapError::NoWallet(external_id.to_string()))
    }

    fn slippage(&self, requested: Option<i64>) -> SwapResult<i64> {
        let bps = requested.unwrap_or(i64::from(self.execution.slippage_bps));
        SlippageBps::new(bps)?;
        Ok(bps)
    }

    /// Append the trade; the transaction is already on its way, so a failure
    /// here must not look like a rejected swap.
    fn record(&self, trade: NewTrade) -> SwapResult<i64> {
        self.ledger.record(&trade).map_err(|e| {
            error!(
                tx_hash = %trade.tx_hash,
                user_id = trade.user_id,
                side = %trade.side,
                "Broadcast transaction could not be recorded: {}",
                e
            );
            SwapError::BroadcastNotRecorded {
                tx_hash: trade.tx_hash.clone(),
                reason: e.to_string(),
            }
        })
    }
}

/// Wei as a decimal native amount for the ledger
fn native_decimal(wei: U256) -> SwapResult<Decimal> {
    to_decimal(wei, NATIVE_DECIMALS).ok_or_else(|| {
        warn!(%wei, "Native amount exceeds decimal range");
        SwapError::Quote(format!("native amount of {} wei is out of range", wei))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use std::time::Duration;

    use alloy::consensus::Transaction as _;
    use swap_core::{Passphrase, RejectionKind};
    use swap_executor::testing::MockChain;

    const KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";
    const OTHER_KEY: &str = "0x0000000000000000000000000000000000000000000000000000000000000001";
    const TOKEN: Address = Address::repeat_byte(0xaa);

    fn vault() -> KeyVault {
        KeyVault::new(Passphrase::new("test passphrase").unwrap()).with_iterations(1_000)
    }

    fn service_with(mock: Arc<MockChain>, ledger: TradeLedger) -> SwapService {
        ledger.migrate().unwrap();
        SwapService::new(
            mock,
            vault(),
            ledger,
            MockChain::CHAIN_ID,
            MockChain::ROUTER,
            ExecutionConfig::default(),
        )
    }

    fn service(mock: Arc<MockChain>) -> SwapService {
        service_with(mock, TradeLedger::open_in_memory().unwrap())
    }

    fn buy_request(amount: &str) -> BuyRequest {
        BuyRequest {
            external_id: "42".to_string(),
            token: TOKEN,
            amount_native: amount.to_string(),
            profit_target_percent: Some(100),
            slippage_bps: None,
        }
    }

    fn key(k: &str) -> Zeroizing<String> {
        Zeroizing::new(k.to_string())
    }

    #[tokio::test]
    async fn test_buy_without_wallet_touches_nothing() {
        let mock = Arc::new(MockChain::new());
        let svc = service(mock.clone());

        let err = svc.buy(buy_request("0.01")).await.unwrap_err();
        assert!(matches!(err, SwapError::NoWallet(ref id) if id == "42"));
        assert_eq!(mock.network_calls(), 0);
    }

    #[tokio::test]
    async fn test_buy_end_to_end() {
        let mock = Arc::new(MockChain::new());
        mock.set_quote(Some(U256::from(500_000_000_000_000_000u64)));
        let svc = service(mock.clone());
        let address = svc.register_wallet("42", key(KEY)).unwrap();

        let before = chrono::Utc::now().timestamp() as u64;
        let receipt = svc.buy(buy_request("0.01")).await.unwrap();
        let after = chrono::Utc::now().timestamp() as u64;

        assert_eq!(receipt.from, address);
        assert_eq!(receipt.amount_in, U256::from(10_000_000_000_000_000u64));
        assert_eq!(receipt.expected_out, U256::from(500_000_000_000_000_000u64));
        assert_eq!(receipt.amount_out_min, U256::from(485_000_000_000_000_000u64));
        assert_eq!(receipt.nonce, 0);
        assert!(receipt.deadline >= before + 300 && receipt.deadline <= after + 300);

        let sent = mock.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].value(), U256::from(10_000_000_000_000_000u64));
        assert_eq!(sent[0].to(), Some(MockChain::ROUTER));
        assert_eq!(sent[0].tx_hash().to_string(), receipt.tx_hash);

        let trades = svc.trades("42").unwrap();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].id, receipt.record_id);
        assert_eq!(trades[0].tx_hash, receipt.tx_hash);
        assert_eq!(trades[0].amount_in_native, Decimal::from_str("0.01").unwrap());
        assert_eq!(trades[0].profit_target_percent, Some(100));
        assert_eq!(trades[0].side, TradeSide::Buy);
        assert_eq!(trades[0].status, swap_core::TradeStatus::Pending);
    }

    #[tokio::test]
    async fn test_invalid_amounts_are_rejected_before_network() {
        let mock = Arc::new(MockChain::new());
        let svc = service(mock.clone());
        svc.register_wallet("42", key(KEY)).unwrap();

        for amount in ["0", "-1", "abc", "0.0000000000000000001"] {
            let err = svc.buy(buy_request(amount)).await.unwrap_err();
            assert!(matches!(err, SwapError::InvalidAmount(_)), "{}", amount);
        }
        assert_eq!(mock.network_calls(), 0);
    }

    #[tokio::test]
    async fn test_bad_slippage_is_rejected_before_network() {
        let mock = Arc::new(MockChain::new());
        let svc = service(mock.clone());
        svc.register_wallet("42", key(KEY)).unwrap();

        let mut request = buy_request("0.01");
        request.slippage_bps = Some(10_000);
        assert!(matches!(svc.buy(request).await, Err(SwapError::Config(_))));
        assert_eq!(mock.network_calls(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_buys_use_distinct_nonces() {
        let mock = Arc::new(MockChain::new());
        mock.set_nonce_delay(Duration::from_millis(50));
        let svc = Arc::new(service(mock.clone()));
        svc.register_wallet("42", key(KEY)).unwrap();

        let tasks: Vec<_> = (0..2)
            .map(|_| {
                let svc = Arc::clone(&svc);
                tokio::spawn(async move { svc.buy(buy_request("0.01")).await })
            })
            .collect();

        let mut nonces = Vec::new();
        for task in futures::future::join_all(tasks).await {
            nonces.push(task.unwrap().unwrap().nonce);
        }
        nonces.sort_unstable();

        assert_eq!(nonces, vec![0, 1]);
        assert_eq!(mock.observed_nonces(), vec![0, 1]);
        assert_eq!(mock.sent().len(), 2);
        assert_eq!(svc.trades("42").unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_record_failure_after_broadcast_is_distinct() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("db.sqlite");
        let mock = Arc::new(MockChain::new());
        let svc = service_with(mock.clone(), TradeLedger::open(&path).unwrap());
        svc.register_wallet("42", key(KEY)).unwrap();

        rusqlite::Connection::open(&path)
            .unwrap()
            .execute("DROP TABLE trades", [])
            .unwrap();

        let err = svc.buy(buy_request("0.01")).await.unwrap_err();
        let sent = mock.sent();
        assert_eq!(sent.len(), 1);
        match err {
            SwapError::BroadcastNotRecorded { ref tx_hash, .. } => {
                assert_eq!(*tx_hash, sent[0].tx_hash().to_string());
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(err.funds_moved());
    }

    #[tokio::test]
    async fn test_broadcast_rejection_records_nothing() {
        let mock = Arc::new(MockChain::new());
        mock.set_broadcast_error(Some("insufficient funds for gas * price + value"));
        let svc = service(mock.clone());
        svc.register_wallet("42", key(KEY)).unwrap();

        let err = svc.buy(buy_request("0.01")).await.unwrap_err();
        assert!(matches!(
            err,
            SwapError::Broadcast { kind: RejectionKind::InsufficientFunds, .. }
        ));
        assert!(svc.trades("42").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reverting_swap_is_never_signed() {
        let mock = Arc::new(MockChain::new());
        mock.set_gas_estimate(Err("execution reverted".to_string()));
        let svc = service(mock.clone());
        svc.register_wallet("42", key(KEY)).unwrap();

        let err = svc.buy(buy_request("0.01")).await.unwrap_err();
        assert!(matches!(err, SwapError::Build(_)));
        assert!(mock.sent().is_empty());
        assert!(svc.trades("42").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_pool_is_quote_error() {
        let mock = Arc::new(MockChain::new());
        mock.set_quote(None);
        let svc = service(mock.clone());
        svc.register_wallet("42", key(KEY)).unwrap();

        let err = svc.buy(buy_request("0.01")).await.unwrap_err();
        assert!(matches!(err, SwapError::Quote(_)));
        assert!(mock.sent().is_empty());
    }

    #[tokio::test]
    async fn test_register_overwrites_previous_key() {
        let mock = Arc::new(MockChain::new());
        let svc = service(mock.clone());

        let first = svc.register_wallet("42", key(KEY)).unwrap();
        let second = svc.register_wallet("42", key(OTHER_KEY)).unwrap();
        assert_ne!(first, second);

        let receipt = svc.buy(buy_request("0.01")).await.unwrap();
        assert_eq!(receipt.from, second);
    }

    #[test]
    fn test_register_rejects_invalid_key() {
        let svc = service(Arc::new(MockChain::new()));

        for bad in ["abc", &KEY[2..], "0x1234"] {
            let err = svc.register_wallet("42", key(bad)).unwrap_err();
            assert!(matches!(err, SwapError::InvalidKey(_)));
        }
        assert!(matches!(svc.trades("42"), Err(SwapError::NoWallet(_))));
    }

    #[tokio::test]
    async fn test_wrong_passphrase_is_vault_error() {
        let mock = Arc::new(MockChain::new());
        let ledger = TradeLedger::open_in_memory().unwrap();
        let svc = service_with(mock.clone(), ledger.clone());
        svc.register_wallet("42", key(KEY)).unwrap();

        let other = SwapService::new(
            mock.clone(),
            KeyVault::new(Passphrase::new("another passphrase").unwrap()).with_iterations(1_000),
            ledger,
            MockChain::CHAIN_ID,
            MockChain::ROUTER,
            ExecutionConfig::default(),
        );
        let err = other.buy(buy_request("0.01")).await.unwrap_err();
        assert!(matches!(err, SwapError::Vault(swap_core::VaultError::Decryption)));
        assert_eq!(mock.network_calls(), 0);
    }

    #[tokio::test]
    async fn test_sell_records_native_side() {
        let mock = Arc::new(MockChain::new());
        // 100 tokens quote to 2 native
        mock.set_quote(Some(U256::from(2_000_000_000_000_000_000u64)));
        let svc = service(mock.clone());
        svc.register_wallet("42", key(KEY)).unwrap();

        let receipt = svc
            .sell(SellRequest {
                external_id: "42".to_string(),
                token: TOKEN,
                amount_tokens: "100".to_string(),
                slippage_bps: Some(100),
            })
            .await
            .unwrap();

        let hundred = U256::from(100u64) * U256::from(10u64).pow(U256::from(18u64));
        assert_eq!(receipt.side, TradeSide::Sell);
        assert_eq!(receipt.amount_in, hundred);
        assert_eq!(receipt.amount_out_min, U256::from(1_980_000_000_000_000_000u64));
        assert_eq!(mock.sent()[0].value(), U256::ZERO);

        let trade = &svc.trades("42").unwrap()[0];
        assert_eq!(trade.side, TradeSide::Sell);
        assert_eq!(trade.amount_token, hundred);
        assert_eq!(trade.amount_in_native, Decimal::from(2));
        assert_eq!(trade.profit_target_percent, None);
    }

    #[tokio::test]
    async fn test_unrecordable_sell_output_is_never_signed() {
        let mock = Arc::new(MockChain::new());
        mock.set_quote(Some(U256::MAX));
        let svc = service(mock.clone());
        svc.register_wallet("42", key(KEY)).unwrap();

        let err = svc
            .sell(SellRequest {
                external_id: "42".to_string(),
                token: TOKEN,
                amount_tokens: "1".to_string(),
                slippage_bps: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, SwapError::Quote(_)));
        assert!(mock.sent().is_empty());
        assert!(mock.observed_nonces().is_empty());
        assert!(svc.trades("42").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_approve_is_not_a_trade() {
        let mock = Arc::new(MockChain::new());
        let svc = service(mock.clone());
        svc.register_wallet("42", key(KEY)).unwrap();

        let tx_hash = svc.approve("42", TOKEN, None).await.unwrap();
        let sent = mock.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to(), Some(TOKEN));
        assert_eq!(sent[0].tx_hash().to_string(), tx_hash);
        assert!(svc.trades("42").unwrap().is_empty());
    }
}
