use crate::{
    chain_state::{BlockReceipt, Blockchain, ChainState},
    config::{Config, ValidatedConfig},
    ledger::Databases,
    state::{Memory, State, Status},
};
use anyhow::{anyhow, Result};
use commonware_cryptography::{sha256::Sha256, Hasher};
use peerless_types::{
    betting::{ChainGamesEntry, LockedBet, Message},
    Script, Transaction,
};
use std::{
    collections::BTreeMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
};

/// Script the mock chain treats as the authorized oracle.
pub const ORACLE_SCRIPT: &[u8] = &[0x51, 0x0a];

/// Script the oracle reward is paid to in test configs.
pub const REWARD_SCRIPT: &[u8] = &[0x52, 0x0b];

/// Test config with the given odds divisor and rollback depth.
pub fn create_config(odds_divisor: u32, max_reorg_depth: u64) -> ValidatedConfig {
    let mut config = Config::new(REWARD_SCRIPT.to_vec());
    config.odds_divisor = odds_divisor;
    config.max_reorg_depth = max_reorg_depth;
    config.validate().expect("valid test config")
}

/// Chain state over fresh in-memory databases.
pub fn create_chain_state(config: ValidatedConfig) -> ChainState<Memory> {
    ChainState::open(Databases::memory(), config).expect("open chain state")
}

/// In-memory host chain. Indexes the bets and entries reported in receipts, like a node would.
#[derive(Clone, Default)]
pub struct MockChain {
    blocks: BTreeMap<u64, Vec<Transaction>>,
    bets: Vec<LockedBet>,
    entries: Vec<ChainGamesEntry>,
    nonce: u64,
    fail_queries: bool,
}

impl MockChain {
    pub fn new() -> Self {
        Self::default()
    }

    fn transaction(&mut self, sender: Script, value: u64, payload: Vec<u8>, return_script: Script) -> Transaction {
        self.nonce += 1;
        Transaction {
            id: Sha256::hash(&self.nonce.to_be_bytes()),
            sender,
            value,
            payload,
            return_script,
        }
    }

    pub fn oracle_tx(&mut self, message: &Message) -> Transaction {
        let payload = message.to_opcode().expect("encodable message");
        self.transaction(ORACLE_SCRIPT.to_vec(), 0, payload, ORACLE_SCRIPT.to_vec())
    }

    /// A transaction staking `value` from `bettor`, who is also paid any winnings.
    pub fn bet_tx(&mut self, bettor: &[u8], value: u64, message: &Message) -> Transaction {
        let payload = message.to_opcode().expect("encodable message");
        self.transaction(bettor.to_vec(), value, payload, bettor.to_vec())
    }

    pub fn raw_tx(&mut self, sender: &[u8], value: u64, payload: Vec<u8>) -> Transaction {
        self.transaction(sender.to_vec(), value, payload, sender.to_vec())
    }

    pub fn push_block(&mut self, height: u64, transactions: Vec<Transaction>) {
        self.blocks.insert(height, transactions);
    }

    pub fn record(&mut self, receipt: &BlockReceipt) {
        self.bets.extend(receipt.locked_bets.iter().cloned());
        self.entries
            .extend(receipt.chain_games_entries.iter().cloned());
    }

    /// Pushes a block, connects it and indexes the receipt.
    pub fn connect<S: State>(
        &mut self,
        state: &ChainState<S>,
        height: u64,
        transactions: Vec<Transaction>,
    ) -> BlockReceipt {
        self.push_block(height, transactions);
        let receipt = state
            .connect_height(height, &*self)
            .expect("connect block");
        self.record(&receipt);
        receipt
    }

    /// Forgets every block, bet and entry above `height`.
    pub fn truncate(&mut self, height: u64) {
        self.blocks.retain(|at, _| *at <= height);
        self.bets.retain(|bet| bet.height <= height);
        self.entries.retain(|entry| entry.height <= height);
    }

    pub fn fail_queries(&mut self, fail: bool) {
        self.fail_queries = fail;
    }
}

impl Blockchain for MockChain {
    fn transactions_at_height(&self, height: u64) -> Result<Vec<Transaction>> {
        if self.fail_queries {
            return Err(anyhow!("chain unavailable"));
        }
        Ok(self.blocks.get(&height).cloned().unwrap_or_default())
    }

    fn is_authorized_oracle_sender(&self, tx: &Transaction) -> bool {
        tx.sender == ORACLE_SCRIPT
    }

    fn bets_for_event(&self, event_id: u32, height: u64) -> Result<Vec<LockedBet>> {
        if self.fail_queries {
            return Err(anyhow!("chain unavailable"));
        }
        Ok(self
            .bets
            .iter()
            .filter(|bet| bet.event_id == event_id && bet.height <= height)
            .cloned()
            .collect())
    }

    fn chain_games_entries(&self, event_id: u32, height: u64) -> Result<Vec<ChainGamesEntry>> {
        if self.fail_queries {
            return Err(anyhow!("chain unavailable"));
        }
        Ok(self
            .entries
            .iter()
            .filter(|entry| entry.event_id == event_id && entry.height <= height)
            .cloned()
            .collect())
    }
}

/// Memory-backed engine whose writes can be made to fail. Clones share state.
#[derive(Clone, Default)]
pub struct FailingState {
    inner: Arc<Mutex<Memory>>,
    fail_writes: Arc<AtomicBool>,
}

impl FailingState {
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(anyhow!("injected write failure"));
        }
        Ok(())
    }

    fn memory(&self) -> Result<std::sync::MutexGuard<'_, Memory>> {
        self.inner
            .lock()
            .map_err(|_| anyhow!("failing state lock poisoned"))
    }
}

impl State for FailingState {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.memory()?.get(key)
    }

    fn insert(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<()> {
        self.check()?;
        self.memory()?.insert(key, value)
    }

    fn delete(&mut self, key: &[u8]) -> Result<()> {
        self.check()?;
        self.memory()?.delete(key)
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        self.memory()?.scan_prefix(prefix)
    }

    fn apply(&mut self, changes: Vec<(Vec<u8>, Status)>) -> Result<()> {
        self.check()?;
        self.memory()?.apply(changes)
    }
}
