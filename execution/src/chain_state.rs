//! Drives the ledgers block by block.
//!
//! ## Invariants
//! - Blocks are connected in height order with no gaps; reconnecting a height at or below the
//!   current one is a no-op.
//! - Each betting message is applied at its block's height or skipped with a [`Rejection`].
//!   Only storage failures abort a block, and they halt the instance for good.
//! - A block counts as connected once every ledger's tip reaches its height. Reopening rolls
//!   back writes from a block that never got there, so it can be connected again.

use crate::{
    config::ValidatedConfig,
    ledger::{Databases, Ledgers},
    liability::accept_bet,
    payout::{is_block_payouts_valid, PayoutEngine},
    state::State,
    Error, Rejection, StoreError,
};
use peerless_types::{
    betting::{
        is_betting_payload, BetRecord, ChainGamesEntry, ChainGamesRecord, Envelope,
        EventRecord, ExpectedPayout, LockedBet, Message, MessageType, COIN,
    },
    Block, Transaction,
};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Mutex,
};

/// What the host chain provides to the betting state.
pub trait Blockchain {
    fn transactions_at_height(&self, height: u64) -> anyhow::Result<Vec<Transaction>>;

    /// Trust check for oracle-only message kinds.
    fn is_authorized_oracle_sender(&self, tx: &Transaction) -> bool;

    /// Bets on `event_id` accepted at or below `height`, as returned in [`BlockReceipt`]s.
    fn bets_for_event(&self, event_id: u32, height: u64) -> anyhow::Result<Vec<LockedBet>>;

    fn chain_games_entries(
        &self,
        event_id: u32,
        height: u64,
    ) -> anyhow::Result<Vec<ChainGamesEntry>>;
}

/// Effects of connecting one block.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BlockReceipt {
    pub height: u64,
    pub applied: Vec<(u32, MessageType)>,
    pub locked_bets: Vec<LockedBet>,
    pub chain_games_entries: Vec<ChainGamesEntry>,
    pub rejections: Vec<(u32, Rejection)>,
}

enum ApplyError {
    Rejected(Rejection),
    Store(StoreError),
}

impl From<Rejection> for ApplyError {
    fn from(rejection: Rejection) -> Self {
        Self::Rejected(rejection)
    }
}

impl From<StoreError> for ApplyError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

/// Ledgers plus policy for one chain. Instances are independent of each other.
pub struct ChainState<S: State> {
    ledgers: Ledgers<S>,
    config: ValidatedConfig,
    height: Mutex<Option<u64>>,
    halted: AtomicBool,
}

impl<S: State> ChainState<S> {
    pub fn open(databases: Databases<S>, config: ValidatedConfig) -> Result<Self, Error> {
        let ledgers = Ledgers::open(databases, config.max_reorg_depth)?;
        let height = ledgers.recover()?;
        Ok(Self {
            ledgers,
            config,
            height: Mutex::new(height),
            halted: AtomicBool::new(false),
        })
    }

    pub fn ledgers(&self) -> &Ledgers<S> {
        &self.ledgers
    }

    pub fn config(&self) -> &ValidatedConfig {
        &self.config
    }

    pub fn payout_engine(&self) -> PayoutEngine<'_, S> {
        PayoutEngine::new(&self.ledgers, &self.config.payout)
    }

    /// Last connected height, if any.
    pub fn height(&self) -> Result<Option<u64>, Error> {
        let height = self.height.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(*height)
    }

    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::Acquire)
    }

    fn halt(&self, err: Error) -> Error {
        if err.is_fatal() {
            self.halted.store(true, Ordering::Release);
            tracing::error!(?err, "storage failure; halting betting state");
        }
        err
    }

    /// Decodes and applies every betting message in the block at `height`.
    pub fn connect_height(
        &self,
        height: u64,
        chain: &impl Blockchain,
    ) -> Result<BlockReceipt, Error> {
        if self.is_halted() {
            return Err(Error::Halted);
        }
        let mut current = self.height.lock().map_err(|_| StoreError::Poisoned)?;
        let mut receipt = BlockReceipt {
            height,
            ..BlockReceipt::default()
        };
        if let Some(current) = *current {
            if height <= current {
                tracing::debug!(height, current, "block already connected");
                return Ok(receipt);
            }
            if height != current + 1 {
                return Err(Error::HeightGap {
                    expected: current + 1,
                    got: height,
                });
            }
        }

        let transactions = chain
            .transactions_at_height(height)
            .map_err(Error::Collaborator)?;
        for (index, tx) in transactions.iter().enumerate() {
            let index = index as u32;
            if !is_betting_payload(&tx.payload) {
                continue;
            }
            let message = match Envelope::from_opcode(&tx.payload) {
                Ok(envelope) => envelope.message,
                Err(err) => {
                    tracing::debug!(height, tx = index, ?err, "dropped malformed betting message");
                    receipt.rejections.push((index, Rejection::Malformed(err)));
                    continue;
                }
            };
            let kind = message.message_type();
            if kind.requires_oracle() && !chain.is_authorized_oracle_sender(tx) {
                tracing::debug!(height, tx = index, ?kind, "dropped unauthorized oracle message");
                receipt
                    .rejections
                    .push((index, Rejection::UnauthorizedSender { kind }));
                continue;
            }
            match self.apply(height, index, tx, message, &mut receipt) {
                Ok(()) => receipt.applied.push((index, kind)),
                Err(ApplyError::Rejected(rejection)) => {
                    tracing::debug!(height, tx = index, ?kind, %rejection, "betting message rejected");
                    receipt.rejections.push((index, rejection));
                }
                Err(ApplyError::Store(err)) => return Err(self.halt(err.into())),
            }
        }
        if let Err(err) = self.ledgers.commit(height) {
            return Err(self.halt(err.into()));
        }

        *current = Some(height);
        tracing::debug!(
            height,
            applied = receipt.applied.len(),
            rejected = receipt.rejections.len(),
            "connected block"
        );
        Ok(receipt)
    }

    /// Rolls every ledger back to `height` after a reorg.
    pub fn disconnect_to(&self, height: u64) -> Result<(), Error> {
        if self.is_halted() {
            return Err(Error::Halted);
        }
        let mut current = self.height.lock().map_err(|_| StoreError::Poisoned)?;
        if let Err(err) = self.ledgers.rollback_to(height) {
            return Err(self.halt(err.into()));
        }
        if current.is_some_and(|current| current > height) {
            *current = Some(height);
        }
        Ok(())
    }

    /// Total and outputs the block at `height` must pay.
    pub fn get_block_payouts(
        &self,
        height: u64,
        chain: &impl Blockchain,
    ) -> Result<(u64, Vec<ExpectedPayout>), Error> {
        if self.is_halted() {
            return Err(Error::Halted);
        }
        self.payout_engine()
            .get_block_payouts(height, chain)
            .map_err(|err| self.halt(err))
    }

    /// True if `block` pays exactly what the ledgers say it owes.
    pub fn is_block_payouts_valid(&self, block: &Block, chain: &impl Blockchain) -> Result<bool, Error> {
        let (_, expected) = self.get_block_payouts(block.height, chain)?;
        Ok(is_block_payouts_valid(&expected, block))
    }

    fn apply(
        &self,
        height: u64,
        index: u32,
        tx: &Transaction,
        message: Message,
        receipt: &mut BlockReceipt,
    ) -> Result<(), ApplyError> {
        let ledgers = &self.ledgers;
        match message {
            Message::Mapping(mapping) => {
                if !ledgers.mappings.save(mapping, height)? {
                    return Err(Rejection::MalformedRecord.into());
                }
            }
            Message::Event(announcement) => {
                let record = match ledgers.events.current(announcement.event_id)? {
                    Some(existing) => existing.reannounce(&announcement),
                    None => EventRecord::from_message(&announcement),
                };
                ledgers.events.save(record, height)?;
            }
            Message::Bet(bet) => {
                let event = self.event(bet.event_id)?;
                let settled = ledgers.results.current(bet.event_id)?.is_some();
                let bet = BetRecord {
                    event_id: bet.event_id,
                    outcome: bet.outcome,
                    amount: tx.value,
                    script: tx.return_script.clone(),
                };
                let accepted = accept_bet(
                    &event,
                    settled,
                    &bet,
                    self.config.payout.odds_divisor,
                    height,
                    index,
                )?;
                ledgers.events.save(accepted.event, height)?;
                receipt.locked_bets.push(accepted.locked);
            }
            Message::Result(result) => {
                self.event(result.event_id)?;
                if let Some(prior) = ledgers.results.current(result.event_id)? {
                    tracing::warn!(
                        event_id = result.event_id,
                        ?prior,
                        ?result,
                        height,
                        "result replaced"
                    );
                }
                ledgers.results.save(result, height)?;
                tracing::info!(
                    event_id = result.event_id,
                    result_type = ?result.result_type,
                    home_score = result.home_score,
                    away_score = result.away_score,
                    height,
                    "result applied"
                );
            }
            Message::UpdateOdds(update) => {
                let mut event = self.event(update.event_id)?;
                event.moneyline = update.moneyline;
                ledgers.events.save(event, height)?;
            }
            Message::SpreadsEvent(spreads) => {
                let mut event = self.event(spreads.event_id)?;
                event.spread = spreads.market;
                ledgers.events.save(event, height)?;
            }
            Message::TotalsEvent(totals) => {
                let mut event = self.event(totals.event_id)?;
                event.totals = totals.market;
                ledgers.events.save(event, height)?;
            }
            Message::EventPatch(patch) => {
                let mut event = self.event(patch.event_id)?;
                event.start_time = patch.start_time;
                ledgers.events.save(event, height)?;
            }
            Message::ChainGamesEvent(game) => {
                let result_seed = ledgers
                    .chain_games
                    .current(game.event_id)?
                    .and_then(|existing| existing.result_seed);
                ledgers.chain_games.save(
                    ChainGamesRecord {
                        id: game.event_id,
                        entry_fee: game.entry_fee,
                        result_seed,
                    },
                    height,
                )?;
            }
            Message::ChainGamesBet(entry) => {
                let game = self.game(entry.event_id)?;
                if game.is_resolved() {
                    return Err(Rejection::EventSettled {
                        event_id: entry.event_id,
                    }
                    .into());
                }
                let expected = (game.entry_fee as u64).saturating_mul(COIN);
                if tx.value != expected {
                    return Err(Rejection::StakeMismatch {
                        expected,
                        got: tx.value,
                    }
                    .into());
                }
                receipt.chain_games_entries.push(ChainGamesEntry {
                    event_id: entry.event_id,
                    amount: tx.value,
                    script: tx.return_script.clone(),
                    height,
                    tx_index: index,
                });
            }
            Message::ChainGamesResult(closing) => {
                let mut game = self.game(closing.event_id)?;
                if game.is_resolved() {
                    return Err(Rejection::EventSettled {
                        event_id: closing.event_id,
                    }
                    .into());
                }
                game.result_seed = Some(tx.id);
                ledgers.chain_games.save(game, height)?;
            }
        }
        Ok(())
    }

    fn event(&self, event_id: u32) -> Result<EventRecord, ApplyError> {
        self.ledgers
            .events
            .current(event_id)?
            .ok_or(ApplyError::Rejected(Rejection::InvalidReference { event_id }))
    }

    fn game(&self, event_id: u32) -> Result<ChainGamesRecord, ApplyError> {
        self.ledgers
            .chain_games
            .current(event_id)?
            .ok_or(ApplyError::Rejected(Rejection::InvalidReference { event_id }))
    }
}
