//! Deterministic payout computation and block payout validation.
//!
//! ## Ordering
//! Expected payouts are emitted by ascending event id, bets within an event by
//! `(height, tx_index)`, chain games prizes after sports payouts, and the oracle reward last.
//! Every node derives the same list, so [`payouts_digest`] is stable across nodes.

use crate::{
    chain_state::Blockchain, config::PayoutPolicy, ledger::Ledgers, liability::payout_amount,
    state::State, Error, PayoutMismatch,
};
use commonware_codec::Encode;
use commonware_cryptography::{
    sha256::{Digest, Sha256},
    Hasher,
};
use peerless_types::{
    betting::{
        ChainGamesRecord, ExpectedPayout, LockedBet, OutcomeType, PayoutKind, ResultRecord,
        ResultType, WinnerType, PERMILLE,
    },
    Block, TxOut,
};
use std::collections::BTreeMap;

/// How a single bet settles against a result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Settlement {
    /// Gross payout, stake included.
    Win(u64),
    Lose,
    Refund,
}

/// Settles `bet` against `result` using the odds and points locked when it was placed.
pub fn settle(bet: &LockedBet, result: &ResultRecord, divisor: u32) -> Settlement {
    if result.result_type.is_refund() || bet.odds == 0 {
        return Settlement::Refund;
    }
    let home = result.home_score as u64;
    let away = result.away_score as u64;
    let points = bet.points as u64;

    let won = match bet.outcome {
        OutcomeType::MoneyLineWin => WinnerType::from_scores(home, away) == WinnerType::HomeWin,
        OutcomeType::MoneyLineLose => WinnerType::from_scores(home, away) == WinnerType::AwayWin,
        OutcomeType::MoneyLineDraw => WinnerType::from_scores(home, away) == WinnerType::Push,
        OutcomeType::SpreadHome | OutcomeType::SpreadAway => {
            match WinnerType::from_scores(home, away + points) {
                WinnerType::Push => return Settlement::Refund,
                WinnerType::HomeWin => bet.outcome == OutcomeType::SpreadHome,
                WinnerType::AwayWin => bet.outcome == OutcomeType::SpreadAway,
            }
        }
        OutcomeType::TotalOver | OutcomeType::TotalUnder => {
            match WinnerType::from_scores(home + away, points) {
                WinnerType::Push => return Settlement::Refund,
                WinnerType::HomeWin => bet.outcome == OutcomeType::TotalOver,
                WinnerType::AwayWin => bet.outcome == OutcomeType::TotalUnder,
            }
        }
    };
    if won {
        Settlement::Win(payout_amount(bet.amount, bet.odds, divisor))
    } else {
        Settlement::Lose
    }
}

/// Lifecycle of an event as seen at a height.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventPhase {
    Open,
    AwaitingResult,
    /// The result became authoritative at this height; payouts are due.
    Resolved(ResultType),
    Paid,
}

/// Index of the winning entry: the first 8 bytes of `sha256(seed || event_id)`, modulo `entries`.
pub fn chain_games_winner(seed: &Digest, event_id: u32, entries: usize) -> usize {
    let mut hasher = Sha256::new();
    hasher.update(seed.as_ref());
    hasher.update(&event_id.to_be_bytes());
    let digest = hasher.finalize();
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest.0[..8]);
    (u64::from_be_bytes(prefix) % entries.max(1) as u64) as usize
}

fn share(amount: u64, permille: u64) -> u64 {
    let value = amount as u128 * permille as u128 / PERMILLE as u128;
    u64::try_from(value).unwrap_or(u64::MAX)
}

/// Reads ledger state and turns newly authoritative results into expected outputs.
pub struct PayoutEngine<'a, S: State> {
    ledgers: &'a Ledgers<S>,
    policy: &'a PayoutPolicy,
}

impl<'a, S: State> PayoutEngine<'a, S> {
    pub fn new(ledgers: &'a Ledgers<S>, policy: &'a PayoutPolicy) -> Self {
        Self { ledgers, policy }
    }

    fn results_at(&self, height: u64) -> Result<BTreeMap<u32, ResultRecord>, Error> {
        self.ledgers
            .results
            .snapshot(height)?
            .ok_or(Error::NotFound { height })
    }

    fn results_before(&self, height: u64) -> Result<BTreeMap<u32, ResultRecord>, Error> {
        match height.checked_sub(1) {
            Some(prior) => self.results_at(prior),
            None => Ok(BTreeMap::new()),
        }
    }

    fn games_at(&self, height: u64) -> Result<BTreeMap<u32, ChainGamesRecord>, Error> {
        self.ledgers
            .chain_games
            .snapshot(height)?
            .ok_or(Error::NotFound { height })
    }

    /// Payouts owed for results that became authoritative exactly at `height`.
    pub fn compute_expected_payouts(
        &self,
        height: u64,
        chain: &impl Blockchain,
    ) -> Result<Vec<ExpectedPayout>, Error> {
        let results = self.results_at(height)?;
        let previous = self.results_before(height)?;
        let divisor = self.policy.odds_divisor;

        let mut payouts = Vec::new();
        let mut settled_volume: u64 = 0;
        for (event_id, result) in &results {
            match previous.get(event_id) {
                None => {}
                Some(prior) if prior != result => {
                    tracing::warn!(
                        event_id,
                        ?prior,
                        ?result,
                        height,
                        "result corrected after settlement; not paid again"
                    );
                    continue;
                }
                Some(_) => continue,
            }

            let mut bets = chain
                .bets_for_event(*event_id, height)
                .map_err(Error::Collaborator)?;
            bets.sort_by_key(|bet| (bet.height, bet.tx_index));
            let before = payouts.len();
            for bet in &bets {
                let (amount, kind) = match settle(bet, result, divisor) {
                    Settlement::Win(amount) => {
                        settled_volume = settled_volume.saturating_add(bet.amount);
                        (amount, PayoutKind::Winnings)
                    }
                    Settlement::Lose => {
                        settled_volume = settled_volume.saturating_add(bet.amount);
                        continue;
                    }
                    Settlement::Refund => (bet.amount, PayoutKind::Refund),
                };
                if amount == 0 {
                    continue;
                }
                payouts.push(ExpectedPayout {
                    amount,
                    script: bet.script.clone(),
                    original_bet_amount: bet.amount,
                    event_id: *event_id,
                    kind,
                });
            }
            tracing::info!(
                event_id,
                height,
                result_type = ?result.result_type,
                bets = bets.len(),
                payouts = payouts.len() - before,
                "settled event"
            );
        }

        let fees = self.chain_games_payouts(height, chain, &mut payouts)?;
        let reward = share(settled_volume, self.policy.oracle_reward_permille).saturating_add(fees);
        if reward > 0 {
            payouts.push(ExpectedPayout {
                amount: reward,
                script: self.policy.oracle_reward_script.clone(),
                original_bet_amount: settled_volume,
                event_id: 0,
                kind: PayoutKind::OracleReward,
            });
        }
        Ok(payouts)
    }

    /// Appends prizes for chain games resolved at `height` and returns the fees they owe.
    fn chain_games_payouts(
        &self,
        height: u64,
        chain: &impl Blockchain,
        payouts: &mut Vec<ExpectedPayout>,
    ) -> Result<u64, Error> {
        let games = self.games_at(height)?;
        let previous = match height.checked_sub(1) {
            Some(prior) => self.games_at(prior)?,
            None => BTreeMap::new(),
        };

        let mut fees: u64 = 0;
        for (event_id, game) in &games {
            let Some(seed) = &game.result_seed else {
                continue;
            };
            if previous.get(event_id).is_some_and(ChainGamesRecord::is_resolved) {
                continue;
            }

            let mut entries = chain
                .chain_games_entries(*event_id, height)
                .map_err(Error::Collaborator)?;
            entries.sort_by_key(|entry| (entry.height, entry.tx_index));
            match entries.as_slice() {
                [] => {}
                [only] => payouts.push(ExpectedPayout {
                    amount: only.amount,
                    script: only.script.clone(),
                    original_bet_amount: only.amount,
                    event_id: *event_id,
                    kind: PayoutKind::Refund,
                }),
                _ => {
                    let pot = entries
                        .iter()
                        .fold(0u64, |pot, entry| pot.saturating_add(entry.amount));
                    let winner = &entries[chain_games_winner(seed, *event_id, entries.len())];
                    let prize = share(pot, self.policy.chain_games_winner_permille);
                    fees = fees.saturating_add(share(pot, self.policy.chain_games_fee_permille));
                    tracing::info!(
                        event_id,
                        height,
                        entries = entries.len(),
                        pot,
                        prize,
                        "chain game drawn"
                    );
                    if prize > 0 {
                        payouts.push(ExpectedPayout {
                            amount: prize,
                            script: winner.script.clone(),
                            original_bet_amount: winner.amount,
                            event_id: *event_id,
                            kind: PayoutKind::ChainGamesPrize,
                        });
                    }
                }
            }
        }
        Ok(fees)
    }

    /// Outputs the block at `height` must pay: the settlement of results applied at `height - 1`.
    pub fn get_block_payouts(
        &self,
        height: u64,
        chain: &impl Blockchain,
    ) -> Result<(u64, Vec<ExpectedPayout>), Error> {
        let Some(settled_at) = height.checked_sub(1) else {
            return Ok((0, Vec::new()));
        };
        let payouts = self.compute_expected_payouts(settled_at, chain)?;
        let total = payouts
            .iter()
            .fold(0u64, |total, payout| total.saturating_add(payout.amount));
        Ok((total, payouts))
    }

    /// Phase of `event_id` at `height`, or `None` if the event does not exist there.
    pub fn event_phase(&self, event_id: u32, height: u64) -> Result<Option<EventPhase>, Error> {
        let events = self
            .ledgers
            .events
            .snapshot(height)?
            .ok_or(Error::NotFound { height })?;
        let Some(event) = events.get(&event_id) else {
            return Ok(None);
        };
        if self.results_before(height)?.contains_key(&event_id) {
            return Ok(Some(EventPhase::Paid));
        }
        if let Some(result) = self.results_at(height)?.get(&event_id) {
            return Ok(Some(EventPhase::Resolved(result.result_type)));
        }
        if event.tallies.total_bets() > 0 {
            return Ok(Some(EventPhase::AwaitingResult));
        }
        Ok(Some(EventPhase::Open))
    }
}

/// Checks that `actual` pays exactly the multiset of `(amount, script)` pairs in `expected`.
pub fn validate_block_payouts(
    expected: &[ExpectedPayout],
    actual: &[TxOut],
) -> Result<(), PayoutMismatch> {
    let mut balance: BTreeMap<TxOut, i64> = BTreeMap::new();
    for payout in expected {
        *balance.entry(payout.output()).or_default() += 1;
    }
    for output in actual {
        *balance.entry(output.clone()).or_default() -= 1;
    }

    let mut mismatch = PayoutMismatch::default();
    for (output, count) in balance {
        for _ in 0..count.unsigned_abs() {
            if count > 0 {
                mismatch.missing.push(output.clone());
            } else {
                mismatch.unexpected.push(output.clone());
            }
        }
    }
    if mismatch.missing.is_empty() && mismatch.unexpected.is_empty() {
        return Ok(());
    }
    tracing::debug!(
        missing = mismatch.missing.len(),
        unexpected = mismatch.unexpected.len(),
        "block payouts rejected"
    );
    Err(mismatch)
}

pub fn is_block_payouts_valid(expected: &[ExpectedPayout], block: &Block) -> bool {
    validate_block_payouts(expected, &block.payouts).is_ok()
}

/// SHA-256 over the encoded, ordered payout list.
pub fn payouts_digest(payouts: &[ExpectedPayout]) -> Digest {
    let mut hasher = Sha256::new();
    hasher.update(&(payouts.len() as u64).to_be_bytes());
    for payout in payouts {
        hasher.update(payout.encode().as_ref());
    }
    hasher.finalize()
}
