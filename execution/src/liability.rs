//! Liability bookkeeping for accepted bets.
//!
//! Odds are fixed-point integers scaled by `divisor`: with a divisor of 10_000, odds of
//! 15_000 pay 1.5x the stake. All arithmetic is integer and widened to `u128`.

use crate::Rejection;
use peerless_types::betting::{BetRecord, EventRecord, LockedBet};

/// Gross amount paid to a winning bet (stake included).
pub fn payout_amount(stake: u64, odds: u32, divisor: u32) -> u64 {
    if divisor == 0 {
        return 0;
    }
    let amount = stake as u128 * odds as u128 / divisor as u128;
    u64::try_from(amount).unwrap_or(u64::MAX)
}

/// Profit owed if a bet wins: `stake × (odds − divisor) / divisor`, zero for odds at or below even.
pub fn potential_liability(stake: u64, odds: u32, divisor: u32) -> u64 {
    if divisor == 0 {
        return 0;
    }
    let edge = odds.saturating_sub(divisor) as u128;
    let amount = stake as u128 * edge / divisor as u128;
    u64::try_from(amount).unwrap_or(u64::MAX)
}

/// Outcome of applying a bet: the next event version and the bet as it was struck.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AcceptedBet {
    pub event: EventRecord,
    pub locked: LockedBet,
}

/// Applies `bet` to `event`, snapshotting the current odds and handicap.
///
/// `settled` reports whether the event already has a result; bets on settled events are
/// rejected. Zero odds are accepted with no liability and are refunded at settlement.
pub fn accept_bet(
    event: &EventRecord,
    settled: bool,
    bet: &BetRecord,
    divisor: u32,
    height: u64,
    tx_index: u32,
) -> Result<AcceptedBet, Rejection> {
    if event.id != bet.event_id {
        return Err(Rejection::InvalidReference {
            event_id: bet.event_id,
        });
    }
    if settled {
        return Err(Rejection::EventSettled {
            event_id: bet.event_id,
        });
    }

    let odds = event.odds(bet.outcome);
    let points = event.points(bet.outcome);
    let mut next = event.clone();
    let tally = next.tallies.get_mut(bet.outcome);
    tally.bets = tally.bets.saturating_add(1);
    tally.liability = tally
        .liability
        .saturating_add(potential_liability(bet.amount, odds, divisor));

    Ok(AcceptedBet {
        event: next,
        locked: LockedBet {
            event_id: bet.event_id,
            outcome: bet.outcome,
            amount: bet.amount,
            odds,
            points,
            script: bet.script.clone(),
            height,
            tx_index,
        },
    })
}
