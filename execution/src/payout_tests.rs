use crate::{
    mocks::{create_chain_state, create_config, MockChain, REWARD_SCRIPT},
    payout::{chain_games_winner, payouts_digest, settle, validate_block_payouts},
    ChainState, EventPhase, Memory, Rejection, Settlement,
};
use commonware_cryptography::{
    sha256::{Digest, Sha256},
    Hasher,
};
use peerless_types::{
    betting::{
        BetMessage, ChainGamesBetMessage, ChainGamesEventMessage, ChainGamesResultMessage,
        EventMessage, ExpectedPayout, LockedBet, Message, MoneylineOdds, OutcomeType, PayoutKind,
        ResultRecord, ResultType, SpreadMarket, SpreadsMessage, TotalsMarket, TotalsMessage, COIN,
    },
    Block, TxOut,
};

const ALICE: &[u8] = &[0xa1];
const BOB: &[u8] = &[0xb0];
const CAROL: &[u8] = &[0xc4];
const DAVE: &[u8] = &[0xd7];

fn event(event_id: u32, moneyline: MoneylineOdds) -> Message {
    Message::Event(EventMessage {
        event_id,
        start_time: 1_700_000_000,
        sport: 1,
        tournament: 2,
        stage: 0,
        home_team: 3,
        away_team: 4,
        moneyline,
    })
}

fn odds(home: u32, away: u32, draw: u32) -> MoneylineOdds {
    MoneylineOdds { home, away, draw }
}

fn bet(event_id: u32, outcome: OutcomeType) -> Message {
    Message::Bet(BetMessage { event_id, outcome })
}

fn result(event_id: u32, result_type: ResultType, home_score: u32, away_score: u32) -> Message {
    Message::Result(ResultRecord {
        event_id,
        result_type,
        home_score,
        away_score,
    })
}

fn payout(amount: u64, script: &[u8], original: u64, event_id: u32, kind: PayoutKind) -> ExpectedPayout {
    ExpectedPayout {
        amount,
        script: script.to_vec(),
        original_bet_amount: original,
        event_id,
        kind,
    }
}

/// Event at 1, a home win bet (100 at 150) and an away win bet (200 at 250) at 2.
fn moneyline_fixture() -> (ChainState<Memory>, MockChain) {
    let state = create_chain_state(create_config(100, 100));
    let mut chain = MockChain::new();
    let announce = chain.oracle_tx(&event(1, odds(150, 250, 300)));
    chain.connect(&state, 1, vec![announce]);
    let home = chain.bet_tx(ALICE, 100, &bet(1, OutcomeType::MoneyLineWin));
    let away = chain.bet_tx(BOB, 200, &bet(1, OutcomeType::MoneyLineLose));
    let receipt = chain.connect(&state, 2, vec![home, away]);
    assert_eq!(receipt.locked_bets.len(), 2);
    (state, chain)
}

#[test]
fn winning_bet_is_paid_in_the_following_block() {
    let (state, mut chain) = moneyline_fixture();
    let closing = chain.oracle_tx(&result(1, ResultType::Standard, 2, 1));
    chain.connect(&state, 3, vec![closing]);

    let (total, payouts) = state.get_block_payouts(4, &chain).unwrap();
    assert_eq!(
        payouts,
        vec![
            payout(150, ALICE, 100, 1, PayoutKind::Winnings),
            // 2.4% of the 300 settled, floored.
            payout(7, REWARD_SCRIPT, 300, 0, PayoutKind::OracleReward),
        ]
    );
    assert_eq!(total, 157);

    // Nothing is owed before or after the settling block.
    assert_eq!(state.get_block_payouts(3, &chain).unwrap(), (0, vec![]));
    assert_eq!(state.get_block_payouts(5, &chain).unwrap(), (0, vec![]));
    assert_eq!(state.get_block_payouts(0, &chain).unwrap(), (0, vec![]));
}

#[test]
fn closed_draw_market_refunds_its_bets() {
    let state = create_chain_state(create_config(100, 100));
    let mut chain = MockChain::new();
    let announce = chain.oracle_tx(&event(1, odds(150, 250, 0)));
    chain.connect(&state, 1, vec![announce]);
    let home = chain.bet_tx(ALICE, 100, &bet(1, OutcomeType::MoneyLineWin));
    let away = chain.bet_tx(BOB, 200, &bet(1, OutcomeType::MoneyLineLose));
    let draw = chain.bet_tx(CAROL, 50, &bet(1, OutcomeType::MoneyLineDraw));
    let receipt = chain.connect(&state, 2, vec![home, away, draw]);
    assert!(receipt.rejections.is_empty());
    assert_eq!(receipt.locked_bets[2].odds, 0);
    let tallies = state.ledgers().events.current(1).unwrap().unwrap().tallies;
    assert_eq!(tallies.get(OutcomeType::MoneyLineDraw).bets, 1);
    assert_eq!(tallies.get(OutcomeType::MoneyLineDraw).liability, 0);

    let closing = chain.oracle_tx(&result(1, ResultType::Standard, 2, 1));
    chain.connect(&state, 3, vec![closing]);

    let (total, payouts) = state.get_block_payouts(4, &chain).unwrap();
    assert_eq!(
        payouts,
        vec![
            payout(150, ALICE, 100, 1, PayoutKind::Winnings),
            payout(50, CAROL, 50, 1, PayoutKind::Refund),
            payout(7, REWARD_SCRIPT, 300, 0, PayoutKind::OracleReward),
        ]
    );
    assert_eq!(total, 207);
    assert!(!payouts.iter().any(|payout| payout.script == BOB.to_vec()));

    let block = Block {
        height: 4,
        transactions: vec![],
        payouts: vec![
            TxOut::new(7, REWARD_SCRIPT),
            TxOut::new(50, CAROL),
            TxOut::new(150, ALICE),
        ],
    };
    assert!(state.is_block_payouts_valid(&block, &chain).unwrap());
}

#[test]
fn block_payouts_must_match_exactly() {
    let (state, mut chain) = moneyline_fixture();
    let closing = chain.oracle_tx(&result(1, ResultType::Standard, 2, 1));
    chain.connect(&state, 3, vec![closing]);

    let block = |payouts: Vec<TxOut>| Block {
        height: 4,
        transactions: vec![],
        payouts,
    };
    let winner = TxOut::new(150, ALICE);
    let reward = TxOut::new(7, REWARD_SCRIPT);

    assert!(state
        .is_block_payouts_valid(&block(vec![winner.clone(), reward.clone()]), &chain)
        .unwrap());
    // Order does not matter.
    assert!(state
        .is_block_payouts_valid(&block(vec![reward.clone(), winner.clone()]), &chain)
        .unwrap());
    // Off by one unit.
    assert!(!state
        .is_block_payouts_valid(&block(vec![TxOut::new(149, ALICE), reward.clone()]), &chain)
        .unwrap());
    // Omitted output.
    assert!(!state
        .is_block_payouts_valid(&block(vec![winner.clone()]), &chain)
        .unwrap());
    // Extra output.
    assert!(!state
        .is_block_payouts_valid(
            &block(vec![winner.clone(), reward.clone(), TxOut::new(1, BOB)]),
            &chain
        )
        .unwrap());
    // Duplicated output.
    assert!(!state
        .is_block_payouts_valid(
            &block(vec![winner.clone(), winner.clone(), reward.clone()]),
            &chain
        )
        .unwrap());

    let (_, expected) = state.get_block_payouts(4, &chain).unwrap();
    let mismatch =
        validate_block_payouts(&expected, &[TxOut::new(149, ALICE), reward]).unwrap_err();
    assert_eq!(mismatch.missing, vec![winner]);
    assert_eq!(mismatch.unexpected, vec![TxOut::new(149, ALICE)]);

    // A block that owes nothing must pay nothing.
    let idle = Block {
        height: 5,
        ..Block::default()
    };
    assert!(state.is_block_payouts_valid(&idle, &chain).unwrap());
    let padded = Block {
        height: 5,
        transactions: vec![],
        payouts: vec![TxOut::new(1, BOB)],
    };
    assert!(!state.is_block_payouts_valid(&padded, &chain).unwrap());
}

#[test]
fn refund_result_returns_every_stake() {
    let (state, mut chain) = moneyline_fixture();
    let closing = chain.oracle_tx(&result(1, ResultType::EventRefund, 0, 0));
    chain.connect(&state, 3, vec![closing]);

    let (total, payouts) = state.get_block_payouts(4, &chain).unwrap();
    assert_eq!(
        payouts,
        vec![
            payout(100, ALICE, 100, 1, PayoutKind::Refund),
            payout(200, BOB, 200, 1, PayoutKind::Refund),
        ]
    );
    assert_eq!(total, 300);
}

#[test]
fn market_specific_refunds_refund_every_market() {
    for result_type in [
        ResultType::MoneyLineRefund,
        ResultType::SpreadsRefund,
        ResultType::TotalsRefund,
    ] {
        let (state, mut chain) = moneyline_fixture();
        let closing = chain.oracle_tx(&result(1, result_type, 3, 0));
        chain.connect(&state, 3, vec![closing]);
        let (total, payouts) = state.get_block_payouts(4, &chain).unwrap();
        assert_eq!(total, 300);
        assert!(payouts.iter().all(|p| p.kind == PayoutKind::Refund));
    }
}

#[test]
fn losing_bets_and_reward_only() {
    let (state, mut chain) = moneyline_fixture();
    // Draw: both moneyline sides lose.
    let closing = chain.oracle_tx(&result(1, ResultType::Standard, 1, 1));
    chain.connect(&state, 3, vec![closing]);
    let (total, payouts) = state.get_block_payouts(4, &chain).unwrap();
    assert_eq!(
        payouts,
        vec![payout(7, REWARD_SCRIPT, 300, 0, PayoutKind::OracleReward)]
    );
    assert_eq!(total, 7);
}

#[test]
fn spread_and_totals_settle_against_locked_points() {
    let state = create_chain_state(create_config(100, 100));
    let mut chain = MockChain::new();
    let announce = chain.oracle_tx(&event(1, odds(150, 250, 300)));
    let spreads = chain.oracle_tx(&Message::SpreadsEvent(SpreadsMessage {
        event_id: 1,
        market: SpreadMarket {
            points: 1,
            home_odds: 190,
            away_odds: 200,
        },
    }));
    let totals = chain.oracle_tx(&Message::TotalsEvent(TotalsMessage {
        event_id: 1,
        market: TotalsMarket {
            points: 3,
            over_odds: 180,
            under_odds: 210,
        },
    }));
    chain.connect(&state, 1, vec![announce, spreads, totals]);

    let home = chain.bet_tx(ALICE, 100, &bet(1, OutcomeType::SpreadHome));
    let over = chain.bet_tx(BOB, 100, &bet(1, OutcomeType::TotalOver));
    chain.connect(&state, 2, vec![home, over]);

    // Markets move after the bets were struck; settlement uses the locked values.
    let moved = chain.oracle_tx(&Message::SpreadsEvent(SpreadsMessage {
        event_id: 1,
        market: SpreadMarket {
            points: 5,
            home_odds: 400,
            away_odds: 110,
        },
    }));
    let closing = chain.oracle_tx(&result(1, ResultType::Standard, 3, 1));
    chain.connect(&state, 3, vec![moved, closing]);

    let (total, payouts) = state.get_block_payouts(4, &chain).unwrap();
    assert_eq!(
        payouts,
        vec![
            payout(190, ALICE, 100, 1, PayoutKind::Winnings),
            payout(180, BOB, 100, 1, PayoutKind::Winnings),
            payout(4, REWARD_SCRIPT, 200, 0, PayoutKind::OracleReward),
        ]
    );
    assert_eq!(total, 374);
}

fn locked(outcome: OutcomeType, odds: u32, points: u32) -> LockedBet {
    LockedBet {
        event_id: 1,
        outcome,
        amount: 100,
        odds,
        points,
        script: ALICE.to_vec(),
        height: 2,
        tx_index: 0,
    }
}

fn standard(home_score: u32, away_score: u32) -> ResultRecord {
    ResultRecord {
        event_id: 1,
        result_type: ResultType::Standard,
        home_score,
        away_score,
    }
}

#[test]
fn settle_pushes_refund() {
    // Spread push: 2 == 1 + 1.
    assert_eq!(
        settle(&locked(OutcomeType::SpreadHome, 190, 1), &standard(2, 1), 100),
        Settlement::Refund
    );
    assert_eq!(
        settle(&locked(OutcomeType::SpreadAway, 200, 1), &standard(2, 1), 100),
        Settlement::Refund
    );
    // Totals push: 2 + 1 == 3.
    assert_eq!(
        settle(&locked(OutcomeType::TotalUnder, 210, 3), &standard(2, 1), 100),
        Settlement::Refund
    );
    assert_eq!(
        settle(&locked(OutcomeType::SpreadAway, 200, 2), &standard(2, 1), 100),
        Settlement::Win(200)
    );
    assert_eq!(
        settle(&locked(OutcomeType::TotalUnder, 210, 4), &standard(2, 1), 100),
        Settlement::Win(210)
    );
    assert_eq!(
        settle(&locked(OutcomeType::TotalOver, 180, 4), &standard(2, 1), 100),
        Settlement::Lose
    );
    assert_eq!(
        settle(&locked(OutcomeType::MoneyLineDraw, 300, 0), &standard(1, 1), 100),
        Settlement::Win(300)
    );
    // Zero odds were never a real market.
    assert_eq!(
        settle(&locked(OutcomeType::MoneyLineDraw, 0, 0), &standard(1, 1), 100),
        Settlement::Refund
    );
}

#[test]
fn corrected_result_is_not_paid_again() {
    let (state, mut chain) = moneyline_fixture();
    let closing = chain.oracle_tx(&result(1, ResultType::Standard, 2, 1));
    chain.connect(&state, 3, vec![closing]);
    let correction = chain.oracle_tx(&result(1, ResultType::Standard, 1, 2));
    let receipt = chain.connect(&state, 4, vec![correction]);
    assert!(receipt.rejections.is_empty());

    assert_eq!(
        state.ledgers().results.current(1).unwrap().unwrap().away_score,
        2
    );
    assert_eq!(state.get_block_payouts(5, &chain).unwrap(), (0, vec![]));
}

#[test]
fn bets_after_settlement_are_rejected() {
    let (state, mut chain) = moneyline_fixture();
    let closing = chain.oracle_tx(&result(1, ResultType::Standard, 2, 1));
    chain.connect(&state, 3, vec![closing]);
    let late = chain.bet_tx(CAROL, 500, &bet(1, OutcomeType::MoneyLineWin));
    let receipt = chain.connect(&state, 4, vec![late]);
    assert!(receipt.locked_bets.is_empty());
    assert_eq!(
        receipt.rejections,
        vec![(0, Rejection::EventSettled { event_id: 1 })]
    );
}

#[test]
fn results_for_unknown_events_are_rejected() {
    let (state, mut chain) = moneyline_fixture();
    let stray = chain.oracle_tx(&result(42, ResultType::Standard, 2, 1));
    let receipt = chain.connect(&state, 3, vec![stray]);
    assert_eq!(
        receipt.rejections,
        vec![(0, Rejection::InvalidReference { event_id: 42 })]
    );
    assert_eq!(state.get_block_payouts(4, &chain).unwrap(), (0, vec![]));
}

#[test]
fn several_events_settle_in_id_order() {
    let state = create_chain_state(create_config(100, 100));
    let mut chain = MockChain::new();
    let second = chain.oracle_tx(&event(2, odds(200, 200, 0)));
    let first = chain.oracle_tx(&event(1, odds(150, 250, 300)));
    chain.connect(&state, 1, vec![second, first]);
    let on_second = chain.bet_tx(BOB, 50, &bet(2, OutcomeType::MoneyLineLose));
    let on_first = chain.bet_tx(ALICE, 100, &bet(1, OutcomeType::MoneyLineWin));
    chain.connect(&state, 2, vec![on_second, on_first]);
    let settle_second = chain.oracle_tx(&result(2, ResultType::Standard, 0, 1));
    let settle_first = chain.oracle_tx(&result(1, ResultType::Standard, 1, 0));
    chain.connect(&state, 3, vec![settle_second, settle_first]);

    let (_, payouts) = state.get_block_payouts(4, &chain).unwrap();
    assert_eq!(
        payouts,
        vec![
            payout(150, ALICE, 100, 1, PayoutKind::Winnings),
            payout(100, BOB, 50, 2, PayoutKind::Winnings),
            payout(3, REWARD_SCRIPT, 150, 0, PayoutKind::OracleReward),
        ]
    );
}

#[test]
fn payouts_digest_is_identical_across_nodes() {
    let build = || {
        let (state, mut chain) = moneyline_fixture();
        let closing = chain.oracle_tx(&result(1, ResultType::Standard, 2, 1));
        chain.connect(&state, 3, vec![closing]);
        state.get_block_payouts(4, &chain).unwrap().1
    };
    let first = build();
    let second = build();
    assert_eq!(payouts_digest(&first), payouts_digest(&second));

    let mut reversed = first.clone();
    reversed.reverse();
    assert_ne!(payouts_digest(&first), payouts_digest(&reversed));
    assert_ne!(payouts_digest(&first), payouts_digest(&[]));
}

#[test]
fn event_phase_tracks_lifecycle() {
    let (state, mut chain) = moneyline_fixture();
    let closing = chain.oracle_tx(&result(1, ResultType::Standard, 2, 1));
    chain.connect(&state, 3, vec![closing]);
    chain.connect(&state, 4, vec![]);

    let engine = state.payout_engine();
    assert_eq!(engine.event_phase(1, 1).unwrap(), Some(EventPhase::Open));
    assert_eq!(
        engine.event_phase(1, 2).unwrap(),
        Some(EventPhase::AwaitingResult)
    );
    assert_eq!(
        engine.event_phase(1, 3).unwrap(),
        Some(EventPhase::Resolved(ResultType::Standard))
    );
    assert_eq!(engine.event_phase(1, 4).unwrap(), Some(EventPhase::Paid));
    assert_eq!(engine.event_phase(9, 4).unwrap(), None);
}

fn chain_game_fixture(entrants: &[&[u8]]) -> (ChainState<Memory>, MockChain, Digest) {
    let state = create_chain_state(create_config(10_000, 100));
    let mut chain = MockChain::new();
    let open = chain.oracle_tx(&Message::ChainGamesEvent(ChainGamesEventMessage {
        event_id: 7,
        entry_fee: 1,
    }));
    chain.connect(&state, 1, vec![open]);

    let entries = entrants
        .iter()
        .map(|entrant| {
            chain.bet_tx(
                entrant,
                COIN,
                &Message::ChainGamesBet(ChainGamesBetMessage { event_id: 7 }),
            )
        })
        .collect();
    let receipt = chain.connect(&state, 2, entries);
    assert_eq!(receipt.chain_games_entries.len(), entrants.len());

    let close = chain.oracle_tx(&Message::ChainGamesResult(ChainGamesResultMessage {
        event_id: 7,
    }));
    let seed = close.id;
    chain.connect(&state, 3, vec![close]);
    (state, chain, seed)
}

#[test]
fn chain_game_pays_winner_and_fee() {
    let entrants: [&[u8]; 3] = [ALICE, BOB, CAROL];
    let (state, chain, seed) = chain_game_fixture(&entrants);

    let pot = 3 * COIN;
    let winner = entrants[chain_games_winner(&seed, 7, 3)];
    let (total, payouts) = state.get_block_payouts(4, &chain).unwrap();
    assert_eq!(
        payouts,
        vec![
            payout(pot * 800 / 1000, winner, COIN, 7, PayoutKind::ChainGamesPrize),
            payout(pot * 20 / 1000, REWARD_SCRIPT, 0, 0, PayoutKind::OracleReward),
        ]
    );
    assert_eq!(total, pot * 820 / 1000);
    assert_eq!(state.get_block_payouts(5, &chain).unwrap(), (0, vec![]));
}

#[test]
fn single_entry_chain_game_is_refunded() {
    let (state, chain, _) = chain_game_fixture(&[DAVE]);
    let (total, payouts) = state.get_block_payouts(4, &chain).unwrap();
    assert_eq!(payouts, vec![payout(COIN, DAVE, COIN, 7, PayoutKind::Refund)]);
    assert_eq!(total, COIN);
}

#[test]
fn chain_game_entries_are_checked() {
    let state = create_chain_state(create_config(10_000, 100));
    let mut chain = MockChain::new();
    let open = chain.oracle_tx(&Message::ChainGamesEvent(ChainGamesEventMessage {
        event_id: 7,
        entry_fee: 2,
    }));
    chain.connect(&state, 1, vec![open]);

    let enter = Message::ChainGamesBet(ChainGamesBetMessage { event_id: 7 });
    let short = chain.bet_tx(ALICE, COIN, &enter);
    let exact = chain.bet_tx(BOB, 2 * COIN, &enter);
    let unknown = chain.bet_tx(
        CAROL,
        2 * COIN,
        &Message::ChainGamesBet(ChainGamesBetMessage { event_id: 8 }),
    );
    let receipt = chain.connect(&state, 2, vec![short, exact, unknown]);
    assert_eq!(receipt.chain_games_entries.len(), 1);
    assert_eq!(receipt.chain_games_entries[0].script, BOB.to_vec());
    assert_eq!(
        receipt.rejections,
        vec![
            (
                0,
                Rejection::StakeMismatch {
                    expected: 2 * COIN,
                    got: COIN
                }
            ),
            (2, Rejection::InvalidReference { event_id: 8 }),
        ]
    );

    let close = Message::ChainGamesResult(ChainGamesResultMessage { event_id: 7 });
    let first = chain.oracle_tx(&close);
    let seed = first.id;
    let second = chain.oracle_tx(&close);
    let receipt = chain.connect(&state, 3, vec![first, second]);
    assert_eq!(
        receipt.rejections,
        vec![(1, Rejection::EventSettled { event_id: 7 })]
    );
    assert_eq!(
        state.ledgers().chain_games.current(7).unwrap().unwrap().result_seed,
        Some(seed)
    );

    let late = chain.bet_tx(DAVE, 2 * COIN, &enter);
    let receipt = chain.connect(&state, 4, vec![late]);
    assert_eq!(
        receipt.rejections,
        vec![(0, Rejection::EventSettled { event_id: 7 })]
    );
}

#[test]
fn winner_index_is_deterministic_and_in_range() {
    let seed = Sha256::hash(b"closing tx");
    for entries in 1..20 {
        let index = chain_games_winner(&seed, 7, entries);
        assert!(index < entries);
        assert_eq!(index, chain_games_winner(&seed, 7, entries));
    }
    assert_eq!(chain_games_winner(&seed, 7, 1), 0);
}
