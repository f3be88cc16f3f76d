use super::*;
use commonware_codec::{DecodeExt, Encode, FixedSize, ReadExt};
use commonware_cryptography::{sha256::Sha256, Hasher};
use proptest::prelude::*;

fn sample_event(event_id: u32) -> EventMessage {
    EventMessage {
        event_id,
        start_time: 1_700_000_000,
        sport: 1,
        tournament: 7,
        stage: 2,
        home_team: 10,
        away_team: 11,
        moneyline: MoneylineOdds {
            home: 15_000,
            away: 25_000,
            draw: 0,
        },
    }
}

#[test]
fn test_outcome_type_roundtrip() {
    for outcome in OutcomeType::ALL {
        let encoded = outcome.encode();
        let decoded = OutcomeType::read(&mut &encoded[..]).unwrap();
        assert_eq!(outcome, decoded);
    }
    assert!(OutcomeType::from_u8(0).is_none());
    assert!(OutcomeType::from_u8(8).is_none());
}

#[test]
fn test_mapping_kind_names() {
    for kind in MappingKind::ALL {
        assert_eq!(MappingKind::from_name(kind.as_str()), Some(kind));
    }
    assert_eq!(MappingKind::from_name("leagues"), None);
}

#[test]
fn test_event_record_storage_roundtrip() {
    let mut record = EventRecord::from_message(&sample_event(42));
    record.spread = SpreadMarket {
        points: 3,
        home_odds: 19_000,
        away_odds: 21_000,
    };
    record.tallies.get_mut(OutcomeType::SpreadAway).bets = 4;
    record.tallies.get_mut(OutcomeType::SpreadAway).liability = 1_100;

    let encoded = record.encode();
    assert_eq!(encoded.len(), EventRecord::SIZE);
    let decoded = EventRecord::decode(encoded).unwrap();
    assert_eq!(record, decoded);
}

#[test]
fn test_mapping_and_result_storage_roundtrip() {
    let mapping = MappingRecord::new(MappingKind::Team, 9, "Arsenal");
    assert_eq!(MappingRecord::decode(mapping.encode()).unwrap(), mapping);

    let result = ResultRecord {
        event_id: 3,
        result_type: ResultType::SpreadsRefund,
        home_score: 0,
        away_score: u32::MAX,
    };
    assert_eq!(ResultRecord::decode(result.encode()).unwrap(), result);
}

#[test]
fn test_chain_games_record_roundtrip() {
    let open = ChainGamesRecord {
        id: 5,
        entry_fee: 10,
        result_seed: None,
    };
    assert_eq!(ChainGamesRecord::decode(open.encode()).unwrap(), open);
    assert!(!open.is_resolved());

    let closed = ChainGamesRecord {
        result_seed: Some(Sha256::hash(b"result tx")),
        ..open
    };
    assert_eq!(ChainGamesRecord::decode(closed.encode()).unwrap(), closed);
    assert!(closed.is_resolved());
}

#[test]
fn test_reannounce_keeps_markets_and_tallies() {
    let mut record = EventRecord::from_message(&sample_event(1));
    record.totals = TotalsMarket {
        points: 25,
        over_odds: 18_000,
        under_odds: 20_000,
    };
    record.tallies.get_mut(OutcomeType::MoneyLineWin).bets = 2;

    let mut update = sample_event(1);
    update.start_time += 3_600;
    update.moneyline.draw = 33_000;
    let next = record.reannounce(&update);

    assert_eq!(next.start_time, update.start_time);
    assert_eq!(next.moneyline.draw, 33_000);
    assert_eq!(next.totals, record.totals);
    assert_eq!(next.tallies, record.tallies);
}

#[test]
fn test_bet_wire_layout() {
    let payload = Message::Bet(BetMessage {
        event_id: 0x0102,
        outcome: OutcomeType::TotalOver,
    })
    .to_opcode()
    .unwrap();
    assert_eq!(payload, vec![0x42, 0x01, 0x03, 0x02, 0x01, 0x00, 0x00, 0x06]);
    assert!(is_betting_payload(&payload));
    assert_eq!(peek_message_type(&payload), Some(MessageType::Bet));
}

#[test]
fn test_boundary_values_roundtrip() {
    let messages = vec![
        Message::Event(EventMessage {
            event_id: u32::MAX,
            start_time: u64::MAX,
            sport: u32::MAX,
            tournament: 0,
            stage: 0,
            home_team: u32::MAX,
            away_team: 0,
            moneyline: MoneylineOdds {
                home: u32::MAX,
                away: 0,
                draw: u32::MAX,
            },
        }),
        Message::Result(ResultRecord {
            event_id: 0,
            result_type: ResultType::Standard,
            home_score: u32::MAX,
            away_score: 0,
        }),
        Message::EventPatch(EventPatchMessage {
            event_id: u32::MAX,
            start_time: 0,
        }),
        Message::Mapping(MappingRecord::new(
            MappingKind::Tournament,
            u32::MAX,
            "x".repeat(MAX_MAPPING_NAME_LENGTH),
        )),
        Message::Mapping(MappingRecord::new(MappingKind::Sport, 0, "")),
    ];
    for message in messages {
        let payload = message.to_opcode().unwrap();
        let envelope = Envelope::from_opcode(&payload).unwrap();
        assert_eq!(envelope.version, MESSAGE_VERSION);
        assert_eq!(envelope.message, message);
    }
}

#[test]
fn test_encode_rejects_unsupported_version_and_long_names() {
    let envelope = Envelope {
        version: 2,
        message: Message::ChainGamesBet(ChainGamesBetMessage { event_id: 1 }),
    };
    assert_eq!(envelope.to_opcode(), Err(CodecError::UnsupportedVersion(2)));

    let long = Message::Mapping(MappingRecord::new(
        MappingKind::Team,
        1,
        "x".repeat(MAX_MAPPING_NAME_LENGTH + 1),
    ));
    assert!(matches!(
        long.to_opcode(),
        Err(CodecError::NameTooLong { .. })
    ));
}

#[test]
fn test_decode_errors() {
    assert_eq!(
        Envelope::from_opcode(&[]),
        Err(CodecError::Malformed("prefix"))
    );
    assert_eq!(
        Envelope::from_opcode(&[0x43, 0x01, 0x03]),
        Err(CodecError::Malformed("prefix"))
    );
    assert_eq!(
        Envelope::from_opcode(&[0x42, 0x02, 0x03, 0, 0, 0, 0, 1]),
        Err(CodecError::VersionMismatch {
            expected: 1,
            got: 2
        })
    );
    assert_eq!(
        Envelope::from_opcode(&[0x42, 0x01, 0x0c]),
        Err(CodecError::UnknownMessageType(0x0c))
    );
    assert_eq!(
        Envelope::from_opcode(&[0x42, 0x01, 0x03, 1, 0, 0]),
        Err(CodecError::Malformed("event id"))
    );
    assert_eq!(
        Envelope::from_opcode(&[0x42, 0x01, 0x03, 1, 0, 0, 0, 0x09]),
        Err(CodecError::Malformed("outcome"))
    );
    assert_eq!(
        Envelope::from_opcode(&[0x42, 0x01, 0x03, 1, 0, 0, 0, 0x01, 0xff]),
        Err(CodecError::Malformed("trailing bytes"))
    );
    assert!(!is_betting_payload(&[]));
    assert_eq!(peek_message_type(&[0x42, 0x01]), None);
}

// ─── Generators ──────────────────────────────────────────────────────────────

fn arb_moneyline() -> impl Strategy<Value = MoneylineOdds> {
    (any::<u32>(), any::<u32>(), any::<u32>())
        .prop_map(|(home, away, draw)| MoneylineOdds { home, away, draw })
}

fn arb_outcome() -> impl Strategy<Value = OutcomeType> {
    prop::sample::select(OutcomeType::ALL.to_vec())
}

fn arb_result_type() -> impl Strategy<Value = ResultType> {
    (1u8..=5).prop_map(|v| ResultType::from_u8(v).unwrap())
}

fn arb_message() -> impl Strategy<Value = Message> {
    prop_oneof![
        (
            prop::sample::select(MappingKind::ALL.to_vec()),
            any::<u32>(),
            "[a-zA-Z0-9 ]{0,40}"
        )
            .prop_map(|(kind, id, name)| Message::Mapping(MappingRecord { kind, id, name })),
        (
            any::<u32>(),
            any::<u64>(),
            (any::<u32>(), any::<u32>(), any::<u32>()),
            (any::<u32>(), any::<u32>()),
            arb_moneyline()
        )
            .prop_map(
                |(event_id, start_time, (sport, tournament, stage), (home_team, away_team), moneyline)| {
                    Message::Event(EventMessage {
                        event_id,
                        start_time,
                        sport,
                        tournament,
                        stage,
                        home_team,
                        away_team,
                        moneyline,
                    })
                }
            ),
        (any::<u32>(), arb_outcome())
            .prop_map(|(event_id, outcome)| Message::Bet(BetMessage { event_id, outcome })),
        (any::<u32>(), arb_result_type(), any::<u32>(), any::<u32>()).prop_map(
            |(event_id, result_type, home_score, away_score)| Message::Result(ResultRecord {
                event_id,
                result_type,
                home_score,
                away_score,
            })
        ),
        (any::<u32>(), arb_moneyline()).prop_map(|(event_id, moneyline)| {
            Message::UpdateOdds(UpdateOddsMessage {
                event_id,
                moneyline,
            })
        }),
        (any::<u32>(), any::<u32>()).prop_map(|(event_id, entry_fee)| {
            Message::ChainGamesEvent(ChainGamesEventMessage {
                event_id,
                entry_fee,
            })
        }),
        any::<u32>()
            .prop_map(|event_id| Message::ChainGamesBet(ChainGamesBetMessage { event_id })),
        any::<u32>()
            .prop_map(|event_id| Message::ChainGamesResult(ChainGamesResultMessage { event_id })),
        (any::<u32>(), any::<u32>(), any::<u32>(), any::<u32>()).prop_map(
            |(event_id, points, home_odds, away_odds)| Message::SpreadsEvent(SpreadsMessage {
                event_id,
                market: SpreadMarket {
                    points,
                    home_odds,
                    away_odds,
                },
            })
        ),
        (any::<u32>(), any::<u32>(), any::<u32>(), any::<u32>()).prop_map(
            |(event_id, points, over_odds, under_odds)| Message::TotalsEvent(TotalsMessage {
                event_id,
                market: TotalsMarket {
                    points,
                    over_odds,
                    under_odds,
                },
            })
        ),
        (any::<u32>(), any::<u64>()).prop_map(|(event_id, start_time)| {
            Message::EventPatch(EventPatchMessage {
                event_id,
                start_time,
            })
        }),
    ]
}

proptest! {
    #[test]
    fn prop_opcode_roundtrip(message in arb_message()) {
        let payload = message.to_opcode().unwrap();
        prop_assert_eq!(payload[0], OPCODE_PREFIX);
        prop_assert_eq!(payload[2], message.message_type() as u8);
        let decoded = Envelope::from_opcode(&payload).unwrap();
        prop_assert_eq!(decoded.message, message);
    }

    #[test]
    fn prop_truncated_payloads_never_decode(message in arb_message(), cut in 1usize..8) {
        let payload = message.to_opcode().unwrap();
        let keep = payload.len().saturating_sub(cut).max(OPCODE_HEADER_LEN);
        prop_assume!(keep < payload.len());
        prop_assert!(Envelope::from_opcode(&payload[..keep]).is_err());
    }
}
