use commonware_utils::from_hex_formatted;
use peerless_types::betting::{peek_message_type, Envelope, Message};
use std::env;

fn main() {
    let hex = env::args().nth(1).unwrap_or_else(|| {
        eprintln!("usage: decode-opcode <hex>");
        std::process::exit(1);
    });

    let bytes = match from_hex_formatted(hex.trim()) {
        Some(bytes) => bytes,
        None => {
            eprintln!("invalid hex string");
            std::process::exit(1);
        }
    };

    println!("payload: {} bytes", bytes.len());
    match peek_message_type(&bytes) {
        Some(kind) => println!("type tag: {kind:?}"),
        None => println!("type tag: none (not a betting payload)"),
    }

    let envelope = match Envelope::from_opcode(&bytes) {
        Ok(envelope) => envelope,
        Err(err) => {
            eprintln!("decode error: {err}");
            std::process::exit(1);
        }
    };

    println!("version: {}", envelope.version);
    match envelope.message {
        Message::Mapping(m) => {
            println!("kind: Mapping ({})", m.kind.as_str());
            println!("id: {}", m.id);
            println!("name: {:?}", m.name);
        }
        Message::Event(m) => {
            println!("kind: Event");
            println!("event: {} starts {}", m.event_id, m.start_time);
            println!(
                "sport={} tournament={} stage={} home={} away={}",
                m.sport, m.tournament, m.stage, m.home_team, m.away_team
            );
            println!(
                "moneyline: home={} away={} draw={}",
                m.moneyline.home, m.moneyline.away, m.moneyline.draw
            );
        }
        Message::Bet(m) => {
            println!("kind: Bet");
            println!("event: {} outcome: {:?}", m.event_id, m.outcome);
        }
        Message::Result(m) => {
            println!("kind: Result");
            println!(
                "event: {} {:?} {}-{}",
                m.event_id, m.result_type, m.home_score, m.away_score
            );
        }
        Message::UpdateOdds(m) => {
            println!("kind: UpdateOdds");
            println!(
                "event: {} home={} away={} draw={}",
                m.event_id, m.moneyline.home, m.moneyline.away, m.moneyline.draw
            );
        }
        Message::SpreadsEvent(m) => {
            println!("kind: SpreadsEvent");
            println!(
                "event: {} points={} home={} away={}",
                m.event_id, m.market.points, m.market.home_odds, m.market.away_odds
            );
        }
        Message::TotalsEvent(m) => {
            println!("kind: TotalsEvent");
            println!(
                "event: {} points={} over={} under={}",
                m.event_id, m.market.points, m.market.over_odds, m.market.under_odds
            );
        }
        Message::EventPatch(m) => {
            println!("kind: EventPatch");
            println!("event: {} starts {}", m.event_id, m.start_time);
        }
        Message::ChainGamesEvent(m) => {
            println!("kind: ChainGamesEvent");
            println!("game: {} entry fee: {} coins", m.event_id, m.entry_fee);
        }
        Message::ChainGamesBet(m) => {
            println!("kind: ChainGamesBet");
            println!("game: {}", m.event_id);
        }
        Message::ChainGamesResult(m) => {
            println!("kind: ChainGamesResult");
            println!("game: {}", m.event_id);
        }
    }
}
