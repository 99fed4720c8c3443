use log::trace;

use super::commands::{EngineMessage, Info, Score, Wdl};
use super::NULL_MOVE;

pub struct Decoder;

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder {
    pub fn new() -> Self {
        Self
    }

    pub fn decode(&self, input: &str) -> EngineMessage {
        let input = input.trim();
        match input {
            "uciok" => EngineMessage::UciOk,
            "readyok" => EngineMessage::ReadyOk,

            _ if input.starts_with("bestmove") => self.decode_bestmove(input),
            _ if input.starts_with("info") => EngineMessage::Info(self.decode_info(input)),
            _ if input.starts_with("id name ") => {
                EngineMessage::IdName(input["id name ".len()..].trim().to_string())
            }
            _ if input.starts_with("id author ") => {
                EngineMessage::IdAuthor(input["id author ".len()..].trim().to_string())
            }
            _ if input.starts_with("option ") => EngineMessage::Option(input.to_string()),

            _ => EngineMessage::Unknown(input.to_string()),
        }
    }

    fn decode_bestmove(&self, input: &str) -> EngineMessage {
        let best_move = input
            .split_whitespace()
            .nth(1)
            .filter(|mv| *mv != NULL_MOVE && *mv != "(none)")
            .map(str::to_string);

        EngineMessage::BestMove(best_move)
    }

    fn decode_info(&self, input: &str) -> Info {
        let mut info = Info::default();

        // `string` swallows the rest of the line, so split it off before tokenizing.
        let (fields, text) = match input.find(" string") {
            Some(idx) => (&input[..idx], Some(input[idx + " string".len()..].trim())),
            None => (input, None),
        };
        info.string = text.filter(|s| !s.is_empty()).map(str::to_string);

        let tokens: Vec<&str> = fields.split_whitespace().skip(1).collect();
        let mut i = 0;
        while i < tokens.len() {
            match tokens[i] {
                "depth" => info.depth = parse_at(&tokens, i + 1),
                "seldepth" => info.sel_depth = parse_at(&tokens, i + 1),
                "multipv" => info.multipv = parse_at(&tokens, i + 1),
                "nodes" => info.nodes = parse_at(&tokens, i + 1),
                "time" => info.time = parse_at(&tokens, i + 1),
                "score" => {
                    info.score = match tokens.get(i + 1) {
                        Some(&"cp") => parse_at(&tokens, i + 2).map(Score::Centipawns),
                        Some(&"mate") => parse_at(&tokens, i + 2).map(Score::Mate),
                        _ => None,
                    };
                    i += 2;
                }
                "wdl" => {
                    let win = parse_at(&tokens, i + 1);
                    let draw = parse_at(&tokens, i + 2);
                    let loss = parse_at(&tokens, i + 3);
                    if let (Some(win), Some(draw), Some(loss)) = (win, draw, loss) {
                        info.wdl = Some(Wdl { win, draw, loss });
                    }
                    i += 3;
                }
                "pv" => {
                    info.pv = tokens[i + 1..].iter().map(|mv| mv.to_string()).collect();
                    break;
                }
                other => trace!("Skipping info token {:?}", other),
            }
            i += 1;
        }

        info
    }
}

fn parse_at<T: std::str::FromStr>(tokens: &[&str], idx: usize) -> Option<T> {
    tokens.get(idx).and_then(|token| token.parse().ok())
}
