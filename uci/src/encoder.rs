use super::commands::{GoParams, UciCommand};

pub struct Encoder {}

impl Encoder {
    pub fn encode(&self, command: &UciCommand) -> String {
        match command {
            UciCommand::Uci => "uci".to_string(),
            UciCommand::IsReady => "isready".to_string(),
            UciCommand::UciNewGame => "ucinewgame".to_string(),

            UciCommand::Position(position) => {
                if position.moves.is_empty() {
                    format!("position fen {}", position.fen)
                } else {
                    format!(
                        "position fen {} moves {}",
                        position.fen,
                        position.moves.join(" ")
                    )
                }
            }
            UciCommand::Go(params) => encode_go(params),

            UciCommand::Stop => "stop".to_string(),
            UciCommand::Quit => "quit".to_string(),
            UciCommand::SetOption { name, value } => match value {
                Some(value) => format!("setoption name {} value {}", name, value),
                None => format!("setoption name {}", name),
            },
        }
    }
}

fn encode_go(params: &GoParams) -> String {
    match params.move_time {
        Some(ms) => format!("go movetime {}", ms),
        None => "go".to_string(),
    }
}
