/// Halfmove clock field of a FEN string, if present and numeric.
pub fn halfmove_clock(fen: &str) -> Option<u32> {
    fen.split_whitespace().nth(4).and_then(|field| field.parse().ok())
}

/// Expands a 4-field EPD record (operations ignored) into a full FEN.
/// Full FEN strings are returned unchanged.
pub fn normalize_fen(line: &str) -> Option<String> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 4 {
        return None;
    }

    let has_counters = parts.len() >= 6
        && parts[4].parse::<u32>().is_ok()
        && parts[5].parse::<u32>().is_ok();
    if has_counters {
        return Some(parts[..6].join(" "));
    }

    Some(format!("{} {} {} {} 0 1", parts[0], parts[1], parts[2], parts[3]))
}
