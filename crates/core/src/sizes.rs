//! Canonical size grammar for catalog quantities.
//!
//! Every size flowing through a `SearchIntent` is normalized to either
//! `"Ng"` (single weight, e.g. `3.5g`) or `"NxYg"` (multi-pack, e.g.
//! `3x0.5g`). Normalization is idempotent: a canonical string maps to
//! itself.

/// Normalizes a free-text size phrase to the canonical grammar. Returns
/// `None` when the phrase carries no recognizable weight, so callers drop
/// the size rather than persist a non-canonical value.
pub fn normalize_size(raw: &str) -> Option<String> {
    let lowered = raw.trim().to_ascii_lowercase();
    if lowered.is_empty() {
        return None;
    }

    if let Some(pack) = parse_pack(&lowered) {
        return Some(pack);
    }

    if let Some(grams) = fraction_table(&lowered) {
        return Some(format!("{}g", format_grams(grams)));
    }

    if let Some(grams) = parse_grams(&lowered) {
        return Some(format!("{}g", format_grams(grams)));
    }

    None
}

/// True when `size` is already in canonical `"Ng"` or `"NxYg"` form.
pub fn is_canonical(size: &str) -> bool {
    normalize_size(size).as_deref() == Some(size)
}

/// Ounce-fraction vocabulary: eighth/quarter/half/ounce and their slash
/// spellings. Fractions are checked before the bare ounce so "half ounce"
/// resolves to 14g, not 28g.
fn fraction_table(lowered: &str) -> Option<f64> {
    let tokens: Vec<&str> = lowered
        .split(|c: char| !c.is_ascii_alphanumeric() && c != '/' && c != '.')
        .filter(|t| !t.is_empty())
        .collect();

    let has = |word: &str| tokens.iter().any(|t| *t == word);

    if has("eighth") || has("1/8") {
        return Some(3.5);
    }
    if has("quarter") || has("1/4") {
        return Some(7.0);
    }
    if has("half") || has("1/2") {
        return Some(14.0);
    }
    if has("ounce") || has("ounces") || has("oz") {
        return Some(28.0);
    }
    None
}

/// Parses multi-pack phrases: "3x0.5g", "3 x .5g", "2 by 1g".
fn parse_pack(lowered: &str) -> Option<String> {
    let (left, right) = split_pack(lowered)?;
    let count: u32 = left.trim().parse().ok()?;
    if count == 0 {
        return None;
    }
    let grams = parse_grams(right.trim())?;
    Some(format!("{count}x{}g", format_grams(grams)))
}

fn split_pack(lowered: &str) -> Option<(&str, &str)> {
    if let Some((left, right)) = lowered.split_once(" by ") {
        return Some((left, right));
    }
    // "3x0.5g" / "3 x 0.5g": split on the first 'x' that separates a count
    // from a weight, which rules out 'x' inside words.
    let index = lowered.find('x')?;
    let (left, right) = lowered.split_at(index);
    let left = left.trim();
    let right = right[1..].trim();
    if left.is_empty() || right.is_empty() || !left.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some((left, right))
}

/// Parses a bare gram quantity: "3.5g", "3.5 g", ".5g", "7 grams".
fn parse_grams(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    let stripped = trimmed
        .strip_suffix("grams")
        .or_else(|| trimmed.strip_suffix("gram"))
        .or_else(|| trimmed.strip_suffix('g'))?;
    let value: f64 = stripped.trim().parse().ok()?;
    if value.is_finite() && value > 0.0 {
        Some(value)
    } else {
        None
    }
}

/// Shortest decimal rendering with a leading zero on sub-gram weights:
/// 3.50 → "3.5", 7.0 → "7", .5 → "0.5".
fn format_grams(grams: f64) -> String {
    let rounded = (grams * 100.0).round() / 100.0;
    format!("{rounded}")
}
