use rand::{distributions::Alphanumeric, Rng};

const TOKEN_LEN: usize = 8;
const MAX_STEM_LEN: usize = 50;

fn random_token() -> String {
    rand::thread_rng().sample_iter(&Alphanumeric).take(TOKEN_LEN).map(char::from).collect()
}

/// Splits the last path component of a client-supplied name into stem and
/// extension. Both `/` and `\` count as separators, and a leading dot does not
/// start an extension.
fn split_name(original: &str) -> (&str, &str) {
    let base = original.rsplit(['/', '\\']).next().unwrap_or_default();
    if base.chars().all(|c| c == '.') {
        return (base, "");
    }
    match base.rfind('.') {
        Some(idx) if idx > 0 => base.split_at(idx),
        _ => (base, ""),
    }
}

/// A stem made only of dots (`.`, `..`) collapses to `_`.
pub fn sanitize_stem(stem: &str) -> String {
    if !stem.is_empty() && stem.chars().all(|c| c == '.') {
        return "_".to_string();
    }
    stem.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .take(MAX_STEM_LEN)
        .collect()
}

/// `{epoch_millis}_{token}_{sanitized_stem}{extension}`
pub fn generate_filename(original: &str) -> String {
    let (stem, extension) = split_name(original);
    format!(
        "{}_{}_{}{}",
        chrono::Utc::now().timestamp_millis(),
        random_token(),
        sanitize_stem(stem),
        extension
    )
}
