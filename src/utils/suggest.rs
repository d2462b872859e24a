fn normalize(value: &str) -> String {
    value
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

fn edit_distance(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b_chars.len()).collect();
    let mut curr = vec![0; b_chars.len() + 1];
    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b_chars.len()]
}

/// Close matches for a mistyped tool or field name, best first.
pub fn suggest(input: &str, candidates: &[&str], limit: usize) -> Vec<String> {
    let needle = normalize(input);
    if needle.is_empty() {
        return Vec::new();
    }
    let allowed = (needle.len() / 3).max(2);
    let mut scored: Vec<(usize, &str)> = candidates
        .iter()
        .filter_map(|candidate| {
            let hay = normalize(candidate);
            let score = if hay == needle {
                0
            } else if hay.contains(&needle) || needle.contains(&hay) {
                1
            } else {
                edit_distance(&needle, &hay)
            };
            (score <= allowed).then_some((score, *candidate))
        })
        .collect();
    scored.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)));
    scored.dedup_by(|a, b| a.1 == b.1);
    scored
        .into_iter()
        .take(limit.max(1))
        .map(|(_, name)| name.to_string())
        .collect()
}
