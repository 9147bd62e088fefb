/// Check if a sender may trigger the bot.
///
/// An empty allowlist means everyone is allowed. Entries are matched
/// case-insensitively against the sender ID and may use `*` as a wildcard
/// for any run of characters (e.g. `4915*@s.whatsapp.net`).
pub fn is_allowed(sender_id: &str, allowlist: &[String]) -> bool {
    if allowlist.is_empty() {
        return true;
    }
    let sender = sender_id.to_lowercase();
    allowlist
        .iter()
        .any(|pattern| wildcard_match(&pattern.to_lowercase(), &sender))
}

/// Greedy wildcard match with single-star backtracking.
fn wildcard_match(pattern: &str, text: &str) -> bool {
    let pat: Vec<char> = pattern.chars().collect();
    let txt: Vec<char> = text.chars().collect();
    let (mut p, mut t) = (0, 0);
    // Position of the last `*` seen and the text index it was tried against.
    let mut backtrack: Option<(usize, usize)> = None;

    while t < txt.len() {
        if p < pat.len() && pat[p] == '*' {
            backtrack = Some((p, t));
            p += 1;
        } else if p < pat.len() && pat[p] == txt[t] {
            p += 1;
            t += 1;
        } else if let Some((star, matched)) = backtrack {
            p = star + 1;
            t = matched + 1;
            backtrack = Some((star, matched + 1));
        } else {
            return false;
        }
    }

    pat[p..].iter().all(|&c| c == '*')
}
