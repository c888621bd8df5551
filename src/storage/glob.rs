//! Glob pattern matching for the KEYS command.
//!
//! Supported patterns:
//! - `*` matches any sequence, including the empty one
//! - `?` matches exactly one byte
//! - `[ae]`, `[a-z]`, `[^x]` match one byte from (or not from) a class
//! - `\x` matches `x` literally

/// Returns true if `text` matches the glob `pattern`.
///
/// Uses a single backtracking point for the most recent `*`, so matching is
/// linear in practice instead of exponential.
pub fn glob_match(pattern: &[u8], text: &[u8]) -> bool {
    let (mut p, mut t) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() {
            if pattern[p] == b'*' {
                star = Some((p, t));
                p += 1;
                continue;
            }

            let (matched, token_len) = match_token(&pattern[p..], text[t]);
            if matched {
                p += token_len;
                t += 1;
                continue;
            }
        }

        // Mismatch: let the last star swallow one more byte
        match star {
            Some((star_p, star_t)) => {
                p = star_p + 1;
                t = star_t + 1;
                star = Some((star_p, star_t + 1));
            }
            None => return false,
        }
    }

    pattern[p..].iter().all(|&c| c == b'*')
}

/// Matches the single-byte token at the start of `pattern` against `c`.
///
/// Returns whether it matched and how many pattern bytes the token spans.
fn match_token(pattern: &[u8], c: u8) -> (bool, usize) {
    match pattern[0] {
        b'?' => (true, 1),
        b'\\' if pattern.len() > 1 => (pattern[1] == c, 2),
        b'[' => match class_end(pattern) {
            Some(end) => (class_matches(&pattern[1..end], c), end + 1),
            // Unterminated class: treat '[' literally
            None => (c == b'[', 1),
        },
        literal => (literal == c, 1),
    }
}

/// Index of the `]` closing the class that starts at `pattern[0]`.
fn class_end(pattern: &[u8]) -> Option<usize> {
    let start = if pattern.get(1) == Some(&b'^') { 2 } else { 1 };
    pattern[start..]
        .iter()
        .position(|&b| b == b']')
        .map(|i| i + start)
}

fn class_matches(class: &[u8], c: u8) -> bool {
    let (negate, class) = match class.first() {
        Some(b'^') => (true, &class[1..]),
        _ => (false, class),
    };

    let mut matched = false;
    let mut i = 0;
    while i < class.len() {
        if class[i] == b'\\' && i + 1 < class.len() {
            matched |= class[i + 1] == c;
            i += 2;
        } else if i + 2 < class.len() && class[i + 1] == b'-' {
            let (lo, hi) = if class[i] <= class[i + 2] {
                (class[i], class[i + 2])
            } else {
                (class[i + 2], class[i])
            };
            matched |= (lo..=hi).contains(&c);
            i += 3;
        } else {
            matched |= class[i] == c;
            i += 1;
        }
    }

    matched != negate
}
