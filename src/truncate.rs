//! Quoted-text truncation
//!
//! Bounds the stored body of an article. Replies have their deepest quotes
//! collapsed first, then everything is cut to a hard budget. Root articles only get
//! the hard cut. Lengths are counted in `char`s.

/// Budget for articles that start a thread
pub const ROOT_BUDGET: usize = 8000;
/// Budget for replies
pub const REPLY_BUDGET: usize = 4000;
/// Appended to the representative line of a collapsed quote run
pub const TRUNCATION_MARKER: &str = " ...[truncated]";
/// Characters of the first quoted line kept when a run collapses
const KEPT_PREFIX_CHARS: usize = 49;

/// Quote depth and the length above which that depth is collapsed, applied in order
const QUOTE_PASSES: [(usize, usize); 3] = [(3, 1000), (2, 1000), (1, 2500)];

/// Outcome of [`truncate_text`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Truncated {
    /// Text to persist
    pub text: String,
    /// Whether a quote pass changed the text or the hard cut fired
    pub is_truncated: bool,
    /// The untruncated input, kept only when `is_truncated`
    pub full_text: Option<String>,
}

/// Bound `text` to the budget for its kind of article
pub fn truncate_text(text: &str, is_root: bool) -> Truncated {
    let original = text.trim();
    let budget = if is_root { ROOT_BUDGET } else { REPLY_BUDGET };

    let mut current = original.to_string();
    let mut altered = false;

    if !is_root {
        for (depth, watermark) in QUOTE_PASSES {
            if char_len(&current) > watermark {
                let (collapsed, changed) = collapse_quotes(&current, depth);
                current = collapsed;
                altered |= changed;
            }
        }
    }

    let cut = char_len(&current) > budget;
    if cut {
        current = current.chars().take(budget).collect();
    }

    let is_truncated = altered || cut;
    Truncated {
        text: current,
        is_truncated,
        full_text: is_truncated.then(|| original.to_string()),
    }
}

/// One pass at `depth`: trim every line, collapse each run of lines quoted at
/// least `depth` deep into its first line
///
/// Returns the new text and whether any quoted line was shortened or dropped.
fn collapse_quotes(text: &str, depth: usize) -> (String, bool) {
    let prefix = ">".repeat(depth);
    let mut lines = Vec::new();
    let mut in_run = false;
    let mut changed = false;

    for line in text.split('\n').map(str::trim) {
        if !line.starts_with(prefix.as_str()) {
            in_run = false;
            lines.push(line.to_string());
            continue;
        }

        if in_run {
            changed = true;
            continue;
        }
        in_run = true;

        if is_collapsed(line) {
            lines.push(line.to_string());
        } else {
            let kept: String = line.chars().take(KEPT_PREFIX_CHARS).collect();
            lines.push(format!("{}{}", kept, TRUNCATION_MARKER));
            changed = true;
        }
    }

    (lines.join("\n"), changed)
}

// A line produced by an earlier collapse is left as is
fn is_collapsed(line: &str) -> bool {
    line.ends_with(TRUNCATION_MARKER)
        && char_len(line) <= KEPT_PREFIX_CHARS + char_len(TRUNCATION_MARKER)
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}
