use rustc_hash::FxHashSet;
use serde_json::Value;

use crate::error::{FilterError, FilterResult};

/// Set of route ids a feature must intersect to be kept
///
/// Built once from the command line and never modified afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowSet {
    ids: FxHashSet<i128>,
}

impl AllowSet {
    #[inline]
    pub fn contains(&self, id: i128) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Ids in ascending order (for diagnostics)
    pub fn sorted(&self) -> Vec<i128> {
        let mut ids: Vec<i128> = self.ids.iter().copied().collect();
        ids.sort_unstable();
        ids
    }
}

impl FromIterator<i128> for AllowSet {
    fn from_iter<T: IntoIterator<Item = i128>>(iter: T) -> Self {
        AllowSet {
            ids: iter.into_iter().collect(),
        }
    }
}

/// Best-effort conversion of a JSON value to an integer id
///
/// - `null` and booleans are never ids
/// - integers are taken as-is
/// - anything else is rendered as text, trimmed and parsed
///
/// Ids are `i128`, which covers every id with up to 38 digits. Returns
/// `None` for anything that is not numeric. Never fails.
pub fn normalize_id(value: &Value) -> Option<i128> {
    match value {
        Value::Null | Value::Bool(_) => None,
        Value::Number(n) => n
            .as_i64()
            .map(i128::from)
            .or_else(|| normalize_id_token(&n.to_string())),
        Value::String(s) => normalize_id_token(s),
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// Parse a textual id, ignoring surrounding whitespace
#[inline]
pub fn normalize_id_token(token: &str) -> Option<i128> {
    token.trim().parse::<i128>().ok()
}

/// Build the allow-set from raw command line values
///
/// Non-numeric tokens are dropped silently and duplicates collapse. An empty
/// result is a configuration error.
pub fn normalize_id_set<I, S>(raw: I) -> FilterResult<AllowSet>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let allow: AllowSet = raw
        .into_iter()
        .filter_map(|token| normalize_id_token(token.as_ref()))
        .collect();

    if allow.is_empty() {
        return Err(FilterError::NoValidIds);
    }

    Ok(allow)
}
