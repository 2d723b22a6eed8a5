use {
    derive_more::Display,
    rand::Rng,
    serde::{Deserialize, Serialize},
};

use super::error::PipelineError;

const BASE36: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const RANDOM_SUFFIX_LEN: usize = 6;

/// Human-facing order reference (`ORD-<TS>-<RAND>`).
///
/// Unique with overwhelming probability only; the `orders.order_number`
/// unique constraint is what actually enforces it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderNumber(String);

impl OrderNumber {
    pub fn generate() -> Self {
        let ts = to_base36(chrono::Utc::now().timestamp_millis().unsigned_abs());
        let mut rng = rand::thread_rng();
        let suffix: String = (0..RANDOM_SUFFIX_LEN)
            .map(|_| BASE36[rng.gen_range(0..BASE36.len())] as char)
            .collect();
        Self(format!("ORD-{ts}-{suffix}"))
    }

    /// Accepts an existing order number, e.g. the `reference` of a webhook.
    pub fn new(value: impl Into<String>) -> Result<Self, PipelineError> {
        let value = value.into();
        let value = value.trim();
        if value.is_empty() {
            return Err(PipelineError::Validation("order number is empty".into()));
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

fn to_base36(mut n: u64) -> String {
    if n == 0 {
        return "0".into();
    }
    let mut buf = Vec::new();
    while n > 0 {
        buf.push(BASE36[(n % 36) as usize]);
        n /= 36;
    }
    buf.reverse();
    String::from_utf8(buf).unwrap_or_default()
}
