use {
    super::error::PipelineError,
    serde::{Deserialize, Serialize},
    std::fmt,
};

/// Amount in whole CFA francs. XOF has no decimal subunit in display, but the
/// gateway still expects "cents", see [`MoneyAmount::minor_units`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MoneyAmount(i64);

impl MoneyAmount {
    pub const ZERO: MoneyAmount = MoneyAmount(0);

    pub fn new(francs: i64) -> Result<Self, PipelineError> {
        if francs < 0 {
            return Err(PipelineError::Validation(format!(
                "amount cannot be negative, got: {francs}"
            )));
        }
        Ok(Self(francs))
    }

    pub fn francs(&self) -> i64 {
        self.0
    }

    /// Gateway amount: francs × 100.
    pub fn minor_units(&self) -> Result<i64, PipelineError> {
        self.0
            .checked_mul(100)
            .ok_or_else(|| PipelineError::Validation(format!("amount {} too large", self.0)))
    }

    pub fn checked_add(self, other: MoneyAmount) -> Option<MoneyAmount> {
        self.0.checked_add(other.0).map(MoneyAmount)
    }

    pub fn checked_mul(self, quantity: i32) -> Option<MoneyAmount> {
        if quantity < 0 {
            return None;
        }
        self.0.checked_mul(i64::from(quantity)).map(MoneyAmount)
    }

    /// fr-FR grouping, e.g. `25 000 XOF` with a narrow no-break space.
    pub fn display_xof(&self) -> String {
        format!("{} {}", group_thousands(self.0), Currency::Xof)
    }
}

impl fmt::Display for MoneyAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn group_thousands(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 * 3 + 1);
    if value < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('\u{202f}');
        }
        out.push(ch);
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Currency {
    #[serde(rename = "XOF")]
    Xof,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Xof => "XOF",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for Currency {
    type Error = PipelineError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "XOF" | "xof" => Ok(Self::Xof),
            other => Err(PipelineError::Validation(format!(
                "unknown currency: {other}"
            ))),
        }
    }
}
