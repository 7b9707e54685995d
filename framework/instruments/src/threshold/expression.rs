use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// How a metric is reduced to a single number before comparison.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Aggregation {
    Rate,
    Avg,
    Min,
    Max,
    Med,
    /// Percentile in `(0, 100]`.
    Percentile(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl Comparison {
    fn symbol(&self) -> &'static str {
        match self {
            Comparison::Lt => "<",
            Comparison::Le => "<=",
            Comparison::Gt => ">",
            Comparison::Ge => ">=",
            Comparison::Eq => "==",
            Comparison::Ne => "!=",
        }
    }
}

#[derive(derive_more::Error, derive_more::Display, Debug, Clone, PartialEq, Eq)]
#[display("invalid threshold: {msg}")]
pub struct ThresholdParseError {
    msg: String,
}

impl ThresholdParseError {
    pub(crate) fn new(msg: impl Into<String>) -> Self {
        Self { msg: msg.into() }
    }
}

/// A condition such as `rate<0.01` or `p(99) < 100`. The condition describes the passing state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Condition {
    pub aggregation: Aggregation,
    pub comparison: Comparison,
    pub value: f64,
}

impl Condition {
    /// Whether the observed value satisfies the condition.
    pub fn holds(&self, observed: f64) -> bool {
        match self.comparison {
            Comparison::Lt => observed < self.value,
            Comparison::Le => observed <= self.value,
            Comparison::Gt => observed > self.value,
            Comparison::Ge => observed >= self.value,
            Comparison::Eq => observed == self.value,
            Comparison::Ne => observed != self.value,
        }
    }
}

impl FromStr for Condition {
    type Err = ThresholdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let op_start = s
            .find(['<', '>', '=', '!'])
            .ok_or_else(|| ThresholdParseError::new(format!("no comparison operator in `{s}`")))?;
        let (lhs, rest) = s.split_at(op_start);

        let (comparison, rhs) = [
            ("<=", Comparison::Le),
            (">=", Comparison::Ge),
            ("==", Comparison::Eq),
            ("!=", Comparison::Ne),
            ("<", Comparison::Lt),
            (">", Comparison::Gt),
        ]
        .into_iter()
        .find_map(|(symbol, comparison)| rest.strip_prefix(symbol).map(|rhs| (comparison, rhs)))
        .ok_or_else(|| ThresholdParseError::new(format!("unknown operator in `{s}`")))?;

        let value = rhs
            .trim()
            .parse::<f64>()
            .map_err(|_| ThresholdParseError::new(format!("`{}` is not a number", rhs.trim())))?;

        Ok(Condition {
            aggregation: parse_aggregation(lhs.trim())?,
            comparison,
            value,
        })
    }
}

fn parse_aggregation(s: &str) -> Result<Aggregation, ThresholdParseError> {
    match s {
        "rate" => return Ok(Aggregation::Rate),
        "avg" => return Ok(Aggregation::Avg),
        "min" => return Ok(Aggregation::Min),
        "max" => return Ok(Aggregation::Max),
        "med" => return Ok(Aggregation::Med),
        _ => {}
    }

    let percentile = s
        .strip_prefix("p(")
        .and_then(|s| s.strip_suffix(')'))
        .ok_or_else(|| ThresholdParseError::new(format!("unknown aggregation `{s}`")))?
        .trim()
        .parse::<f64>()
        .map_err(|_| ThresholdParseError::new(format!("bad percentile in `{s}`")))?;

    if !(percentile > 0.0 && percentile <= 100.0) {
        return Err(ThresholdParseError::new(format!(
            "percentile must be in (0, 100], got {percentile}"
        )));
    }

    Ok(Aggregation::Percentile(percentile))
}

impl Display for Aggregation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Aggregation::Rate => write!(f, "rate"),
            Aggregation::Avg => write!(f, "avg"),
            Aggregation::Min => write!(f, "min"),
            Aggregation::Max => write!(f, "max"),
            Aggregation::Med => write!(f, "med"),
            Aggregation::Percentile(p) => write!(f, "p({p})"),
        }
    }
}

impl Display for Condition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}{}{}",
            self.aggregation,
            self.comparison.symbol(),
            self.value
        )
    }
}
