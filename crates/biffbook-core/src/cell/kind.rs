//! Cell kinds, error codes and cached formula results

use std::fmt;

/// What a cell currently stores
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellKind {
    Blank,
    Numeric,
    String,
    Formula,
    Boolean,
    Error,
}

impl CellKind {
    pub fn name(&self) -> &'static str {
        match self {
            CellKind::Blank => "blank",
            CellKind::Numeric => "numeric",
            CellKind::String => "text",
            CellKind::Formula => "formula",
            CellKind::Boolean => "boolean",
            CellKind::Error => "error",
        }
    }
}

impl fmt::Display for CellKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Spreadsheet error values as stored in BOOLERR and FORMULA records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellError {
    /// #NULL! - Incorrect range operator
    Null,
    /// #DIV/0! - Division by zero
    Div0,
    /// #VALUE! - Wrong type of argument or operand
    Value,
    /// #REF! - Invalid cell reference
    Ref,
    /// #NAME? - Unrecognized formula name
    Name,
    /// #NUM! - Invalid numeric value
    Num,
    /// #N/A - Value not available
    Na,
}

impl CellError {
    pub const ALL: [CellError; 7] = [
        CellError::Null,
        CellError::Div0,
        CellError::Value,
        CellError::Ref,
        CellError::Name,
        CellError::Num,
        CellError::Na,
    ];

    /// Symbolic text of the error
    pub fn as_str(&self) -> &'static str {
        match self {
            CellError::Null => "#NULL!",
            CellError::Div0 => "#DIV/0!",
            CellError::Value => "#VALUE!",
            CellError::Ref => "#REF!",
            CellError::Name => "#NAME?",
            CellError::Num => "#NUM!",
            CellError::Na => "#N/A",
        }
    }

    /// Parse the symbolic text (case-insensitive)
    pub fn from_text(s: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|e| e.as_str().eq_ignore_ascii_case(s.trim()))
    }

    /// Record-level error code
    pub fn code(&self) -> u8 {
        match self {
            CellError::Null => 0x00,
            CellError::Div0 => 0x07,
            CellError::Value => 0x0F,
            CellError::Ref => 0x17,
            CellError::Name => 0x1D,
            CellError::Num => 0x24,
            CellError::Na => 0x2A,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.iter().copied().find(|e| e.code() == code)
    }
}

impl fmt::Display for CellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Last evaluated result of a formula cell
///
/// An empty-string result stands in for a blank result.
#[derive(Debug, Clone, PartialEq)]
pub enum CachedResult {
    Number(f64),
    String(String),
    Boolean(bool),
    Error(CellError),
}

impl CachedResult {
    /// Kind an accessor must match to read this result
    pub fn kind(&self) -> CellKind {
        match self {
            CachedResult::Number(_) => CellKind::Numeric,
            CachedResult::String(_) => CellKind::String,
            CachedResult::Boolean(_) => CellKind::Boolean,
            CachedResult::Error(_) => CellKind::Error,
        }
    }

    /// Display text using the same rules as plain cells
    pub fn to_text(&self) -> String {
        match self {
            CachedResult::Number(n) => number_to_text(*n),
            CachedResult::String(s) => s.clone(),
            CachedResult::Boolean(b) => bool_to_text(*b).to_string(),
            CachedResult::Error(e) => e.as_str().to_string(),
        }
    }
}

impl Default for CachedResult {
    fn default() -> Self {
        CachedResult::Number(0.0)
    }
}

pub(crate) fn bool_to_text(b: bool) -> &'static str {
    if b {
        "TRUE"
    } else {
        "FALSE"
    }
}

/// Locale-free text for a number, 15 significant digits
///
/// Exponents of 20 and above, or below -4, switch to `1.5E+20` notation.
pub fn number_to_text(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    if !value.is_finite() {
        return if value.is_nan() {
            CellError::Num.as_str().to_string()
        } else {
            CellError::Div0.as_str().to_string()
        };
    }

    let sign = if value < 0.0 { "-" } else { "" };
    let sci = format!("{:.14e}", value.abs());
    let (mantissa, exp) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };
    let digits: String = mantissa.chars().filter(|c| c.is_ascii_digit()).collect();
    let digits = digits.trim_end_matches('0');
    let digits = if digits.is_empty() { "0" } else { digits };

    if !(-4..20).contains(&exp) {
        let (head, tail) = digits.split_at(1);
        let exp_sign = if exp < 0 { '-' } else { '+' };
        let body = if tail.is_empty() {
            head.to_string()
        } else {
            format!("{head}.{tail}")
        };
        return format!("{sign}{body}E{exp_sign}{:02}", exp.abs());
    }

    let text = if exp >= 0 {
        let int_len = exp as usize + 1;
        if digits.len() <= int_len {
            format!("{digits}{}", "0".repeat(int_len - digits.len()))
        } else {
            format!("{}.{}", &digits[..int_len], &digits[int_len..])
        }
    } else {
        format!("0.{}{digits}", "0".repeat((-exp - 1) as usize))
    };
    format!("{sign}{text}")
}
