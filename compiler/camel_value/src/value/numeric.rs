//! String to number parsing and number to string formatting.

/// A parsed numeric value that remembers whether it was integral.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub fn as_float(self) -> f64 {
        match self {
            Number::Int(n) => n as f64,
            Number::Float(f) => f,
        }
    }
}

/// Length in bytes of the numeric prefix of `s` (after leading
/// whitespace), and whether that prefix needs float parsing.
fn scan_prefix(s: &str) -> (usize, bool) {
    let bytes = s.as_bytes();
    let mut i = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        i += 1;
    }
    let int_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let mut digits = i - int_start;
    let mut is_float = false;

    if i < bytes.len() && bytes[i] == b'.' {
        let mut j = i + 1;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        let frac = j - i - 1;
        if digits > 0 || frac > 0 {
            digits += frac;
            is_float = true;
            i = j;
        }
    }
    if digits == 0 {
        return (0, false);
    }

    if i < bytes.len() && matches!(bytes[i], b'e' | b'E') {
        let mut j = i + 1;
        if j < bytes.len() && matches!(bytes[j], b'+' | b'-') {
            j += 1;
        }
        let exp_start = j;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j > exp_start {
            is_float = true;
            i = j;
        }
    }
    (i, is_float)
}

/// Parse the leading numeric prefix of a string.
///
/// Leading whitespace is skipped; anything after the prefix is ignored.
/// A string without a numeric prefix is `Int(0)`. `Inf`/`Infinity`/`NaN`
/// are recognised case-insensitively. Integers too large for `i64` become
/// floats.
pub fn parse_number(s: &str) -> Number {
    let s = s.trim_start();
    let (len, is_float) = scan_prefix(s);
    if len == 0 {
        return parse_special(s).map_or(Number::Int(0), Number::Float);
    }
    let prefix = &s[..len];
    if !is_float {
        if let Ok(n) = prefix.parse::<i64>() {
            return Number::Int(n);
        }
    }
    Number::Float(prefix.parse::<f64>().unwrap_or(0.0))
}

fn parse_special(s: &str) -> Option<f64> {
    let (sign, rest) = match s.as_bytes().first() {
        Some(b'-') => (-1.0, &s[1..]),
        Some(b'+') => (1.0, &s[1..]),
        _ => (1.0, s),
    };
    let lower = rest.get(..3)?.to_ascii_lowercase();
    match lower.as_str() {
        "inf" => Some(sign * f64::INFINITY),
        "nan" => Some(f64::NAN),
        _ => None,
    }
}

/// Whether the whole string (ignoring surrounding whitespace) is a number.
pub(crate) fn is_complete_number(s: &str) -> bool {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return false;
    }
    let (len, _) = scan_prefix(trimmed);
    len == trimmed.len()
        || matches!(
            trimmed.trim_start_matches(['+', '-']).to_ascii_lowercase().as_str(),
            "inf" | "infinity" | "nan"
        )
}

/// `%g`-style formatting with `precision` significant digits.
///
/// Uses fixed notation when the decimal exponent is in
/// `-4..precision`, scientific otherwise; trailing zeros are removed in
/// both (`0.1 + 0.2` prints as `0.3`, `1e20` as `1e+20`).
pub fn format_general(f: f64, precision: usize) -> String {
    if f.is_nan() {
        return "NaN".to_string();
    }
    if f.is_infinite() {
        return if f > 0.0 { "Inf" } else { "-Inf" }.to_string();
    }
    if f == 0.0 {
        return "0".to_string();
    }
    let precision = precision.max(1);
    let sci = format!("{:.*e}", precision - 1, f);
    let Some((mantissa, exp)) = sci.split_once('e') else {
        return sci;
    };
    let exp: i32 = exp.parse().unwrap_or(0);

    if exp < -4 || exp >= precision as i32 {
        let mantissa = trim_fraction(mantissa);
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{mantissa}e{sign}{:02}", exp.abs())
    } else {
        let decimals = (precision as i32 - 1 - exp).max(0) as usize;
        trim_fraction(&format!("{f:.decimals$}")).to_string()
    }
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}
