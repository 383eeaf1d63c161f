//! `sprintf`/`printf` formatting.
//!
//! Supports the conversions `% c s d i u o x X b e E f F g G` with the
//! flags `- + space 0 #`, a width and a precision, either of which may be
//! `*` (taken from the argument list). Missing arguments format as undef;
//! an unknown conversion is copied to the output unchanged.

use std::iter::Peekable;
use std::str::Chars;

use camel_value::{format_general, Value};

#[derive(Default)]
struct Spec {
    left: bool,
    plus: bool,
    space: bool,
    zero: bool,
    alt: bool,
    width: usize,
    precision: Option<usize>,
}

/// Format `args` according to `format`.
pub fn sprintf(format: &str, args: &[Value]) -> String {
    let mut out = String::with_capacity(format.len());
    let mut args = args.iter();
    let mut chars = format.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        if chars.peek() == Some(&'%') {
            chars.next();
            out.push('%');
            continue;
        }

        let mut raw = String::from('%');
        let spec = parse_spec(&mut chars, &mut args, &mut raw);
        let Some(conversion) = chars.next() else {
            out.push_str(&raw);
            break;
        };
        let undef = Value::Undef;
        let mut next_arg = || args.next().unwrap_or(&undef).clone();

        let formatted = match conversion {
            'c' => {
                let code = u32::try_from(next_arg().as_int()).unwrap_or(0xFFFD);
                pad(&spec, "", &char::from_u32(code).unwrap_or('\u{FFFD}').to_string(), false)
            }
            's' => {
                let mut text = next_arg().as_string();
                if let Some(limit) = spec.precision {
                    text = text.chars().take(limit).collect();
                }
                pad(&spec, "", &text, false)
            }
            'd' | 'i' => format_signed(&spec, next_arg().as_int()),
            'u' => format_radix(&spec, next_arg().as_int() as u64, 10, ""),
            'o' => format_radix(&spec, next_arg().as_int() as u64, 8, "0"),
            'x' => format_radix(&spec, next_arg().as_int() as u64, 16, "0x"),
            'X' => format_radix(&spec, next_arg().as_int() as u64, 16, "0X").to_uppercase(),
            'b' | 'B' => format_radix(&spec, next_arg().as_int() as u64, 2, "0b"),
            'e' | 'E' | 'f' | 'F' | 'g' | 'G' => format_float(&spec, next_arg().as_float(), conversion),
            other => {
                raw.push(other);
                raw
            }
        };
        out.push_str(&formatted);
    }
    out
}

/// Flags, width and precision following a `%`. Everything consumed is
/// also appended to `raw`.
fn parse_spec<'a>(
    chars: &mut Peekable<Chars<'_>>,
    args: &mut impl Iterator<Item = &'a Value>,
    raw: &mut String,
) -> Spec {
    let mut spec = Spec::default();
    while let Some(&c) = chars.peek() {
        match c {
            '-' => spec.left = true,
            '+' => spec.plus = true,
            ' ' => spec.space = true,
            '0' => spec.zero = true,
            '#' => spec.alt = true,
            _ => break,
        }
        raw.push(c);
        chars.next();
    }

    if chars.peek() == Some(&'*') {
        raw.push('*');
        chars.next();
        let width = args.next().map_or(0, Value::as_int);
        if width < 0 {
            spec.left = true;
        }
        spec.width = usize::try_from(width.unsigned_abs()).unwrap_or(0);
    } else {
        spec.width = read_number(chars, raw).unwrap_or(0);
    }

    if chars.peek() == Some(&'.') {
        raw.push('.');
        chars.next();
        if chars.peek() == Some(&'*') {
            raw.push('*');
            chars.next();
            let precision = args.next().map_or(0, Value::as_int);
            spec.precision = usize::try_from(precision).ok();
        } else {
            spec.precision = Some(read_number(chars, raw).unwrap_or(0));
        }
    }
    spec
}

fn read_number(chars: &mut Peekable<Chars<'_>>, raw: &mut String) -> Option<usize> {
    let mut digits = String::new();
    while let Some(&c) = chars.peek() {
        if !c.is_ascii_digit() {
            break;
        }
        digits.push(c);
        chars.next();
    }
    raw.push_str(&digits);
    digits.parse().ok()
}

/// Pad `body` (with its `sign` prefix) to the field width. Zero padding
/// goes between the sign and the digits.
fn pad(spec: &Spec, sign: &str, body: &str, numeric: bool) -> String {
    let len = sign.chars().count() + body.chars().count();
    let fill = spec.width.saturating_sub(len);
    if spec.left {
        format!("{sign}{body}{}", " ".repeat(fill))
    } else if spec.zero && numeric {
        format!("{sign}{}{body}", "0".repeat(fill))
    } else {
        format!("{}{sign}{body}", " ".repeat(fill))
    }
}

fn sign_prefix(spec: &Spec, negative: bool) -> &'static str {
    if negative {
        "-"
    } else if spec.plus {
        "+"
    } else if spec.space {
        " "
    } else {
        ""
    }
}

fn format_signed(spec: &Spec, n: i64) -> String {
    let mut digits = n.unsigned_abs().to_string();
    if let Some(precision) = spec.precision {
        if digits.len() < precision {
            digits = format!("{}{digits}", "0".repeat(precision - digits.len()));
        }
    }
    pad(spec, sign_prefix(spec, n < 0), &digits, spec.precision.is_none())
}

fn format_radix(spec: &Spec, n: u64, radix: u32, alt_prefix: &str) -> String {
    let mut digits = match radix {
        2 => format!("{n:b}"),
        8 => format!("{n:o}"),
        16 => format!("{n:x}"),
        _ => n.to_string(),
    };
    if let Some(precision) = spec.precision {
        if digits.len() < precision {
            digits = format!("{}{digits}", "0".repeat(precision - digits.len()));
        }
    }
    let prefix = if spec.alt && n != 0 { alt_prefix } else { "" };
    // octal's prefix is a leading zero digit
    if radix == 8 && !prefix.is_empty() && digits.starts_with('0') {
        return pad(spec, "", &digits, spec.precision.is_none());
    }
    pad(spec, prefix, &digits, spec.precision.is_none())
}

fn format_float(spec: &Spec, f: f64, conversion: char) -> String {
    if !f.is_finite() {
        let text = if f.is_nan() { "NaN" } else { "Inf" };
        let negative = f.is_sign_negative() && !f.is_nan();
        return pad(spec, sign_prefix(spec, negative), text, false);
    }
    let precision = spec.precision.unwrap_or(6);
    let magnitude = f.abs();
    let body = match conversion {
        'e' | 'E' => exponent_form(magnitude, precision),
        'g' | 'G' => format_general(magnitude, precision.max(1)),
        _ => {
            let fixed = format!("{magnitude:.precision$}");
            if spec.alt && precision == 0 {
                format!("{fixed}.")
            } else {
                fixed
            }
        }
    };
    let body = if conversion.is_ascii_uppercase() {
        body.to_uppercase()
    } else {
        body
    };
    pad(spec, sign_prefix(spec, f.is_sign_negative() && f != 0.0), &body, true)
}

/// `1.5e+03` style: at least two exponent digits, always signed.
fn exponent_form(f: f64, precision: usize) -> String {
    let formatted = format!("{f:.precision$e}");
    let Some((mantissa, exp)) = formatted.split_once('e') else {
        return formatted;
    };
    let exp: i32 = exp.parse().unwrap_or(0);
    let sign = if exp < 0 { '-' } else { '+' };
    format!("{mantissa}e{sign}{:02}", exp.abs())
}
