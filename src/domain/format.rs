//! Number formatting for chat output

use rust_decimal::{Decimal, RoundingStrategy};

/// Group an integer with thousands separators, e.g. `1234567` -> `1,234,567`
pub fn format_with_thousands(value: u64) -> String {
    group_digits(&value.to_string())
}

/// Fixed-point decimal with a grouped integer part, rounded half away from zero
pub fn format_decimal(value: Decimal, dp: u32) -> String {
    let rounded = value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero);
    let text = format!("{:.*}", dp as usize, rounded);

    let (sign, unsigned) = match text.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", text.as_str()),
    };
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (unsigned, None),
    };

    let mut out = String::with_capacity(text.len() + text.len() / 3);
    // "-0.00" reads oddly
    if !sign.is_empty() && !rounded.is_zero() {
        out.push_str(sign);
    }
    out.push_str(&group_digits(int_part));
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    out
}

/// Percentage with an explicit sign, e.g. `+20.00%`
pub fn format_signed_percent(value: Decimal) -> String {
    let body = format_decimal(value, 2);
    if value.is_sign_positive() && !body.starts_with('-') {
        format!("+{body}%")
    } else {
        format!("{body}%")
    }
}

fn group_digits(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
