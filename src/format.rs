//! Report formatting helpers

/// Format milliseconds rounded to `granularity`, with thousands separators
/// and a non-breaking space before the unit: `1,200 ms`.
pub fn format_milliseconds(ms: f64, granularity: f64) -> String {
    let granularity = if granularity > 0.0 { granularity } else { 1.0 };
    let rounded = (ms / granularity).round() * granularity;
    let decimals = if granularity >= 1.0 { 0 } else { 3 };

    let mut text = format!("{:.*}", decimals, rounded.abs());
    if decimals > 0 {
        let trimmed = text.trim_end_matches('0').trim_end_matches('.').len();
        text.truncate(trimmed);
    }
    let (int_part, frac_part) = match text.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (text.as_str(), None),
    };

    let mut out = String::new();
    let is_zero = text.chars().all(|c| c == '0' || c == '.');
    if rounded < 0.0 && !is_zero {
        out.push('-');
    }
    out.push_str(&group_thousands(int_part));
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    out.push_str("\u{a0}ms");
    out
}

fn group_thousands(digits: &str) -> String {
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}
