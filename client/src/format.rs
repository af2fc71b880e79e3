//! Presentation derivations. All pure functions of a snapshot; nothing here is stored.

use chrono::{DateTime, Utc};

use crate::types::{Address, Amount, RaffleSnapshot};

pub const NATIVE_DECIMALS: u32 = 18;
pub const NATIVE_SYMBOL: &str = "ETH";

const SECS_PER_MINUTE: u64 = 60;
const SECS_PER_HOUR: u64 = 60 * SECS_PER_MINUTE;
const SECS_PER_DAY: u64 = 24 * SECS_PER_HOUR;

fn scale(decimals: u32) -> Option<Amount> {
    Amount::from(10u8).checked_pow(Amount::from(decimals))
}

/// Decimal rendering without trailing fractional zeros: 10^18 at 18 decimals is "1".
pub fn format_units(amount: Amount, decimals: u32) -> String {
    let Some(scale) = scale(decimals) else {
        return amount.to_string();
    };
    let (whole, frac) = amount.div_rem(scale);
    if frac.is_zero() {
        return whole.to_string();
    }
    let digits = format!("{:0>width$}", frac.to_string(), width = decimals as usize);
    format!("{}.{}", whole, digits.trim_end_matches('0'))
}

pub fn format_amount(amount: Amount) -> String {
    format!("{} {}", format_units(amount, NATIVE_DECIMALS), NATIVE_SYMBOL)
}

/// Inverse of [`format_units`]; rejects more fractional digits than `decimals`.
pub fn parse_units(s: &str, decimals: u32) -> Result<Amount, String> {
    let s = s.trim();
    let (whole, frac) = s.split_once('.').unwrap_or((s, ""));
    if whole.is_empty() && frac.is_empty() {
        return Err("empty amount".to_string());
    }
    if !whole.chars().chain(frac.chars()).all(|c| c.is_ascii_digit()) {
        return Err(format!("invalid amount '{s}'"));
    }
    if frac.len() > decimals as usize {
        return Err(format!("more than {decimals} decimal places in '{s}'"));
    }

    let overflow = || format!("amount '{s}' is too large");
    let digits = |part: &str| -> Result<Amount, String> {
        if part.is_empty() {
            return Ok(Amount::ZERO);
        }
        Amount::from_str_radix(part, 10).map_err(|_| overflow())
    };
    let whole = digits(whole)?;
    let frac_scaled = digits(&format!("{:0<width$}", frac, width = decimals as usize))?;

    scale(decimals)
        .and_then(|scale| whole.checked_mul(scale))
        .and_then(|w| w.checked_add(frac_scaled))
        .ok_or_else(overflow)
}

/// Coarsest non-zero unit wins: days, then hours+minutes, minutes+seconds, seconds.
pub fn format_interval(secs: u64) -> String {
    let days = secs / SECS_PER_DAY;
    if days > 0 {
        return format!("{days} days");
    }
    let hours = secs / SECS_PER_HOUR;
    if hours > 0 {
        let minutes = (secs % SECS_PER_HOUR) / SECS_PER_MINUTE;
        return format!("{hours} hours {minutes} minutes");
    }
    let minutes = secs / SECS_PER_MINUTE;
    if minutes > 0 {
        let seconds = secs % SECS_PER_MINUTE;
        return format!("{minutes} minutes {seconds} seconds");
    }
    format!("{secs} seconds")
}

pub fn next_draw_datetime(snapshot: &RaffleSnapshot) -> Option<DateTime<Utc>> {
    let secs = i64::try_from(snapshot.next_draw_time()).ok()?;
    DateTime::<Utc>::from_timestamp(secs, 0)
}

pub fn format_next_draw(snapshot: &RaffleSnapshot) -> String {
    next_draw_datetime(snapshot)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Time left until the next draw, measured from `now` (unix seconds).
pub fn format_countdown(snapshot: &RaffleSnapshot, now: u64) -> String {
    format_interval(snapshot.next_draw_time().saturating_sub(now))
}

pub fn format_winner(winner: Option<Address>) -> String {
    winner
        .map(|w| w.to_string())
        .unwrap_or_else(|| "none".to_string())
}
