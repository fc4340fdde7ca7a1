//! # Business Codes
//!
//! Human-readable identifiers printed on labels and receipts.
//!
//! | Entity        | Format                               | Example              |
//! |---------------|--------------------------------------|----------------------|
//! | Stock serial  | base36(millis)[7] + base36(seq)[3]   | `MB1K2QX001`         |
//! | Transaction   | `SL`/`PR` + YYYYMMDD + 8 hex         | `SL20261018A1B2C3D4` |
//! | Transfer      | `TRF` + unix millis + 4 hex          | `TRF17607...9F3A`    |
//! | Raw material  | `RM` + unix millis + 4 hex           | `RM17607...0C1D`     |
//! | Member        | `MBR` + unix millis + 4 hex          | `MBR17607...77E0`    |
//!
//! Uniqueness is ultimately enforced by partial unique indexes; the random
//! suffixes make collisions between concurrent cashiers improbable and the
//! storage layer retries the rare serial clash.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::types::TransactionType;

const SERIAL_BASE_WIDTH: usize = 7;
const SERIAL_SEQ_WIDTH: usize = 3;

/// Uppercase base-36 rendering of `n`.
///
/// ```rust
/// use aurum_core::codes::base36;
///
/// assert_eq!(base36(0), "0");
/// assert_eq!(base36(35), "Z");
/// assert_eq!(base36(36), "10");
/// ```
pub fn base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// Left-pads with zeros, or keeps only the last `width` characters.
fn fixed_width(s: &str, width: usize) -> String {
    if s.len() >= width {
        s[s.len() - width..].to_string()
    } else {
        format!("{:0>width$}", s, width = width)
    }
}

/// Serial numbers for one receiving batch.
///
/// Every serial shares the time-derived base of the batch and carries its
/// 1-based position as a three-character suffix, so serials within a batch
/// never collide and sort in receiving order.
pub fn serial_numbers(batch_millis: i64, count: u32) -> Vec<String> {
    let base = fixed_width(&base36(batch_millis.unsigned_abs()), SERIAL_BASE_WIDTH);
    (1..=count as u64)
        .map(|seq| format!("{}{}", base, fixed_width(&base36(seq), SERIAL_SEQ_WIDTH)))
        .collect()
}

fn random_hex(len: usize) -> String {
    let hex = Uuid::new_v4().simple().to_string().to_uppercase();
    hex[..len.min(hex.len())].to_string()
}

/// Transaction code, e.g. `SL20261018A1B2C3D4`.
pub fn transaction_code(transaction_type: TransactionType, at: DateTime<Utc>) -> String {
    format!(
        "{}{}{}",
        transaction_type.code_prefix(),
        at.format("%Y%m%d"),
        random_hex(8)
    )
}

/// Transfer number, e.g. `TRF1760774400000` + 4 hex.
pub fn transfer_number(at: DateTime<Utc>) -> String {
    format!("TRF{}{}", at.timestamp_millis(), random_hex(4))
}

/// Raw material code, e.g. `RM1760774400000` + 4 hex.
pub fn raw_material_code(at: DateTime<Utc>) -> String {
    format!("RM{}{}", at.timestamp_millis(), random_hex(4))
}

/// Member code, e.g. `MBR1760774400000` + 4 hex.
pub fn member_code(at: DateTime<Utc>) -> String {
    format!("MBR{}{}", at.timestamp_millis(), random_hex(4))
}

// =============================================================================
// Unit Tests
// =============================================================================
