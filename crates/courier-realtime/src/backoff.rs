// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reconnect delay schedule.

use std::time::Duration;

/// Delay before reconnect attempt `attempt` (1-based): `base * 2^(attempt-1)`,
/// capped at `max`. Attempt 0 is treated as attempt 1.
pub fn reconnect_delay(base: Duration, max: Duration, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1);
    let factor = 1u32.checked_shl(exponent).unwrap_or(u32::MAX);
    base.checked_mul(factor).unwrap_or(Duration::MAX).min(max)
}
