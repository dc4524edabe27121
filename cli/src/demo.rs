//! `otelwrap demo`: exponentiation by squaring built from nothing but
//! bit shifts and addition, every step an instrumented async call.
//!
//! Each call opens a span, so the emitted lines show the trace id shared
//! across the whole chain and a fresh span id per step.

use anyhow::{anyhow, bail, Result};
use std::time::Duration;
use tracing::instrument;

const STEP_DELAY: Duration = Duration::from_millis(10);

/// Shift left for positive `shift_by`, right for negative.
#[instrument(level = "debug")]
pub async fn bitshift(x: i64, shift_by: i32) -> Result<i64> {
    tokio::time::sleep(STEP_DELAY).await;

    if shift_by > 0 {
        tracing::debug!("bit-shifting x={} left by {}", x, shift_by);
        let shifted = x
            .checked_shl(shift_by as u32)
            .filter(|s| s >> shift_by == x)
            .ok_or_else(|| anyhow!("overflow shifting {x} left by {shift_by}"))?;
        Ok(shifted)
    } else if shift_by < 0 {
        tracing::debug!("bit-shifting x={} right by {}", x, -shift_by);
        Ok(x >> (-shift_by).min(63))
    } else {
        tracing::debug!("bit-shifting x={} by 0", x);
        Ok(x)
    }
}

/// Russian-peasant multiplication over [`bitshift`].
#[instrument]
pub async fn multiply(multiplier: i64, multiplicand: i64) -> Result<i64> {
    tokio::time::sleep(STEP_DELAY).await;
    tracing::info!("multiply multiplier={} by multiplicand={}", multiplier, multiplicand);

    let negative = multiplicand < 0;
    let mut multiplier = multiplier;
    let mut multiplicand = multiplicand
        .checked_abs()
        .ok_or_else(|| anyhow!("cannot negate {multiplicand}"))?;

    let mut accumulator: i64 = 0;
    while multiplicand != 0 {
        let before = multiplicand;
        multiplicand = bitshift(multiplicand, -1).await?;
        if before != bitshift(multiplicand, 1).await? {
            accumulator = accumulator
                .checked_add(multiplier)
                .ok_or_else(|| anyhow!("overflow accumulating product"))?;
        }
        if multiplicand != 0 {
            multiplier = bitshift(multiplier, 1).await?;
        }
    }

    if negative {
        accumulator
            .checked_neg()
            .ok_or_else(|| anyhow!("overflow negating product"))
    } else {
        Ok(accumulator)
    }
}

#[instrument]
pub async fn square(x: i64) -> Result<i64> {
    tokio::time::sleep(STEP_DELAY).await;

    if x < 0 {
        tracing::warn!("squaring absolute of negative integer abs(x={})", x);
    } else {
        tracing::info!("squaring non-negative number x={}", x);
    }
    let magnitude = x.checked_abs().ok_or_else(|| anyhow!("cannot negate {x}"))?;
    multiply(magnitude, magnitude).await
}

#[instrument]
pub async fn exponentiate(base: i64, exponent: i64) -> Result<i64> {
    tokio::time::sleep(STEP_DELAY).await;
    tracing::info!("exponentiate base={} by non-negative exponent={}", base, exponent);
    if exponent < 0 {
        bail!("exponent must be non-negative, got {exponent}");
    }

    let mut base = base;
    let mut exponent = exponent;
    let mut out = 1;
    while exponent != 0 {
        let before = exponent;
        exponent = bitshift(exponent, -1).await?;
        if before != bitshift(exponent, 1).await? {
            out = multiply(out, base).await?;
        }
        if exponent != 0 {
            base = square(base).await?;
        }
    }
    Ok(out)
}
