//! Technical indicators over daily series.
//!
//! Series are oldest-first. Windowed indicators return one entry per input
//! value, `None` where the window is not yet full.

/// Rolling arithmetic mean.
pub fn sma(values: &[f64], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; values.len()];
    }

    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;
    for (i, v) in values.iter().enumerate() {
        sum += v;
        if i >= window {
            sum -= values[i - window];
        }
        out.push((i + 1 >= window).then(|| sum / window as f64));
    }
    out
}

/// Exponentially weighted mean with `alpha = 2 / (span + 1)` and adjusted
/// weights, so early values are not biased toward the first observation.
pub fn ema(values: &[f64], span: usize) -> Vec<f64> {
    let alpha = 2.0 / (span as f64 + 1.0);
    let decay = 1.0 - alpha;

    let mut num = 0.0;
    let mut den = 0.0;
    values
        .iter()
        .map(|v| {
            num = v + decay * num;
            den = 1.0 + decay * den;
            num / den
        })
        .collect()
}

/// Gains and losses between consecutive values. The first entry is zero.
fn gains_losses(closes: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let mut gains = Vec::with_capacity(closes.len());
    let mut losses = Vec::with_capacity(closes.len());
    for i in 0..closes.len() {
        let delta = if i == 0 { 0.0 } else { closes[i] - closes[i - 1] };
        gains.push(delta.max(0.0));
        losses.push((-delta).max(0.0));
    }
    (gains, losses)
}

fn rsi_from_averages(avg_gain: f64, avg_loss: f64) -> Option<f64> {
    if avg_loss == 0.0 {
        return (avg_gain > 0.0).then_some(100.0);
    }
    let rs = avg_gain / avg_loss;
    Some(100.0 - 100.0 / (1.0 + rs))
}

/// RSI from simple rolling means of gains and losses.
///
/// A window with no losses reads 100; a window with no movement at all is
/// undefined.
pub fn rsi(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let (gains, losses) = gains_losses(closes);
    sma(&gains, period)
        .into_iter()
        .zip(sma(&losses, period))
        .map(|(g, l)| match (g, l) {
            (Some(g), Some(l)) => rsi_from_averages(g, l),
            _ => None,
        })
        .collect()
}

/// RSI with Wilder smoothing. The first value appears once `period` price
/// changes are available. A flat window reads 0.
pub fn rsi_wilder(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; closes.len()];
    if period == 0 || closes.len() <= period {
        return out;
    }

    let (gains, losses) = gains_losses(closes);
    let p = period as f64;
    let mut avg_gain = gains[1..=period].iter().sum::<f64>() / p;
    let mut avg_loss = losses[1..=period].iter().sum::<f64>() / p;

    let value = |g: f64, l: f64| {
        if g + l == 0.0 {
            0.0
        } else {
            100.0 * g / (g + l)
        }
    };

    out[period] = Some(value(avg_gain, avg_loss));
    for i in period + 1..closes.len() {
        avg_gain = (avg_gain * (p - 1.0) + gains[i]) / p;
        avg_loss = (avg_loss * (p - 1.0) + losses[i]) / p;
        out[i] = Some(value(avg_gain, avg_loss));
    }
    out
}

/// MACD line (EMA12 - EMA26) and its EMA9 signal line.
pub fn macd(closes: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let fast = ema(closes, 12);
    let slow = ema(closes, 26);
    let line: Vec<f64> = fast.iter().zip(&slow).map(|(f, s)| f - s).collect();
    let signal = ema(&line, 9);
    (line, signal)
}

/// Percent change against the value `lag` steps back.
pub fn pct_change(values: &[f64], lag: usize) -> Vec<Option<f64>> {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            if lag == 0 || i < lag {
                return None;
            }
            let base = values[i - lag];
            (base != 0.0).then(|| (v - base) / base * 100.0)
        })
        .collect()
}

/// Last element of a windowed series, flattened.
pub fn last(series: &[Option<f64>]) -> Option<f64> {
    series.last().copied().flatten()
}
