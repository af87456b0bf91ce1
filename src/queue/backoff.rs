//! Exponential backoff with jitter (spec §4.5): base 1s, factor 2, cap 60s,
//! jitter ±25%.

use rand::Rng;

#[must_use]
pub fn compute_delay_ms(base_ms: u64, attempt: u32, cap_ms: u64) -> u64 {
    let exp = base_ms.saturating_mul(1u64 << attempt.min(20));
    let capped = exp.min(cap_ms);
    let jitter_span = capped / 4; // ±25%
    if jitter_span == 0 {
        return capped;
    }
    let offset = rand::thread_rng().gen_range(0..=(jitter_span * 2));
    capped.saturating_sub(jitter_span).saturating_add(offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    /// Table-driven over the spec §4.5 backoff schedule (base 1s, factor 2,
    /// cap 60s, jitter ±25%): each row is one `attempt` and the `[min, max]`
    /// band its delay must land in.
    #[rstest]
    #[case(0, 750, 1_250)]
    #[case(1, 1_500, 2_500)]
    #[case(2, 3_000, 5_000)]
    #[case(3, 6_000, 10_000)]
    #[case(4, 12_000, 20_000)]
    #[case(10, 45_000, 75_000)] // past the cap, jitter is computed on 60s
    fn backoff_lands_in_expected_band(#[case] attempt: u32, #[case] min: u64, #[case] max: u64) {
        let delay = compute_delay_ms(1000, attempt, 60_000);
        assert!(
            delay >= min && delay <= max,
            "attempt {attempt}: expected [{min}, {max}], got {delay}"
        );
    }

    #[test]
    fn caps_at_configured_maximum() {
        let d = compute_delay_ms(1000, 10, 60_000);
        assert!(d <= 75_000);
    }

    #[test]
    fn zero_base_never_panics() {
        assert_eq!(compute_delay_ms(0, 5, 60_000), 0);
    }
}
