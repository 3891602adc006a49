//! Shannon entropy over byte-frequency distributions

/// Computes `H = -Σ p_i·log2(p_i)` over the 256-symbol byte-frequency
/// distribution of `data`. Returns `0.0` for an empty range.
pub fn shannon_entropy(data: &[u8]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let mut counts = [0u64; 256];
    for &b in data {
        counts[b as usize] += 1;
    }
    let len = data.len() as f64;
    counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / len;
            -p * p.log2()
        })
        .sum()
}
