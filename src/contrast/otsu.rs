//! Otsu's threshold selection on a 256-bin luma histogram.

/// Build the luma histogram for a pixel region.
pub fn histogram(lumas: &[u8]) -> [u32; 256] {
    let mut hist = [0u32; 256];
    for &l in lumas {
        hist[l as usize] += 1;
    }
    hist
}

/// The threshold maximizing between-class variance.
///
/// All 256 candidates are scanned; ties keep the lowest threshold. The
/// darker class is `luma <= threshold`.
pub fn otsu_threshold(hist: &[u32; 256]) -> u8 {
    let total: u64 = hist.iter().map(|&c| c as u64).sum();
    if total == 0 {
        return 0;
    }
    let sum_all: u64 = hist
        .iter()
        .enumerate()
        .map(|(level, &count)| level as u64 * count as u64)
        .sum();

    let mut best_threshold = 0u8;
    let mut best_variance = f64::MIN;
    let mut weight_dark: u64 = 0;
    let mut sum_dark: u64 = 0;

    for t in 0..256usize {
        weight_dark += hist[t] as u64;
        if weight_dark == 0 {
            continue;
        }
        let weight_light = total - weight_dark;
        if weight_light == 0 {
            break;
        }
        sum_dark += t as u64 * hist[t] as u64;

        let mean_dark = sum_dark as f64 / weight_dark as f64;
        let mean_light = (sum_all - sum_dark) as f64 / weight_light as f64;
        let diff = mean_dark - mean_light;
        let variance = weight_dark as f64 * weight_light as f64 * diff * diff;
        if variance > best_variance {
            best_variance = variance;
            best_threshold = t as u8;
        }
    }
    best_threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bimodal_histogram_splits_between_modes() {
        // 70% of pixels at luma 20, 30% at luma 230
        let mut hist = [0u32; 256];
        hist[20] = 700;
        hist[230] = 300;
        let t = otsu_threshold(&hist);
        assert!(t > 20 && t < 230, "threshold {t} not between the modes");
    }

    #[test]
    fn test_noisy_bimodal_histogram() {
        let mut hist = [0u32; 256];
        for l in 15..=25 {
            hist[l] = 60;
        }
        for l in 200..=240 {
            hist[l] = 8;
        }
        let t = otsu_threshold(&hist);
        assert!(t > 25 && t < 200, "threshold {t} not between the clusters");
    }

    #[test]
    fn test_flat_and_empty_inputs_do_not_panic() {
        let empty = [0u32; 256];
        assert_eq!(otsu_threshold(&empty), 0);

        let uniform = [4u32; 256];
        let t = otsu_threshold(&uniform);
        // A symmetric histogram splits near the middle
        assert!(t > 100 && t < 156);
    }

    #[test]
    fn test_histogram_counts() {
        let hist = histogram(&[0, 0, 255, 10, 10, 10]);
        assert_eq!(hist[0], 2);
        assert_eq!(hist[10], 3);
        assert_eq!(hist[255], 1);
    }
}
