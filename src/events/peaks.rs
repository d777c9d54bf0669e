// Peak picking on one-dimensional curves
// Used to pre-select clap candidates from the onset-strength envelope

/// A local maximum of a curve
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Peak {
    pub index: usize,
    pub height: f32,
}

/// Find local maxima in `signal`
///
/// Algorithm:
/// 1. A peak is a sample strictly greater than its left neighbour and
///    followed by a (possibly flat) run that ends strictly lower.
///    Flat tops report the middle sample (rounded down).
/// 2. Peaks lower than `min_height` are dropped.
/// 3. Peaks are visited from highest to lowest (ties: later first, as
///    `scipy.signal.find_peaks` does); each kept peak removes every remaining
///    peak closer than `min_distance`.
///
/// Returned peaks are sorted by index. The first and last samples are never peaks.
pub fn find_peaks(signal: &[f32], min_height: Option<f32>, min_distance: usize) -> Vec<Peak> {
    let mut peaks = local_maxima(signal);

    if let Some(threshold) = min_height {
        peaks.retain(|peak| peak.height >= threshold);
    }

    if min_distance > 1 && peaks.len() > 1 {
        peaks = select_by_distance(&peaks, min_distance);
    }

    peaks
}

fn local_maxima(signal: &[f32]) -> Vec<Peak> {
    let mut peaks = Vec::new();
    if signal.len() < 3 {
        return peaks;
    }

    let last = signal.len() - 1;
    let mut i = 1;
    while i < last {
        if signal[i - 1] < signal[i] {
            // Walk across a plateau
            let mut ahead = i + 1;
            while ahead < last && signal[ahead] == signal[i] {
                ahead += 1;
            }

            if signal[ahead] < signal[i] {
                let right_edge = ahead - 1;
                let middle = (i + right_edge) / 2;
                peaks.push(Peak {
                    index: middle,
                    height: signal[middle],
                });
                i = ahead;
                continue;
            }
        }
        i += 1;
    }

    peaks
}

fn select_by_distance(peaks: &[Peak], min_distance: usize) -> Vec<Peak> {
    let mut order: Vec<usize> = (0..peaks.len()).collect();
    order.sort_by(|&a, &b| {
        peaks[b]
            .height
            .total_cmp(&peaks[a].height)
            .then(peaks[b].index.cmp(&peaks[a].index))
    });

    let mut keep = vec![true; peaks.len()];
    for &current in &order {
        if !keep[current] {
            continue;
        }

        // Peaks are sorted by index, so neighbours are contiguous
        let index = peaks[current].index;
        let mut k = current;
        while k > 0 && index - peaks[k - 1].index < min_distance {
            keep[k - 1] = false;
            k -= 1;
        }
        let mut k = current + 1;
        while k < peaks.len() && peaks[k].index - index < min_distance {
            keep[k] = false;
            k += 1;
        }
    }

    peaks
        .iter()
        .zip(keep)
        .filter_map(|(peak, kept)| kept.then_some(*peak))
        .collect()
}
