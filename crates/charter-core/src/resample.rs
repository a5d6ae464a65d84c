//! Candle aggregation into coarser bins.

use crate::candle::Candle;
use crate::timeframe::Resolution;

/// An aggregated bin and the number of source candles it absorbed.
#[derive(Debug, Clone, Copy)]
struct Bin {
    candle: Candle,
    members: usize,
}

/// Aggregate candles into `resolution`-sized bins.
///
/// open=first, high=max, low=min, close=last, volume=sum. Each bin is stamped
/// with its left edge. Empty bins are not emitted. With `cut_partial_bins`,
/// the first and last bins are dropped when they hold fewer candles than the
/// second-to-last bin.
pub fn aggregate_candles(
    candles: &[Candle],
    resolution: Resolution,
    cut_partial_bins: bool,
) -> Vec<Candle> {
    let bins = collect_bins(candles, resolution);
    let (lo, hi) = if cut_partial_bins {
        partial_bin_range(&bins)
    } else {
        (0, bins.len())
    };
    bins[lo..hi].iter().map(|bin| bin.candle).collect()
}

fn collect_bins(candles: &[Candle], resolution: Resolution) -> Vec<Bin> {
    let mut bins: Vec<Bin> = Vec::new();

    for candle in candles {
        let bin_start = resolution.bin_start(candle.time);

        match bins.last_mut() {
            Some(bin) if bin.candle.time == bin_start => {
                // Same bin - update high, low, close, accumulate volume
                bin.candle.high = bin.candle.high.max(candle.high);
                bin.candle.low = bin.candle.low.min(candle.low);
                bin.candle.close = candle.close;
                bin.candle.volume += candle.volume;
                bin.members += 1;
            }
            _ => bins.push(Bin {
                candle: Candle {
                    time: bin_start,
                    ..*candle
                },
                members: 1,
            }),
        }
    }

    bins
}

/// Index range of bins kept by the partial-bin heuristic.
///
/// The second-to-last bin is taken as the reference for a full bin; only the
/// two edge bins are candidates for removal.
fn partial_bin_range(bins: &[Bin]) -> (usize, usize) {
    if bins.len() < 2 {
        return (0, bins.len());
    }
    let full = bins[bins.len() - 2].members;
    let lo = usize::from(bins[0].members < full);
    let hi = if bins[bins.len() - 1].members < full {
        bins.len() - 1
    } else {
        bins.len()
    };
    (lo, hi.max(lo))
}
