//! Hilbert curve utilities for spatial locality.
//!
//! The Hilbert curve maps grid cells of any dimensionality to positions on a
//! line such that consecutive positions are neighbouring cells. Sorting by
//! the curve position keeps nearby entries together, which is what the
//! Hilbert bulk load relies on.
//!
//! Keys are 128 bits wide; the precision per dimension shrinks as the
//! dimensionality grows and only the first 128 dimensions are considered.

/// Maximum precision in bits per dimension.
const MAX_BITS: u32 = 32;

/// Maximum number of dimensions that take part in a key.
const MAX_DIMENSIONS: usize = 128;

/// Bits per dimension used for keys of `dimensionality` dimensions.
pub fn bits_per_dimension(dimensionality: usize) -> u32 {
    let dims = dimensionality.clamp(1, MAX_DIMENSIONS) as u32;
    (128 / dims).clamp(1, MAX_BITS)
}

/// Hilbert position of a grid cell.
///
/// Every coordinate of `cell` must be below `2^bits`.
///
/// # Example
/// ```
/// use proxima_spatial::hilbert::hilbert_key_of_cell;
///
/// // order-1 curve in 2D: (0,0) -> (0,1) -> (1,1) -> (1,0)
/// assert_eq!(hilbert_key_of_cell(&[0, 0], 1), 0);
/// assert_eq!(hilbert_key_of_cell(&[0, 1], 1), 1);
/// assert_eq!(hilbert_key_of_cell(&[1, 1], 1), 2);
/// assert_eq!(hilbert_key_of_cell(&[1, 0], 1), 3);
/// ```
pub fn hilbert_key_of_cell(cell: &[u32], bits: u32) -> u128 {
    let n = cell.len().min(MAX_DIMENSIONS);
    if n == 0 || bits == 0 {
        return 0;
    }
    let mut x: Vec<u32> = cell[..n].to_vec();
    axes_to_transpose(&mut x, bits);

    let mut key: u128 = 0;
    for b in (0..bits).rev() {
        for value in &x {
            key = (key << 1) | ((value >> b) & 1) as u128;
        }
    }
    key
}

/// Hilbert position of a point whose coordinates are normalized to `[0, 1]`.
pub fn hilbert_key(normalized: &[f64], bits: u32) -> u128 {
    let cells = 1u64 << bits;
    let cell: Vec<u32> = normalized
        .iter()
        .take(MAX_DIMENSIONS)
        .map(|v| {
            let scaled = (v.clamp(0.0, 1.0) * cells as f64) as u64;
            scaled.min(cells - 1) as u32
        })
        .collect();
    hilbert_key_of_cell(&cell, bits)
}

/// Hilbert position of `point` inside the box spanned by `lo` and `hi`.
///
/// Dimensions with no extent map to the lowest cell.
pub fn hilbert_key_bounded(point: &[f64], lo: &[f64], hi: &[f64], bits: u32) -> u128 {
    let normalized: Vec<f64> = point
        .iter()
        .zip(lo.iter().zip(hi.iter()))
        .map(|(v, (l, h))| {
            let extent = h - l;
            if extent > 0.0 {
                (v - l) / extent
            } else {
                0.0
            }
        })
        .collect();
    hilbert_key(&normalized, bits)
}

/// Converts cell coordinates in place to the transposed Hilbert index.
fn axes_to_transpose(x: &mut [u32], bits: u32) {
    let n = x.len();
    let m: u32 = 1 << (bits - 1);

    // inverse undo
    let mut q = m;
    while q > 1 {
        let p = q - 1;
        for i in 0..n {
            if x[i] & q != 0 {
                x[0] ^= p;
            } else {
                let t = (x[0] ^ x[i]) & p;
                x[0] ^= t;
                x[i] ^= t;
            }
        }
        q >>= 1;
    }

    // gray encode
    for i in 1..n {
        x[i] ^= x[i - 1];
    }
    let mut t = 0;
    let mut q = m;
    while q > 1 {
        if x[n - 1] & q != 0 {
            t ^= q - 1;
        }
        q >>= 1;
    }
    for value in x.iter_mut() {
        *value ^= t;
    }
}
