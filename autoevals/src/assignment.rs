//! Optimal one-to-one assignment (Hungarian method).

/// Pairs `(row, col)` maximizing the total of `matrix[row][col]`.
///
/// The matrix may be rectangular; exactly `min(rows, cols)` pairs are
/// returned, sorted by row. Non-finite entries are treated as 0.
pub fn maximize_assignment(matrix: &[Vec<f64>]) -> Vec<(usize, usize)> {
    let rows = matrix.len();
    let cols = matrix.first().map_or(0, Vec::len);
    if rows == 0 || cols == 0 {
        return Vec::new();
    }

    let weight = |r: usize, c: usize| {
        let value = matrix[r].get(c).copied().unwrap_or(0.0);
        if value.is_finite() { value } else { 0.0 }
    };

    // The solver needs rows <= cols, so work on the transpose when it doesn't hold.
    let mut pairs = if rows <= cols {
        minimize(rows, cols, |r, c| -weight(r, c))
    } else {
        minimize(cols, rows, |r, c| -weight(c, r)).into_iter().map(|(r, c)| (c, r)).collect()
    };
    pairs.sort_unstable();
    pairs
}

/// Minimum-cost assignment of every row of an `n x m` cost matrix (`n <= m`)
/// using potentials, O(n^2 m).
fn minimize(n: usize, m: usize, cost: impl Fn(usize, usize) -> f64) -> Vec<(usize, usize)> {
    let mut u = vec![0.0; n + 1];
    let mut v = vec![0.0; m + 1];
    // p[j]: row (1-based) matched to column j; 0 means free.
    let mut p = vec![0usize; m + 1];
    let mut way = vec![0usize; m + 1];

    for i in 1..=n {
        p[0] = i;
        let mut j0 = 0;
        let mut minv = vec![f64::INFINITY; m + 1];
        let mut used = vec![false; m + 1];

        loop {
            used[j0] = true;
            let i0 = p[j0];
            let mut delta = f64::INFINITY;
            let mut j1 = 0;
            for j in 1..=m {
                if used[j] {
                    continue;
                }
                let reduced = cost(i0 - 1, j - 1) - u[i0] - v[j];
                if reduced < minv[j] {
                    minv[j] = reduced;
                    way[j] = j0;
                }
                if minv[j] < delta {
                    delta = minv[j];
                    j1 = j;
                }
            }
            for j in 0..=m {
                if used[j] {
                    u[p[j]] += delta;
                    v[j] -= delta;
                } else {
                    minv[j] -= delta;
                }
            }
            j0 = j1;
            if p[j0] == 0 {
                break;
            }
        }

        loop {
            let j1 = way[j0];
            p[j0] = p[j1];
            j0 = j1;
            if j0 == 0 {
                break;
            }
        }
    }

    (1..=m).filter(|&j| p[j] != 0).map(|j| (p[j] - 1, j - 1)).collect()
}
