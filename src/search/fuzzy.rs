//! Bounded edit distance for typo-tolerant token matching.

/// Levenshtein distance between `a` and `b` if it does not exceed `max`,
/// otherwise `None`.
///
/// Uses a banded single-row computation; cells outside the band cannot lead
/// to a distance within `max`, so the scan aborts early once a whole row
/// exceeds the bound.
pub fn edit_distance_within(a: &str, b: &str, max: u32) -> Option<u32> {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    let (n, m) = (a.len(), b.len());
    if n.abs_diff(m) > max as usize {
        return None;
    }
    if n == 0 {
        return Some(m as u32);
    }
    if m == 0 {
        return Some(n as u32);
    }

    let mut prev: Vec<u32> = (0..=m as u32).collect();
    let mut curr = vec![0u32; m + 1];

    for i in 1..=n {
        curr[0] = i as u32;
        let mut row_min = curr[0];

        for j in 1..=m {
            let cost = u32::from(a[i - 1] != b[j - 1]);
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
            row_min = row_min.min(curr[j]);
        }

        if row_min > max {
            return None;
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    (prev[m] <= max).then_some(prev[m])
}
