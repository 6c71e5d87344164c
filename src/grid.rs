//! Derives a `rows × cols` layout for `num_sources` video tiles inside a
//! `term_w × term_h` terminal. Pure function of its inputs, so it is
//! automatically stable across frames when those inputs don't change
//! (spec §3, `GridLayout`).

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridLayout {
    pub rows: u16,
    pub cols: u16,
    /// Cell size in terminal cells, net of the one-cell border.
    pub cell_w: u16,
    pub cell_h: u16,
}

/// One cell's pixel rectangle is `cell_w × cell_h` minus a one-cell border
/// on each side (spec §3). Returns `None` for the documented edge cases:
/// zero sources (caller emits an empty-grid placeholder instead) or zero
/// terminal size (caller skips the tick).
pub fn compute_grid(num_sources: usize, term_w: u16, term_h: u16, source_aspects: &[f32]) -> Option<GridLayout> {
    if num_sources == 0 || term_w == 0 || term_h == 0 {
        return None;
    }

    let avg_aspect = if source_aspects.is_empty() {
        1.0
    } else {
        source_aspects.iter().sum::<f32>() / source_aspects.len() as f32
    };

    let m = num_sources as u32;
    // (aspect-match score, cols) compared lexicographically, smallest wins:
    // the sole tie-break rule is closest cell-to-source aspect ratio; `cols`
    // only breaks ties between layouts with an identical score, for a fully
    // deterministic result.
    let mut best: Option<(u32, u32, u32)> = None; // (score_bits, rows, cols)

    for cols in 1..=m {
        let rows = m.div_ceil(cols);
        let cell_w = term_w as f32 / cols as f32;
        let cell_h = term_h as f32 / rows as f32;
        if cell_w < 1.0 || cell_h < 1.0 {
            continue;
        }
        let cell_aspect = cell_w / cell_h;
        let score = (cell_aspect - avg_aspect).abs();
        let key = (score.to_bits(), rows, cols);

        let better = match best {
            None => true,
            Some((b_score_bits, _, b_cols)) => (score.to_bits(), cols) < (b_score_bits, b_cols),
        };

        if better {
            best = Some(key);
        }
    }

    let (_, rows, cols) = best?;
    let cell_w = (term_w / cols as u16).saturating_sub(2).max(1);
    let cell_h = (term_h / rows as u16).saturating_sub(2).max(1);

    Some(GridLayout {
        rows: rows as u16,
        cols: cols as u16,
        cell_w,
        cell_h,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_sources_has_no_layout() {
        assert!(compute_grid(0, 80, 24, &[]).is_none());
    }

    #[test]
    fn zero_terminal_size_has_no_layout() {
        assert!(compute_grid(2, 0, 24, &[1.0]).is_none());
        assert!(compute_grid(2, 80, 0, &[1.0]).is_none());
    }

    #[test]
    fn single_source_is_one_by_one() {
        let layout = compute_grid(1, 80, 24, &[1.33]).unwrap();
        assert_eq!((layout.rows, layout.cols), (1, 1));
    }

    #[test]
    fn layout_covers_all_sources() {
        for m in 1..=9usize {
            let layout = compute_grid(m, 200, 60, &vec![1.33; m]).unwrap();
            assert!((layout.rows as usize) * (layout.cols as usize) >= m);
        }
    }

    #[test]
    fn layout_is_stable_for_fixed_inputs() {
        let a = compute_grid(5, 160, 48, &[1.33; 5]);
        let b = compute_grid(5, 160, 48, &[1.33; 5]);
        assert_eq!(a, b);
    }
}
