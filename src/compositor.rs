//! Lays out a snapshot of other clients' latest frames into a grid sized to
//! the requesting client's terminal and calls the ASCII kernel per cell
//! (spec §4.5 / §4.6 step 6-8).

use std::sync::Arc;

use tracing::warn;

use crate::frame::{AsciiFrame, RawImageFrame};
use crate::grid::compute_grid;
use crate::kernel::{AsciiKernel, Palette};

pub struct GridCompositor {
    kernel: Arc<dyn AsciiKernel>,
    palette: Palette,
}

impl GridCompositor {
    pub fn new(kernel: Arc<dyn AsciiKernel>) -> Self {
        Self {
            kernel,
            palette: Palette::default(),
        }
    }

    /// `sources` is a snapshot of (client_id, frame) pairs already detached
    /// from the registry lock — the caller is responsible for not holding
    /// any cross-client lock while this runs (spec §4.6 step 5).
    ///
    /// Returns `None` when there is nothing to lay out or the terminal size
    /// is degenerate; the caller decides what placeholder, if any, to send.
    pub fn compose(
        &self,
        sources: &[(u32, Arc<RawImageFrame>)],
        term_cols: u16,
        term_rows: u16,
    ) -> Option<AsciiFrame> {
        if sources.is_empty() || term_cols == 0 || term_rows == 0 {
            return None;
        }

        let aspects: Vec<f32> = sources.iter().map(|(_, f)| f.aspect_ratio()).collect();
        let layout = compute_grid(sources.len(), term_cols, term_rows, &aspects)?;

        let mut screen = Vec::new();
        let mut cell_idx = 0usize;
        for row in 0..layout.rows {
            for col in 0..layout.cols {
                if cell_idx >= sources.len() {
                    break;
                }
                let (_, src) = &sources[cell_idx];
                cell_idx += 1;

                let origin_row = row as u32 * (layout.cell_h as u32 + 2) + 1;
                let origin_col = col as u32 * (layout.cell_w as u32 + 2) + 1;
                screen.extend_from_slice(
                    format!("\x1b[{};{}H", origin_row, origin_col).as_bytes(),
                );

                match self.kernel.render(
                    &src.pixels,
                    src.width,
                    src.height,
                    layout.cell_w,
                    layout.cell_h,
                    &self.palette,
                ) {
                    Ok(cells) => screen.extend_from_slice(&cells.data),
                    Err(e) => {
                        // Per spec: a kernel failure logs and skips the
                        // whole tick rather than emitting a partial grid.
                        warn!("ascii kernel failed for cell ({row}, {col}): {e}");
                        return None;
                    }
                }
            }
        }

        Some(AsciiFrame {
            cols: term_cols,
            rows: term_rows,
            data: screen,
        })
    }

    /// The "empty grid" placeholder sent when a client has no contributing
    /// peers yet, so send cadence is maintained (spec §4.6 edge cases).
    pub fn empty_grid_placeholder(&self, term_cols: u16, term_rows: u16) -> AsciiFrame {
        let msg = b"\x1b[2J\x1b[H(waiting for other participants)";
        AsciiFrame {
            cols: term_cols,
            rows: term_rows,
            data: msg.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::BlockAsciiKernel;

    fn solid_frame(w: u32, h: u32, shade: u8) -> RawImageFrame {
        RawImageFrame::new(w, h, 0, vec![shade; w as usize * h as usize * 3])
    }

    #[test]
    fn empty_sources_yields_none() {
        let compositor = GridCompositor::new(Arc::new(BlockAsciiKernel));
        assert!(compositor.compose(&[], 80, 24).is_none());
    }

    #[test]
    fn zero_terminal_size_yields_none() {
        let compositor = GridCompositor::new(Arc::new(BlockAsciiKernel));
        let sources = vec![(1u32, Arc::new(solid_frame(4, 4, 128)))];
        assert!(compositor.compose(&sources, 0, 24).is_none());
    }

    #[test]
    fn composes_one_frame_per_source() {
        let compositor = GridCompositor::new(Arc::new(BlockAsciiKernel));
        let sources = vec![
            (1u32, Arc::new(solid_frame(4, 4, 50))),
            (2u32, Arc::new(solid_frame(4, 4, 200))),
        ];
        let frame = compositor.compose(&sources, 80, 24).unwrap();
        assert!(!frame.data.is_empty());
        assert_eq!(frame.cols, 80);
        assert_eq!(frame.rows, 24);
    }
}
