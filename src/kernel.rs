//! The ASCII kernel interface (spec §4.9 / §6): a pure, reentrant function
//! from pixels to glyphs. Its real implementation is explicitly out of
//! scope for this crate; what's defined here is the trait boundary plus a
//! minimal built-in implementation so the server is runnable and testable
//! standalone, treating the kernel as an external collaborator configured
//! once and called per-frame without the caller owning its internals.

use crate::error::KernelError;

/// The ramp of characters from "empty" to "full" used to map per-cell
/// brightness to a glyph.
pub struct Palette(pub Vec<char>);

impl Default for Palette {
    fn default() -> Self {
        Self(" .:-=+*#%@".chars().collect())
    }
}

/// The rendered glyphs for one cell: a UTF-8 byte sequence including any
/// inline color escapes, with no trailing newline.
pub struct AsciiCells {
    pub data: Vec<u8>,
}

/// External collaborator interface. Implementations must be reentrant and
/// side-effect-free — they may be called concurrently from multiple
/// clients' video workers.
pub trait AsciiKernel: Send + Sync {
    fn render(
        &self,
        pixels: &[u8],
        src_w: u32,
        src_h: u32,
        target_cols: u16,
        target_rows: u16,
        palette: &Palette,
    ) -> Result<AsciiCells, KernelError>;
}

/// A minimal brightness-ramp kernel: box-averages each output cell's source
/// region and maps luminance onto `palette`, wrapping the glyph in a
/// 24-bit-color escape for the cell's average RGB.
pub struct BlockAsciiKernel;

impl AsciiKernel for BlockAsciiKernel {
    fn render(
        &self,
        pixels: &[u8],
        src_w: u32,
        src_h: u32,
        target_cols: u16,
        target_rows: u16,
        palette: &Palette,
    ) -> Result<AsciiCells, KernelError> {
        if src_w == 0 || src_h == 0 {
            return Err(KernelError::RenderFailed("zero-sized source frame".into()));
        }
        if pixels.len() != src_w as usize * src_h as usize * 3 {
            return Err(KernelError::RenderFailed(
                "pixel buffer length does not match src_w*src_h*3".into(),
            ));
        }
        if target_cols == 0 || target_rows == 0 {
            return Err(KernelError::RenderFailed("zero-sized target".into()));
        }

        let ramp = if palette.0.is_empty() {
            Palette::default().0
        } else {
            palette.0.clone()
        };

        let mut out = Vec::with_capacity(target_cols as usize * target_rows as usize * 20);

        for row in 0..target_rows {
            let y0 = (row as u32 * src_h) / target_rows as u32;
            let y1 = (((row + 1) as u32 * src_h) / target_rows as u32).max(y0 + 1).min(src_h);
            for col in 0..target_cols {
                let x0 = (col as u32 * src_w) / target_cols as u32;
                let x1 = (((col + 1) as u32 * src_w) / target_cols as u32)
                    .max(x0 + 1)
                    .min(src_w);

                let (mut r_sum, mut g_sum, mut b_sum, mut n) = (0u64, 0u64, 0u64, 0u64);
                for y in y0..y1 {
                    for x in x0..x1 {
                        let idx = (y as usize * src_w as usize + x as usize) * 3;
                        r_sum += pixels[idx] as u64;
                        g_sum += pixels[idx + 1] as u64;
                        b_sum += pixels[idx + 2] as u64;
                        n += 1;
                    }
                }
                let n = n.max(1);
                let (r, g, b) = ((r_sum / n) as u8, (g_sum / n) as u8, (b_sum / n) as u8);
                let luma = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
                let ramp_idx = ((luma / 255.0) * (ramp.len() - 1) as f32).round() as usize;
                let glyph = ramp[ramp_idx.min(ramp.len() - 1)];

                out.extend_from_slice(format!("\x1b[38;2;{r};{g};{b}m{glyph}").as_bytes());
            }
            out.extend_from_slice(b"\x1b[0m");
            if row + 1 != target_rows {
                out.push(b'\n');
            }
        }

        Ok(AsciiCells { data: out })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_expected_row_count() {
        let kernel = BlockAsciiKernel;
        let pixels = vec![200u8; 8 * 8 * 3];
        let cells = kernel.render(&pixels, 8, 8, 4, 2, &Palette::default()).unwrap();
        assert_eq!(cells.data.iter().filter(|&&b| b == b'\n').count(), 1);
    }

    #[test]
    fn rejects_mismatched_pixel_buffer() {
        let kernel = BlockAsciiKernel;
        let pixels = vec![0u8; 10];
        assert!(kernel.render(&pixels, 8, 8, 4, 2, &Palette::default()).is_err());
    }

    #[test]
    fn rejects_zero_sized_target() {
        let kernel = BlockAsciiKernel;
        let pixels = vec![0u8; 8 * 8 * 3];
        assert!(kernel.render(&pixels, 8, 8, 0, 2, &Palette::default()).is_err());
    }
}
