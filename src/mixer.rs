//! Linear audio mixer: sample-wise sum across contributing sources,
//! per-source gain fixed at 1.0, never normalized by source count (spec
//! §4.7 step 5 — normalizing would make total volume depend on who's
//! talking).

use crate::frame::AudioChunk;

/// Mix `chunks` (already excluding the recipient) into one chunk, clamped
/// to the codec's representable range.
pub fn mix(chunks: &[AudioChunk]) -> AudioChunk {
    let mut out = AudioChunk::silence();
    for chunk in chunks {
        for (dst, src) in out.samples.iter_mut().zip(chunk.samples.iter()) {
            *dst += src;
        }
    }
    for s in out.samples.iter_mut() {
        *s = s.clamp(-1.0, 1.0);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk_of(value: f32) -> AudioChunk {
        let mut c = AudioChunk::silence();
        c.samples.iter_mut().for_each(|s| *s = value);
        c
    }

    #[test]
    fn no_sources_is_silence() {
        let mixed = mix(&[]);
        assert!(mixed.samples.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn sums_without_normalizing_by_source_count() {
        let mixed = mix(&[chunk_of(0.2), chunk_of(0.2), chunk_of(0.2)]);
        assert!((mixed.samples[0] - 0.6).abs() < 1e-6);
    }

    #[test]
    fn clamps_to_representable_range() {
        let mixed = mix(&[chunk_of(0.8), chunk_of(0.8)]);
        assert_eq!(mixed.samples[0], 1.0);
    }

    #[test]
    fn mix_symmetry_excludes_only_the_recipient() {
        // A, B, C all contribute a distinct constant; A's mix must equal
        // B's mix restricted to the shared contributors (B, C vs A, C)
        // once the excluded party's own contribution is removed.
        let a = chunk_of(0.1);
        let b = chunk_of(0.2);
        let c = chunk_of(0.3);

        let mix_for_a = mix(&[b, c]); // excludes a
        let mix_for_b = mix(&[a, c]); // excludes b

        // c's contribution is identical in both; isolate it by subtracting
        // the other non-excluded, non-shared source.
        let c_contribution_via_a = mix_for_a.samples[0] - b.samples[0];
        let c_contribution_via_b = mix_for_b.samples[0] - a.samples[0];
        assert!((c_contribution_via_a - c_contribution_via_b).abs() < 1e-6);
    }
}
