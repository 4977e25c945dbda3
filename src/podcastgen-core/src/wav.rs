//! WAV packaging for raw linear PCM returned by the speech service.
//!
//! The speech service streams headerless PCM and describes it only through a
//! MIME string such as `audio/L16;codec=pcm;rate=24000`. [`pack`] turns that
//! into a self-contained RIFF/WAVE file that podcast clients can play.

use std::time::Duration;

/// Sample rate used when the MIME string carries no usable `rate=`.
pub const DEFAULT_SAMPLE_RATE: u32 = 24000;
/// Bit depth used when the MIME string carries no usable `audio/L<n>`.
pub const DEFAULT_BITS_PER_SAMPLE: u16 = 16;
/// Output is always mono.
pub const CHANNEL_COUNT: u16 = 1;
/// Size of the canonical PCM WAV header.
pub const WAV_HEADER_LEN: usize = 44;

const PCM_FORMAT_CODE: u16 = 1;
const FMT_CHUNK_LEN: u32 = 16;

/// Audio parameters recovered from a MIME type string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioParameters {
    pub sample_rate_hz: u32,
    pub bits_per_sample: u16,
    pub channel_count: u16,
}

impl Default for AudioParameters {
    fn default() -> Self {
        Self {
            sample_rate_hz: DEFAULT_SAMPLE_RATE,
            bits_per_sample: DEFAULT_BITS_PER_SAMPLE,
            channel_count: CHANNEL_COUNT,
        }
    }
}

impl AudioParameters {
    pub fn bytes_per_sample(&self) -> u16 {
        self.bits_per_sample / 8
    }

    pub fn block_align(&self) -> u16 {
        self.channel_count.saturating_mul(self.bytes_per_sample())
    }

    /// Saturates at `u32::MAX` for rates no real stream uses.
    pub fn byte_rate(&self) -> u32 {
        self.sample_rate_hz.saturating_mul(u32::from(self.block_align()))
    }

    /// Playback length of `data_size` bytes of PCM with these parameters.
    pub fn duration_for(&self, data_size: u64) -> Duration {
        let byte_rate = u64::from(self.byte_rate());
        if byte_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(data_size * 1000 / byte_rate)
    }
}

/// Parse a MIME type string such as `audio/L16;rate=24000`.
///
/// Never fails: segments that cannot be understood are skipped and the
/// missing values fall back to [`DEFAULT_SAMPLE_RATE`] and
/// [`DEFAULT_BITS_PER_SAMPLE`].
pub fn parse_audio_mime_type(mime_type: &str) -> AudioParameters {
    let mut params = AudioParameters::default();

    for segment in mime_type.split(';').map(str::trim) {
        if let Some(rate) = strip_prefix_ignore_case(segment, "rate=") {
            if let Ok(rate) = rate.trim().parse::<u32>() {
                params.sample_rate_hz = rate;
            }
        } else if let Some(bits) = strip_prefix_ignore_case(segment, "audio/l") {
            if let Ok(bits) = bits.trim().parse::<u16>() {
                params.bits_per_sample = bits;
            }
        }
    }

    params
}

/// Whether the MIME type describes headerless linear PCM (`audio/L<n>`).
pub fn is_raw_pcm(mime_type: &str) -> bool {
    let media_type = mime_type.split(';').next().unwrap_or_default().trim();
    strip_prefix_ignore_case(media_type, "audio/l").is_some()
}

/// Build the 44-byte RIFF header for `data_size` bytes of PCM.
pub fn wav_header(params: &AudioParameters, data_size: u32) -> [u8; WAV_HEADER_LEN] {
    let mut header = [0u8; WAV_HEADER_LEN];
    let fields: [&[u8]; 13] = [
        b"RIFF",
        &(36u32.saturating_add(data_size)).to_le_bytes(),
        b"WAVE",
        b"fmt ",
        &FMT_CHUNK_LEN.to_le_bytes(),
        &PCM_FORMAT_CODE.to_le_bytes(),
        &params.channel_count.to_le_bytes(),
        &params.sample_rate_hz.to_le_bytes(),
        &params.byte_rate().to_le_bytes(),
        &params.block_align().to_le_bytes(),
        &params.bits_per_sample.to_le_bytes(),
        b"data",
        &data_size.to_le_bytes(),
    ];

    let mut offset = 0;
    for field in fields {
        header[offset..offset + field.len()].copy_from_slice(field);
        offset += field.len();
    }

    header
}

/// Wrap raw PCM in a WAV container.
///
/// Payloads whose MIME type is not linear PCM are assumed to already be a
/// playable container and are returned unchanged.
pub fn pack(raw_audio: &[u8], mime_type: &str) -> Vec<u8> {
    if !is_raw_pcm(mime_type) {
        return raw_audio.to_vec();
    }

    let params = parse_audio_mime_type(mime_type);
    // RIFF sizes are 32-bit; longer payloads cannot be described faithfully.
    let data_size = u32::try_from(raw_audio.len()).unwrap_or(u32::MAX);

    let mut out = Vec::with_capacity(WAV_HEADER_LEN + raw_audio.len());
    out.extend_from_slice(&wav_header(&params, data_size));
    out.extend_from_slice(raw_audio);
    out
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        Some(&s[prefix.len()..])
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn u32_at(bytes: &[u8], offset: usize) -> u32 {
        u32::from_le_bytes(bytes[offset..offset + 4].try_into().unwrap())
    }

    fn u16_at(bytes: &[u8], offset: usize) -> u16 {
        u16::from_le_bytes(bytes[offset..offset + 2].try_into().unwrap())
    }

    #[test]
    fn test_pack_l16_scenario() {
        let out = pack(&[1, 2, 3, 4], "audio/L16;rate=24000");

        assert_eq!(out.len(), 48);
        assert_eq!(&out[0..4], b"RIFF");
        assert_eq!(u32_at(&out, 4), 40);
        assert_eq!(&out[8..12], b"WAVE");
        assert_eq!(&out[12..16], b"fmt ");
        assert_eq!(u32_at(&out, 16), 16);
        assert_eq!(u16_at(&out, 20), 1);
        assert_eq!(u16_at(&out, 22), 1);
        assert_eq!(u32_at(&out, 24), 24000);
        assert_eq!(u32_at(&out, 28), 48000);
        assert_eq!(u16_at(&out, 32), 2);
        assert_eq!(u16_at(&out, 34), 16);
        assert_eq!(&out[36..40], b"data");
        assert_eq!(u32_at(&out, 40), 4);
        assert_eq!(&out[44..], &[1, 2, 3, 4]);
    }

    #[test]
    fn test_pack_lengths_for_various_formats() {
        for mime in ["audio/L8;rate=8000", "audio/L16;rate=44100", "audio/L24;rate=48000"] {
            for len in [0usize, 1, 7, 480] {
                let payload = vec![0xAB; len];
                let out = pack(&payload, mime);
                assert_eq!(out.len(), WAV_HEADER_LEN + len, "{mime} / {len}");
                assert_eq!(u32_at(&out, 4), 36 + len as u32);
                assert_eq!(u32_at(&out, 40), len as u32);
            }
        }
    }

    #[test]
    fn test_pack_empty_payload_is_header_only() {
        let out = pack(&[], "audio/L16;rate=24000");
        assert_eq!(out.len(), 44);
        assert_eq!(u32_at(&out, 40), 0);
        assert_eq!(u32_at(&out, 4), 36);
    }

    #[test]
    fn test_parse_defaults_when_nothing_recognisable() {
        let params = parse_audio_mime_type("audio/L;rate=fast;codec=pcm");
        assert_eq!(params, AudioParameters::default());
        assert_eq!(params.sample_rate_hz, 24000);
        assert_eq!(params.bits_per_sample, 16);
        assert_eq!(params.channel_count, 1);
    }

    #[test]
    fn test_parse_rate_is_case_insensitive() {
        let params = parse_audio_mime_type("audio/L24 ; RATE=16000");
        assert_eq!(params.sample_rate_hz, 16000);
        assert_eq!(params.bits_per_sample, 24);
        assert_eq!(params.block_align(), 3);
        assert_eq!(params.byte_rate(), 48000);
    }

    #[test]
    fn test_pack_uses_defaults_for_bare_pcm_type() {
        let out = pack(&[0; 10], "audio/l16");
        assert_eq!(u32_at(&out, 24), DEFAULT_SAMPLE_RATE);
        assert_eq!(u16_at(&out, 34), DEFAULT_BITS_PER_SAMPLE);
        assert_eq!(u16_at(&out, 22), CHANNEL_COUNT);
    }

    #[test]
    fn test_pack_passes_through_containers() {
        let mp3 = b"ID3\x03\x00fake".to_vec();
        assert_eq!(pack(&mp3, "audio/mpeg"), mp3);
        assert_eq!(pack(&mp3, "audio/wav"), mp3);
    }

    #[test]
    fn test_pack_is_deterministic() {
        let payload: Vec<u8> = (0..=255).collect();
        let a = pack(&payload, "audio/L16;codec=pcm;rate=22050");
        let b = pack(&payload, "audio/L16;codec=pcm;rate=22050");
        assert_eq!(a, b);
    }

    #[test]
    fn test_packed_output_is_readable_wav() {
        let samples: [i16; 4] = [0, 1000, -1000, 32767];
        let payload: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        let out = pack(&payload, "audio/L16;rate=24000");

        let mut reader = hound::WavReader::new(Cursor::new(out)).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, 24000);
        assert_eq!(spec.bits_per_sample, 16);
        let decoded: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(decoded, samples);
    }

    #[test]
    fn test_duration_for() {
        let params = parse_audio_mime_type("audio/L16;rate=24000");
        assert_eq!(params.duration_for(48000 * 90), Duration::from_secs(90));
        assert_eq!(params.duration_for(0), Duration::ZERO);
    }

    #[test]
    fn test_pack_huge_rate_saturates_byte_rate() {
        let out = pack(&[1, 2, 3, 4], "audio/L16;rate=3000000000");

        assert_eq!(out.len(), 48);
        assert_eq!(u32_at(&out, 24), 3_000_000_000);
        assert_eq!(u32_at(&out, 28), u32::MAX);
        assert_eq!(u16_at(&out, 32), 2);
    }

    #[test]
    fn test_lowercase_pcm_type_keeps_bit_depth() {
        let out = pack(&[0; 6], "audio/l24;rate=48000");

        assert_eq!(out.len(), 50);
        assert_eq!(u32_at(&out, 24), 48000);
        assert_eq!(u32_at(&out, 28), 144000);
        assert_eq!(u16_at(&out, 32), 3);
        assert_eq!(u16_at(&out, 34), 24);
    }

    #[test]
    fn test_header_riff_size_saturates() {
        let header = wav_header(&AudioParameters::default(), u32::MAX);
        assert_eq!(u32_at(&header, 4), u32::MAX);
        assert_eq!(u32_at(&header, 40), u32::MAX);
    }
}
