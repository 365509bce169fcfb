//! Media fixtures
//!
//! Small files that pass MIME sniffing, written into a caller-owned temp dir.

use bgm_client::FormState;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Write a short silent 16-bit mono WAV file
pub fn write_test_wav(dir: &Path, name: &str, samples: u32) -> PathBuf {
    let data_len = samples * 2;
    let mut bytes = Vec::with_capacity(44 + data_len as usize);

    bytes.extend_from_slice(b"RIFF");
    bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
    bytes.extend_from_slice(b"WAVE");
    bytes.extend_from_slice(b"fmt ");
    bytes.extend_from_slice(&16u32.to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes()); // PCM
    bytes.extend_from_slice(&1u16.to_le_bytes()); // mono
    bytes.extend_from_slice(&44_100u32.to_le_bytes());
    bytes.extend_from_slice(&(44_100u32 * 2).to_le_bytes());
    bytes.extend_from_slice(&2u16.to_le_bytes());
    bytes.extend_from_slice(&16u16.to_le_bytes());
    bytes.extend_from_slice(b"data");
    bytes.extend_from_slice(&data_len.to_le_bytes());
    bytes.resize(44 + data_len as usize, 0);

    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

/// Write a file carrying a PNG signature
pub fn write_test_image(dir: &Path, name: &str) -> PathBuf {
    let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    bytes.extend_from_slice(&[0u8; 24]);

    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

/// Default form with a fresh WAV selected
///
/// Returns (TempDir, FormState) - TempDir must be kept alive for duration of test
pub fn form_with_audio() -> (TempDir, FormState) {
    let dir = TempDir::new().unwrap();
    let audio = write_test_wav(dir.path(), "loop.wav", 64);

    let mut form = FormState::new();
    assert!(form.select_audio_file(audio));
    (dir, form)
}
