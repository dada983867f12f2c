//! Utility modules for shortlist-engine

pub mod audio_decoder;
pub mod output_layout;
pub mod retry;

pub use audio_decoder::{decode_audio_file, AudioDecodeError, DecodedAudio};
pub use output_layout::{commit, CommitError};
pub use retry::retry_with_backoff;
