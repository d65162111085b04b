//! Audio loading, padding and chunk planning.

mod chunker;
mod decode;
mod loader;

pub use chunker::{ChunkGeometry, ChunkPlan};
pub use decode::{DecodedAudio, decode_audio_file};
pub use loader::{AudioBuffer, LoadedAudio, TimeExpansion, load_audio, prepare_audio};
