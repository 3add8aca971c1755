//! slave-steps: build-slave step implementations
//!
//! - [`AndroidCompile`]: build a target with the Android toolchain wrapper
//! - [`BenchPictures`] / [`AndroidBenchPictures`]: run `bench_pictures`
//! - [`DownloadSkps`]: stage playback SKPs from storage

pub mod android_bench_pictures;
pub mod android_compile;
pub mod bench_pictures;
pub mod download_skps;

pub use android_bench_pictures::AndroidBenchPictures;
pub use android_compile::{AndroidCompile, CompileConfig};
pub use bench_pictures::{BenchConfig, BenchPictures, DeviceRunner};
pub use download_skps::{DownloadSkps, SyncConfig};
