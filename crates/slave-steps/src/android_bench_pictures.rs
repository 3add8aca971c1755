//! Run the Skia bench_pictures executable on an Android device.

use crate::bench_pictures::{BenchConfig, BenchPictures, DeviceRunner};
use async_trait::async_trait;
use buildstep_core::{BuildStep, Result, StepContext};
use std::time::Duration;

/// Android benches run far longer than host ones.
pub const DEFAULT_TIMEOUT_SECS: u64 = 134400;

/// `bench_pictures` run through the Android device wrapper.
#[derive(Debug, Clone)]
pub struct AndroidBenchPictures {
    inner: BenchPictures,
}

impl AndroidBenchPictures {
    /// Requires the `device` step argument; everything else is forwarded
    /// to [`BenchConfig::from_context`] unchanged.
    pub fn from_context(ctx: &StepContext) -> Result<Self> {
        let runner = DeviceRunner::Android {
            device: ctx.args.require("device")?.to_string(),
        };
        let config = BenchConfig::from_context(ctx, runner, DEFAULT_TIMEOUT_SECS)?;
        Ok(Self {
            inner: BenchPictures::new(config),
        })
    }

    pub fn bench(&self) -> &BenchPictures {
        &self.inner
    }
}

#[async_trait]
impl BuildStep for AndroidBenchPictures {
    fn name(&self) -> &str {
        "android_bench_pictures"
    }

    fn timeout(&self) -> Duration {
        self.inner.timeout()
    }

    async fn run(&self) -> Result<()> {
        self.inner.bench().await
    }
}
