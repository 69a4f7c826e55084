use crate::{DecodeChannel, DecodeEngine, DecodeError, DecodeRequest};
use qrscan_image::{BlobStore, GrayscaleWeights, ImageSource};
use std::time::Duration;

pub const DEFAULT_ONE_SHOT_TIMEOUT: Duration = Duration::from_millis(3000);

#[derive(Clone, Debug)]
pub struct OneShotConfig {
    timeout: Duration,
    weights: GrayscaleWeights,
}

impl Default for OneShotConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_ONE_SHOT_TIMEOUT,
            weights: GrayscaleWeights::default(),
        }
    }
}

impl OneShotConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_grayscale_weights(mut self, weights: GrayscaleWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn weights(&self) -> GrayscaleWeights {
        self.weights
    }
}

/// Decodes single still images.
///
/// Every call loads the image, starts a fresh engine from `make_engine`, does
/// one round-trip and disposes of the engine again. The whole call races
/// against a timeout.
pub struct OneShotDecoder<F> {
    make_engine: F,
    config: OneShotConfig,
    store: BlobStore,
}

impl<F, E> OneShotDecoder<F>
where
    F: Fn() -> E,
    E: DecodeEngine,
{
    pub fn new(make_engine: F) -> Self {
        Self::with_config(make_engine, OneShotConfig::default())
    }

    pub fn with_config(make_engine: F, config: OneShotConfig) -> Self {
        Self {
            make_engine,
            config,
            store: BlobStore::new(),
        }
    }

    pub fn config(&self) -> &OneShotConfig {
        &self.config
    }

    /// Store that holds the temporary `blob:` references of loading blobs.
    /// Register blobs here to decode them by reference.
    pub fn blob_store(&self) -> &BlobStore {
        &self.store
    }

    /// Decode with the configured default timeout.
    pub async fn scan_image(&self, source: impl Into<ImageSource>) -> Result<E::Payload, DecodeError> {
        self.decode(source, self.config.timeout()).await
    }

    /// Decode one image, giving up after `timeout`.
    ///
    /// # Errors
    ///
    /// `Timeout` if loading plus decoding took too long, `NotFound` if the
    /// engine found nothing, `UnsupportedInput` or `LoadError` if the image
    /// could not be obtained, `Engine` if the engine failed.
    pub async fn decode(
        &self,
        source: impl Into<ImageSource>,
        timeout: Duration,
    ) -> Result<E::Payload, DecodeError> {
        match tokio::time::timeout(timeout, self.round_trip(source.into())).await {
            Ok(result) => result,
            Err(_) => {
                log::warn!("one-shot decode timed out after {:?}", timeout);
                Err(DecodeError::Timeout(timeout))
            }
        }
    }

    async fn round_trip(&self, source: ImageSource) -> Result<E::Payload, DecodeError> {
        let mut channel = DecodeChannel::spawn((self.make_engine)())?;
        channel.set_grayscale_weights(self.config.weights())?;

        let bitmap = source.load(&self.store).await?;
        log::debug!("decoding {} still image", bitmap.size);
        let decoded = channel
            .submit(DecodeRequest::new(bitmap.data, bitmap.size))
            .await;
        channel.dispose();

        decoded?.result.into_option().ok_or(DecodeError::NotFound)
    }
}
