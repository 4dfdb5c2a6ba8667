use candle_core::Device;

/// Ingestion and query both run the model on CPU by default; the `metal`
/// feature opts into GPU when the host supports it.
pub fn select_device() -> Device {
    #[cfg(feature = "metal")]
    {
        if let Ok(dev) = Device::new_metal(0) {
            tracing::info!("device: metal");
            return dev;
        }
    }
    tracing::debug!("device: cpu");
    Device::Cpu
}
