use candle_core::Device;
use tracing::info;

/// First accelerator enabled at build time that initializes, else CPU.
pub fn select_device() -> Device {
    #[cfg(feature = "cuda")]
    match Device::new_cuda(0) {
        Ok(dev) => {
            info!("embedding device: CUDA 0");
            return dev;
        }
        Err(e) => tracing::warn!(error = %e, "CUDA unavailable"),
    }
    #[cfg(feature = "metal")]
    match Device::new_metal(0) {
        Ok(dev) => {
            info!("embedding device: Metal");
            return dev;
        }
        Err(e) => tracing::warn!(error = %e, "Metal unavailable"),
    }
    info!("embedding device: CPU");
    Device::Cpu
}
