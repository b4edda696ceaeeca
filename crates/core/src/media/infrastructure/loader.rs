use std::sync::OnceLock;

use crate::shared::error::MovieError;

static FFMPEG_INIT: OnceLock<Result<(), ffmpeg_next::Error>> = OnceLock::new();

/// One-time registration of the native format, codec and scaling
/// subsystems.
///
/// The first call performs the initialization; every later call returns
/// the cached outcome without touching the library again. A failure here
/// means the native library is unusable in this process and is reported
/// on every call. There is no teardown.
pub fn ensure_loaded() -> Result<(), MovieError> {
    match FFMPEG_INIT.get_or_init(ffmpeg_next::init) {
        Ok(()) => Ok(()),
        Err(e) => Err(MovieError::Native(*e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_loaded_is_idempotent() {
        ensure_loaded().unwrap();
        ensure_loaded().unwrap();
    }
}
