/// The back buffer acquired for the frame in progress.
///
/// Held from the first clear or draw of a frame until `present`. Holding the
/// surface texture prevents acquisition of the next one.
pub(crate) struct GpuFrame {
    pub surface_texture: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
}

/// Back-buffer state of the frame in progress.
///
/// A failed acquisition marks the frame as skipped: later calls in the same
/// frame do not retry until [`FrameSlot::finish`] starts a new one.
#[derive(Debug)]
pub(crate) enum FrameSlot<F> {
    Empty,
    Acquired(F),
    Skipped,
}

impl<F> Default for FrameSlot<F> {
    fn default() -> Self {
        FrameSlot::Empty
    }
}

impl<F> FrameSlot<F> {
    /// Runs `acquire` only when no frame is held and this frame was not skipped.
    ///
    /// Returns `Ok(true)` when a frame is held afterwards, `Ok(false)` when the
    /// frame is skipped, and the acquisition error the first time it fails.
    pub(crate) fn acquire<E>(&mut self, acquire: impl FnOnce() -> Result<F, E>) -> Result<bool, E> {
        match self {
            FrameSlot::Acquired(_) => Ok(true),
            FrameSlot::Skipped => Ok(false),
            FrameSlot::Empty => match acquire() {
                Ok(frame) => {
                    *self = FrameSlot::Acquired(frame);
                    Ok(true)
                }
                Err(err) => {
                    *self = FrameSlot::Skipped;
                    Err(err)
                }
            },
        }
    }

    pub(crate) fn get(&self) -> Option<&F> {
        match self {
            FrameSlot::Acquired(frame) => Some(frame),
            _ => None,
        }
    }

    pub(crate) fn is_skipped(&self) -> bool {
        matches!(self, FrameSlot::Skipped)
    }

    /// Ends the frame, handing back the held frame if there is one.
    pub(crate) fn finish(&mut self) -> Option<F> {
        match std::mem::take(self) {
            FrameSlot::Acquired(frame) => Some(frame),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_acquisition_is_not_retried_within_a_frame() {
        let mut slot = FrameSlot::<u32>::default();
        let mut attempts = 0;

        let first = slot.acquire(|| {
            attempts += 1;
            Err("timeout")
        });
        assert_eq!(first, Err("timeout"));
        assert!(slot.is_skipped());

        for _ in 0..3 {
            let again = slot.acquire::<&str>(|| {
                attempts += 1;
                Ok(7)
            });
            assert_eq!(again, Ok(false));
        }
        assert_eq!(attempts, 1);
        assert_eq!(slot.finish(), None);

        assert_eq!(slot.acquire::<&str>(|| Ok(7)), Ok(true));
        assert_eq!(slot.get(), Some(&7));
    }

    #[test]
    fn held_frame_is_reused_until_finished() {
        let mut slot = FrameSlot::<u32>::default();
        assert_eq!(slot.acquire::<()>(|| Ok(1)), Ok(true));
        assert_eq!(slot.acquire::<()>(|| Ok(2)), Ok(true));
        assert_eq!(slot.finish(), Some(1));
        assert!(slot.get().is_none());
        assert_eq!(slot.acquire::<()>(|| Ok(3)), Ok(true));
        assert_eq!(slot.get(), Some(&3));
    }
}
