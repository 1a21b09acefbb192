use std::sync::RwLock;

use crate::models::Frame;

/// Single-slot holder for the most recently captured frame.
///
/// `put` swaps a fully built frame in under the write lock; `get` clones the
/// handle under the read lock. The lock only ever guards a pointer swap, so
/// readers never wait on a capture in progress and never see a partial frame.
#[derive(Debug, Default)]
pub struct FrameStore {
    current: RwLock<Option<Frame>>,
}

impl FrameStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, frame: Frame) {
        let mut guard = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Some(frame);
    }

    /// The latest committed frame, or `None` before the first capture.
    pub fn get(&self) -> Option<Frame> {
        let guard = match self.current.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.clone()
    }

    pub fn is_empty(&self) -> bool {
        self.get().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use image::{Rgba, RgbaImage};
    use std::sync::Arc;
    use std::thread;

    fn filled(size: u32, value: u8) -> Frame {
        Frame::new(RgbaImage::from_pixel(size, size, Rgba([value; 4])), Utc::now())
    }

    #[test]
    fn empty_before_first_put() {
        let store = FrameStore::new();
        assert!(store.get().is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn get_returns_latest_put() {
        let store = FrameStore::new();
        store.put(filled(2, 1));
        store.put(filled(3, 2));
        let frame = store.get().unwrap();
        assert_eq!(frame.width(), 3);
        assert_eq!(frame.image().get_pixel(0, 0), &Rgba([2; 4]));
    }

    #[test]
    fn readers_never_observe_mixed_frames() {
        let store = Arc::new(FrameStore::new());
        store.put(filled(1, 0));

        let writer = {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for i in 1..=200u32 {
                    // Size and fill both derive from `i`, so any torn frame
                    // would show a fill that doesn't match its dimensions.
                    store.put(filled(1 + i % 17, (i % 251) as u8));
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..500 {
                        let frame = store.get().expect("frame was seeded");
                        let first = *frame.image().get_pixel(0, 0);
                        assert!(frame.image().pixels().all(|p| *p == first));
                        if first.0[0] != 0 {
                            let i = u32::from(first.0[0]);
                            assert_eq!(frame.width(), 1 + i % 17);
                        }
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
        assert_eq!(store.get().unwrap().image().get_pixel(0, 0), &Rgba([(200 % 251) as u8; 4]));
    }
}
