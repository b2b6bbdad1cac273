//! Mock construction helpers

use audioled_rs::effects::{OutputDevice, SharedDevice};
use audioled_rs::graph::{EffectResult, GraphEvent, GraphListener, PixelBuffer};
use crossbeam_channel::{bounded, Receiver, Sender};
use mockall::mock;
use std::sync::{Arc, Mutex};

mock! {
    pub Device {}

    impl OutputDevice for Device {
        fn name(&self) -> &str;
        fn show(&mut self, frame: &PixelBuffer) -> EffectResult<()>;
    }
}

mock! {
    pub Listener {}

    impl GraphListener for Listener {
        fn on_event(&mut self, event: &GraphEvent);
    }
}

/// Wrap a configured mock into a device handle for `LedOutput`
pub fn shared_mock(device: MockDevice) -> SharedDevice {
    Arc::new(Mutex::new(device))
}

/// Create a graph event channel for listener tests
pub fn create_event_channel() -> (Sender<GraphEvent>, Receiver<GraphEvent>) {
    bounded(64)
}
