mod bridge_runtime;

pub use bridge_runtime::{BridgeError, PanelBridge, PanelNotification};
