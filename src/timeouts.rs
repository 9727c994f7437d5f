pub mod ms {
    pub const POLL_INTERVAL: u64 = 100;
    pub const NETWORK_IDLE: u64 = 500;
    pub const VIEWPORT_SETTLE: u64 = 50;
}

pub mod secs {
    pub const NAVIGATION: u64 = 10;
    pub const READY_STATE: u64 = 5;
    pub const ANIMATION_READY: u64 = 30;
    pub const FRAME_ADVANCE: u64 = 10;
    pub const REQUEST: u64 = 120;
}
