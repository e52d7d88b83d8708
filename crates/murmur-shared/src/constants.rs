/// Application name
pub const APP_NAME: &str = "Murmur";

/// Default API base URL for local development
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Scroll signals closer together than this are collapsed into one (milliseconds)
pub const DEFAULT_DEBOUNCE_MS: u64 = 150;

/// Distance from the bottom of the document at which more items are requested (pixels)
pub const DEFAULT_SCROLL_THRESHOLD_PX: f64 = 300.0;

/// HTTP request timeout in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Capacity of the view event broadcast channel
pub const VIEW_EVENT_CAPACITY: usize = 256;

/// File name of the persisted bearer credential
pub const SESSION_FILE_NAME: &str = "session.token";
