mod http;

pub use http::{router, serve, AppState, RequestEvent, OBSERVER_QUEUE_DEPTH};
