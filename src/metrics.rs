use lazy_static::lazy_static;
use prometheus::{Counter, Gauge, Histogram, register_counter, register_gauge, register_histogram};

lazy_static! {
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("diode_requests_total", "Total number of API requests").unwrap();
    pub static ref CACHE_HITS: Counter =
        register_counter!("diode_guild_cache_hits_total", "Total guild cache hits").unwrap();
    pub static ref CACHE_MISSES: Counter =
        register_counter!("diode_guild_cache_misses_total", "Total guild cache misses").unwrap();
    pub static ref CACHE_SIZE: Gauge =
        register_gauge!("diode_guild_cache_size", "Current number of items in guild cache").unwrap();
    pub static ref QUEUE_DEPTH: Gauge =
        register_gauge!("diode_queue_depth", "Discord calls submitted but not yet settled").unwrap();
    pub static ref RATE_LIMIT_HITS: Counter =
        register_counter!("diode_rate_limit_hits_total", "Discord 429 responses seen by the queue").unwrap();
    pub static ref QUEUE_WAIT: Histogram = register_histogram!(
        "diode_queue_wait_seconds",
        "Time from submission to settlement of a queued Discord call"
    )
    .unwrap();
    pub static ref REQUEST_LATENCY: Histogram = register_histogram!(
        "diode_request_latency_seconds",
        "API request latency in seconds"
    )
    .unwrap();
}
