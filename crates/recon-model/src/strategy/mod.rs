mod backoff;
pub use backoff::BackoffStrategy;

mod bucket;
pub use bucket::BucketStrategy;

mod jitter;
pub use jitter::JitterStrategy;
