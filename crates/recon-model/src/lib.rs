mod domain;
pub use domain::{DEFAULT_QUEUE_KEY, KeyError, Labels, ObjectMeta, QueueKey};
pub use domain::{meta_namespace_key, split_meta_namespace_key};

mod error;
pub use error::{ModelError, ModelResult};

mod spec;
pub use spec::ControllerConfig;

mod strategy;
pub use strategy::{BackoffStrategy, BucketStrategy, JitterStrategy};
