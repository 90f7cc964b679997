mod logger;
pub use logger::*;

#[cfg(feature = "recorder")]
mod recorder;

#[cfg(feature = "recorder")]
pub use recorder::TracingRecorder;
