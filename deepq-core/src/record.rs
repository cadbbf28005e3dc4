//! Records of training metrics.
//!
//! A [`Record`] maps keys to [`RecordValue`]s. The [`Trainer`](crate::Trainer)
//! writes one record per episode to a [`Recorder`], for example:
//!
//! ```rust
//! use deepq_core::record::{Record, RecordValue};
//!
//! let mut record = Record::empty();
//! record.insert("episode", RecordValue::Scalar(1.0));
//! record.insert("score", RecordValue::Scalar(-3.0));
//! assert_eq!(record.get_scalar("score").unwrap(), -3.0);
//! ```
mod base;
mod buffered_recorder;
mod null_recorder;
mod recorder;

pub use base::{Record, RecordValue};
pub use buffered_recorder::BufferedRecorder;
pub use null_recorder::NullRecorder;
pub use recorder::Recorder;
