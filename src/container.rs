pub mod array;
pub mod bitmap;
pub mod run;

pub use array::{ArrayContainer, ArrayRef};
pub use bitmap::{BitmapContainer, BitmapRef, popcount};
pub use run::{EncodedInterval, Interval, IntervalsRef, encode_intervals, interval_view};
