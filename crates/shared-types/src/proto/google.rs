//! `google.protobuf` well-known types.

use std::time::Duration as StdDuration;

/// `google.protobuf.Any`
#[derive(Clone, PartialEq, Eq, prost::Message)]
pub struct Any {
    /// Type URL of the packed message
    #[prost(string, tag = "1")]
    pub type_url: String,
    /// Encoded message
    #[prost(bytes = "vec", tag = "2")]
    pub value: Vec<u8>,
}

/// `google.protobuf.Duration`
#[derive(Clone, Copy, PartialEq, Eq, prost::Message)]
pub struct Duration {
    #[prost(int64, tag = "1")]
    pub seconds: i64,
    #[prost(int32, tag = "2")]
    pub nanos: i32,
}

impl Duration {
    /// Convert from a std duration, saturating at `i64::MAX` seconds.
    pub fn from_std(d: StdDuration) -> Self {
        Self {
            seconds: i64::try_from(d.as_secs()).unwrap_or(i64::MAX),
            nanos: d.subsec_nanos() as i32,
        }
    }

    /// Convert to a std duration; negative durations clamp to zero.
    pub fn to_std(&self) -> StdDuration {
        if self.seconds < 0 || self.nanos < 0 {
            return StdDuration::ZERO;
        }
        StdDuration::new(self.seconds as u64, self.nanos as u32)
    }
}

/// `google.protobuf.Timestamp`
#[derive(Clone, Copy, PartialEq, Eq, prost::Message)]
pub struct Timestamp {
    #[prost(int64, tag = "1")]
    pub seconds: i64,
    #[prost(int32, tag = "2")]
    pub nanos: i32,
}

impl Timestamp {
    /// Build from unix nanoseconds.
    pub fn from_unix_nanos(nanos: u64) -> Self {
        Self {
            seconds: (nanos / 1_000_000_000) as i64,
            nanos: (nanos % 1_000_000_000) as i32,
        }
    }

    /// Unix nanoseconds; pre-epoch timestamps clamp to zero.
    pub fn to_unix_nanos(&self) -> u64 {
        if self.seconds < 0 || self.nanos < 0 {
            return 0;
        }
        (self.seconds as u64)
            .saturating_mul(1_000_000_000)
            .saturating_add(self.nanos as u64)
    }
}
