pub type MyTimestamp = chrono::DateTime<chrono::Local>;

pub fn now() -> MyTimestamp {
    chrono::Local::now()
}

/// Seconds since `ts`.
pub fn elapsed(ts: MyTimestamp) -> f64 {
    (now() - ts).num_milliseconds() as f64 / 1000.0
}
