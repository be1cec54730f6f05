/**
 * Small utility to display time metrics with a log message
 */
use log::info;
use std::time::Instant;

/**
 * Small helper to compute the execution time of some code
 */
pub struct TimeLogger {
    start_time: Instant,
    message: String,
}

impl TimeLogger {
    pub fn new(message: String) -> Self {
        TimeLogger {
            start_time: Instant::now(),
            message,
        }
    }

    pub fn complete(&self) {
        let duration = self.start_time.elapsed();
        info!("{} in {:.2?}", self.message, duration);
    }
}

/**
 * Render a millisecond duration as MM:SS. A partial trailing second counts
 * as a whole one (ceil, never floor), and minutes are unbounded above 59.
 */
pub fn milli_time_to_string(millis: i64) -> String {
    let millis = millis.max(0);
    let total_seconds = (millis + 999) / 1000;
    format!("{:02}:{:02}", total_seconds / 60, total_seconds % 60)
}
