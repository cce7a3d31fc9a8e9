use chrono::{DateTime, Utc};

#[cfg(test)]
use mockall::automock;

/// Represents an entity responsible for providing dates across application. Event stamps and
/// open intervals are both measured against it, which lets tests pin "now".
#[cfg_attr(test, automock)]
pub trait Clock: Sync + Send + 'static {
    fn time(&self) -> DateTime<Utc>;
}

pub struct DefaultClock;

impl Clock for DefaultClock {
    fn time(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that always returns the same moment.
#[cfg(test)]
pub struct FixedClock(pub DateTime<Utc>);

#[cfg(test)]
impl Clock for FixedClock {
    fn time(&self) -> DateTime<Utc> {
        self.0
    }
}
