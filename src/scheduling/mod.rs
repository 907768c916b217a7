mod dispatcher;
mod job;
mod job_store;
mod scheduler;


use std::{
    fmt::{Debug, Display},
    hash::Hash,
};

pub use dispatcher::{MessageTransport, NotificationDispatcher, TransportError};
pub use job::DailyFireTime;
pub use scheduler::CountdownScheduler;

pub trait SubscriberKey: Eq + Hash + Clone + Debug + Display + Send + Sync + 'static {}

impl<T> SubscriberKey for T where T: Eq + Hash + Clone + Debug + Display + Send + Sync + 'static {}
