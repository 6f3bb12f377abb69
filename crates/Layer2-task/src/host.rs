//! Host-side resources used by a run
//!
//! The start sequence gets its console and event sources from a `Host`, so
//! the same sequence runs against the real terminal or against test doubles.

use crate::console::{Console, HostConsole, ResizeEvents};
use crate::signals::SignalEvents;
use ctask_foundation::Result;

pub trait Host: Send {
    /// The console a terminal-backed task is bound to
    fn console(&mut self) -> Result<Box<dyn Console>>;

    /// Host terminal dimension changes
    fn resize_events(&mut self) -> Result<ResizeEvents>;

    /// Host signals to relay to a task without a terminal
    fn signal_events(&mut self) -> Result<SignalEvents>;
}

/// The real process environment
#[derive(Debug, Default)]
pub struct OsHost;

impl Host for OsHost {
    fn console(&mut self) -> Result<Box<dyn Console>> {
        Ok(Box::new(HostConsole::current()))
    }

    fn resize_events(&mut self) -> Result<ResizeEvents> {
        ResizeEvents::host()
    }

    fn signal_events(&mut self) -> Result<SignalEvents> {
        SignalEvents::host()
    }
}
