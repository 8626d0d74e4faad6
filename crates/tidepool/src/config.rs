use crate::{Error, Result};

/// Default capacity of the event broadcast channel.
pub const DEFAULT_EVENT_CAPACITY: usize = 1024;

/// Construction-time settings of a [`Pool`].
///
/// [`Pool`]: crate::Pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    buffer_size: usize,
    event_capacity: usize,
}

impl PoolConfig {
    /// Creates a config for a job queue holding at most `buffer_size` jobs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `buffer_size` is zero.
    pub fn new(buffer_size: usize) -> Result<Self> {
        if buffer_size == 0 {
            return Err(Error::InvalidConfig {
                reason: "buffer_size must be greater than 0".to_string(),
            });
        }

        Ok(Self {
            buffer_size,
            event_capacity: DEFAULT_EVENT_CAPACITY,
        })
    }

    /// Sets how many [`PoolEvent`]s a slow subscriber may fall behind before
    /// it starts missing them.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `event_capacity` is zero.
    ///
    /// [`PoolEvent`]: crate::PoolEvent
    pub fn with_event_capacity(mut self, event_capacity: usize) -> Result<Self> {
        if event_capacity == 0 {
            return Err(Error::InvalidConfig {
                reason: "event_capacity must be greater than 0".to_string(),
            });
        }
        self.event_capacity = event_capacity;
        Ok(self)
    }

    pub const fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    pub const fn event_capacity(&self) -> usize {
        self.event_capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_buffer() {
        assert!(matches!(
            PoolConfig::new(0),
            Err(Error::InvalidConfig { .. })
        ));
    }

    #[test]
    fn rejects_zero_event_capacity() {
        let config = PoolConfig::new(4).map(|c| c.with_event_capacity(0));
        assert!(matches!(config, Ok(Err(Error::InvalidConfig { .. }))));
    }

    #[test]
    fn keeps_values() -> Result<()> {
        let config = PoolConfig::new(10)?.with_event_capacity(16)?;
        assert_eq!(config.buffer_size(), 10);
        assert_eq!(config.event_capacity(), 16);
        assert_eq!(PoolConfig::new(3)?.event_capacity(), DEFAULT_EVENT_CAPACITY);
        Ok(())
    }
}
