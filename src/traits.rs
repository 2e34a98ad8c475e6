//! Small traits shared across modules

use crate::Result;

/// Planar operations on a bounding region of `T` points
pub trait GeometryOps<T> {
    fn center(&self) -> T;

    fn is_valid(&self) -> bool;
}

/// A component whose tuning can be swapped at runtime.
///
/// Implementors reject a config by returning [`MapError::Config`] from
/// [`validate_config`](Configurable::validate_config); `set_config` runs it
/// before applying anything.
///
/// [`MapError::Config`]: crate::MapError::Config
pub trait Configurable {
    type Config: Clone;

    fn config(&self) -> &Self::Config;

    fn set_config(&mut self, config: Self::Config) -> Result<()>;

    fn validate_config(_config: &Self::Config) -> Result<()> {
        Ok(())
    }

    /// Applies `edit` to a copy of the current config and installs it if valid
    fn update_config<F>(&mut self, edit: F) -> Result<()>
    where
        F: FnOnce(&mut Self::Config),
    {
        let mut config = self.config().clone();
        edit(&mut config);
        Self::validate_config(&config)?;
        self.set_config(config)
    }
}
