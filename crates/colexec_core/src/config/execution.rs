use colexec_error::{DbError, Result, ResultExt};

use crate::execution::operators::ExecutionProperties;

/// Default number of rows in an output batch.
pub const DEFAULT_BATCH_SIZE: usize = 1024;

/// Default number of buckets in a join hash table.
pub const DEFAULT_HASH_JOIN_BUCKET_COUNT: usize = 1 << 16;

/// Configuration for operator execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionConfig {
    /// Target (and maximum) number of rows per output batch.
    pub batch_size: usize,
    /// Bucket count used for hash joins when the caller doesn't pick one.
    pub hash_join_bucket_count: usize,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        ExecutionConfig {
            batch_size: DEFAULT_BATCH_SIZE,
            hash_join_bucket_count: DEFAULT_HASH_JOIN_BUCKET_COUNT,
        }
    }
}

impl ExecutionConfig {
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(DbError::new("Batch size must be greater than zero"));
        }
        if self.hash_join_bucket_count == 0 {
            return Err(DbError::new("Hash join bucket count must be greater than zero"));
        }
        Ok(())
    }

    /// Set a config value by name.
    ///
    /// The updated config is validated before being applied.
    pub fn set_from_str(&mut self, name: &str, value: &str) -> Result<()> {
        let mut updated = self.clone();
        match name {
            "batch_size" => updated.batch_size = parse_usize(name, value)?,
            "hash_join_bucket_count" => {
                updated.hash_join_bucket_count = parse_usize(name, value)?
            }
            other => return Err(DbError::new(format!("Missing setting for '{other}'"))),
        }
        updated.validate()?;
        *self = updated;

        Ok(())
    }

    pub fn execution_properties(&self) -> ExecutionProperties {
        ExecutionProperties {
            batch_size: self.batch_size,
        }
    }
}

fn parse_usize(name: &str, value: &str) -> Result<usize> {
    value
        .trim()
        .parse::<usize>()
        .context("Failed to parse setting as an unsigned integer")
        .map_err(|e| e.with_field("setting", name).with_field("value", value))
}
