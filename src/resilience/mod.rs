//! Execution strategies: how an operation against the database is retried.
//!
//! A strategy is produced per context by an [`ExecutionStrategyFactory`]
//! configured on [`CosmosOptions`](crate::options::CosmosOptions). Without a
//! factory the options fall back to [`RetryingExecutionStrategy`].
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`ExecutionStrategy`] | Decides whether and when a failed attempt is retried |
//! | [`RetryingExecutionStrategy`] | Exponential backoff on throttling and transient availability errors |
//! | [`NonRetryingExecutionStrategy`] | Surfaces the first failure |
//! | [`execute`] | Drives an operation under a strategy |
//!
//! ```rust
//! use cosmos_orm::resilience::{execute, RetryingExecutionStrategy};
//! use std::time::Duration;
//!
//! # tokio_test::block_on(async {
//! let strategy = RetryingExecutionStrategy::new(3, Duration::ZERO, Duration::ZERO);
//! let value = execute(&strategy, || async { Ok::<_, cosmos_orm::Error>(42) }).await?;
//! assert_eq!(value, 42);
//! # Ok::<(), cosmos_orm::Error>(())
//! # }).unwrap();
//! ```

pub mod execution;

pub use execution::{
    execute, ExecutionStrategy, ExecutionStrategyDependencies, ExecutionStrategyFactory,
    NonRetryingExecutionStrategy, RetryingExecutionStrategy,
};
