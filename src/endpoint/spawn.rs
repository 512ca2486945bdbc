use std::io;

use futures::{executor::ThreadPool, future::BoxFuture};

/// Runs the callee side of suspending calls.
pub trait Spawn: Send + Sync {
    fn spawn(&self, task: BoxFuture<'static, ()>) -> io::Result<()>;
}

/// Drives tasks on a fixed pool of named worker threads.
#[derive(Debug, Clone)]
pub struct ThreadPoolSpawner {
    pool: ThreadPool,
}

impl ThreadPoolSpawner {
    /// Worker threads are named `<name_prefix><index>`. A `pool_size` of
    /// zero is raised to one.
    pub fn new(name_prefix: &str, pool_size: usize) -> io::Result<Self> {
        let pool = ThreadPool::builder()
            .name_prefix(name_prefix)
            .pool_size(pool_size.max(1))
            .create()?;
        Ok(Self { pool })
    }
}

impl Spawn for ThreadPoolSpawner {
    fn spawn(&self, task: BoxFuture<'static, ()>) -> io::Result<()> {
        self.pool.spawn_ok(task);
        Ok(())
    }
}
