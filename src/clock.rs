/// Host-provided time source.
///
/// The driver owns no clock of its own: transaction deadlines, write pacing
/// and staleness tracking all go through this trait. `now_ms` must be
/// monotonic; wall-clock time is not required.
#[allow(async_fn_in_trait)]
pub trait Clock {
    /// Milliseconds elapsed on a monotonic clock.
    fn now_ms(&mut self) -> u64;

    /// Suspends the caller for at least `ms` milliseconds.
    async fn delay_ms(&mut self, ms: u32);
}
