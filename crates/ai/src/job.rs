use expcat_core::TenantId;

use crate::result::AiError;

/// A tenant-scoped unit of CPU-bound ML work.
///
/// Jobs are plain data in, plain data out: callers (infra) decide where they
/// run, typically on a blocking worker so request serving is never stalled.
pub trait AiJob: Send + 'static {
    type Output: Send + 'static;

    /// The tenant whose data this job consumes. A job never reads another
    /// tenant's examples.
    fn tenant_id(&self) -> &TenantId;

    /// Execute the job, consuming it.
    fn run(self) -> Result<Self::Output, AiError>;
}
