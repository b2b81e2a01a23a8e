use crate::dto::HealthRes;

/// Health check shared by every CarePulse entry point.
#[derive(Clone, Debug, Default)]
pub struct HealthService;

impl HealthService {
    pub fn new() -> Self {
        Self
    }

    /// Static method to check health without creating an instance
    pub fn check_health() -> HealthRes {
        HealthRes {
            ok: true,
            message: "CarePulse is alive".into(),
        }
    }
}
