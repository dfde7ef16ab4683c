//! Device-independent pixel conversion

use serde::{Deserialize, Serialize};

/// Display density scale: dp × density = px
///
/// The effect's drift distances, velocities and strip quotas are specified in
/// dp so the motion looks the same across screen densities. Hosts without a
/// meaningful density pass 1.0.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Density(pub f32);

impl Density {
    pub fn dp(&self, value: f32) -> i32 {
        (self.0 * value) as i32
    }
}

impl Default for Density {
    fn default() -> Self {
        Self(1.0)
    }
}
