//! Effect configuration: sampling stride, particle shape, reveal pacing

use std::sync::Arc;

use crumble_core::Density;

use crate::lifetime::{ParticleLifetime, RangeLifetime};

/// Configuration for one effect instance (applies per attach)
#[derive(Clone)]
pub struct EffectConfig {
    /// Draw particles as rects instead of circles
    pub draw_rect_particles: bool,
    /// Base pixel spacing between sampled source pixels; larger = fewer,
    /// larger particles. Sibling-instance weights widen this further.
    pub stride: u32,
    /// Minimum delay between strip reveals, in milliseconds.
    /// `None` derives the delay from the surface's target frame interval.
    pub line_delay_ms: Option<f32>,
    /// Display density for dp-specified motion
    pub density: Density,
    /// Lifetime policy; replace to tune or accelerate the effect
    pub lifetime: Arc<dyn ParticleLifetime>,
    /// Fixed RNG seed; `None` derives one per instance
    pub seed: Option<u32>,
}

impl Default for EffectConfig {
    fn default() -> Self {
        Self {
            draw_rect_particles: false,
            stride: 6,
            line_delay_ms: None,
            density: Density::default(),
            lifetime: Arc::new(RangeLifetime::default()),
            seed: None,
        }
    }
}

impl EffectConfig {
    /// Parse partial overrides from a TOML table; unknown keys are ignored
    /// and missing keys keep their defaults.
    pub fn from_toml(table: &toml::value::Table) -> Self {
        let mut config = Self::default();

        if let Some(v) = table.get("rect_particles") {
            config.draw_rect_particles = v.as_bool().unwrap_or(false);
        }
        if let Some(v) = table.get("stride") {
            let n = v.as_integer().unwrap_or(6).max(1) as u32;
            config.stride = n;
        }
        if let Some(v) = table.get("line_delay_ms") {
            config.line_delay_ms = Some(toml_f32(v, 0.0));
        }
        if let Some(v) = table.get("density") {
            config.density = Density(toml_f32(v, 1.0));
        }

        // Lifetime bounds override builds a tuned policy
        let mut lifetime = RangeLifetime::default();
        let mut tuned = false;
        if let Some(v) = table.get("lifetime_min_ms") {
            lifetime.min_ms = v.as_integer().unwrap_or(lifetime.min_ms as i64) as i32;
            tuned = true;
        }
        if let Some(v) = table.get("lifetime_max_ms") {
            lifetime.max_ms = v.as_integer().unwrap_or(lifetime.max_ms as i64) as i32;
            tuned = true;
        }
        if let Some(v) = table.get("line_sensitivity_ms") {
            lifetime.line_sensitivity_ms =
                v.as_integer().unwrap_or(lifetime.line_sensitivity_ms as i64) as i32;
            tuned = true;
        }
        if tuned {
            config.lifetime = Arc::new(lifetime);
        }

        config
    }
}

// TOML helper (handles integer/float coercion)
fn toml_f32(v: &toml::Value, default: f32) -> f32 {
    v.as_float()
        .map(|f| f as f32)
        .or_else(|| v.as_integer().map(|i| i as f32))
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_sane() {
        let config = EffectConfig::default();
        assert!(!config.draw_rect_particles);
        assert_eq!(config.stride, 6);
        assert!(config.line_delay_ms.is_none());
        assert!(config.lifetime.max_duration() >= config.lifetime.min_duration());
    }

    #[test]
    fn parse_from_toml() {
        let toml_str = r#"
rect_particles = true
stride = 10
line_delay_ms = 33
lifetime_min_ms = 100
lifetime_max_ms = 200
"#;
        let table: toml::value::Table = toml::from_str(toml_str).unwrap();
        let config = EffectConfig::from_toml(&table);
        assert!(config.draw_rect_particles);
        assert_eq!(config.stride, 10);
        assert!((config.line_delay_ms.unwrap() - 33.0).abs() < 0.01);
        assert_eq!(config.lifetime.min_duration(), 100);
        assert_eq!(config.lifetime.max_duration(), 200);
        // untouched key keeps its default
        assert_eq!(config.lifetime.line_sensitivity(), 600);
    }

    #[test]
    fn stride_clamps_to_one() {
        let table: toml::value::Table = toml::from_str("stride = 0").unwrap();
        assert_eq!(EffectConfig::from_toml(&table).stride, 1);
    }
}
