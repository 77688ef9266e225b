//! Component sizing: default footprints per node and size-to-performance curves.

use crate::model::{Component, ComponentType, Dimensions};
use crate::tables::node_scale_factor;

/// Footprint at the 14 nm base in mm, before node scaling.
fn base_size(t: ComponentType) -> Dimensions {
    use ComponentType::*;
    let (w, h) = match t {
        CpuCore => (3.0, 3.0),
        L2Cache => (2.5, 2.5),
        L3Cache => (4.0, 4.0),
        MemCtrl => (2.0, 1.5),
        Interconnect => (6.0, 1.0),
        PowerMgmt => (1.5, 1.5),
        IoCtrl => (2.5, 1.5),
        Igpu => (4.0, 3.0),
        GpuSm => (3.5, 3.5),
        TextureUnit => (2.0, 2.0),
        DisplayEngine => (2.0, 2.0),
        MemoryArray => (6.0, 6.0),
        ControlLogic => (2.0, 2.0),
        Npu => (3.0, 3.0),
    };
    Dimensions::new(w, h)
}

/// Smallest side a default footprint may have, in mm.
pub const MIN_DEFAULT_SIDE_MM: f64 = 0.1;

fn round_side(mm: f64) -> f64 {
    ((mm * 2.0).round() / 2.0).max(MIN_DEFAULT_SIDE_MM)
}

/// Default footprint of a component type on a process node.
///
/// Each side is rounded to the nearest 0.5 mm and floored at 0.1 mm.
pub fn default_size(t: ComponentType, process_node: u32) -> Dimensions {
    let base = base_size(t);
    let scale = node_scale_factor(process_node);
    Dimensions::new(round_side(base.width * scale), round_side(base.height * scale))
}

/// Shape of a size-to-performance curve before clamping.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ScalingCurve {
    /// `ratio^exponent`; diminishing returns for exponents below one.
    Power(f64),
    Linear,
    /// `offset + log2(ratio) * slope`.
    Log2 { offset: f64, slope: f64 },
}

/// A curve together with its `[min_penalty, max_bonus]` clamp.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScalingProfile {
    pub curve: ScalingCurve,
    pub min_penalty: f64,
    pub max_bonus: f64,
}

impl ScalingProfile {
    /// Maps an area ratio (actual / default) to a clamped performance factor.
    pub fn apply(&self, ratio: f64) -> f64 {
        if ratio.is_nan() {
            return self.min_penalty;
        }
        let raw = match self.curve {
            ScalingCurve::Power(exp) => ratio.max(0.0).powf(exp),
            ScalingCurve::Linear => ratio,
            ScalingCurve::Log2 { offset, slope } => offset + ratio.log2() * slope,
        };
        raw.clamp(self.min_penalty, self.max_bonus)
    }
}

const CPU_CORE_PROFILE: ScalingProfile = ScalingProfile {
    curve: ScalingCurve::Power(0.5),
    min_penalty: 0.6,
    max_bonus: 1.5,
};

/// Size curve of a component type. Types without a curve of their own use the CPU core's.
pub fn scaling_profile(t: ComponentType) -> ScalingProfile {
    use ComponentType::*;
    match t {
        CpuCore => CPU_CORE_PROFILE,
        GpuSm | Igpu | Npu | TextureUnit => ScalingProfile {
            curve: ScalingCurve::Power(0.6),
            min_penalty: 0.5,
            max_bonus: 1.6,
        },
        L2Cache | L3Cache | MemoryArray => ScalingProfile {
            curve: ScalingCurve::Linear,
            min_penalty: 0.5,
            max_bonus: 2.0,
        },
        MemCtrl => ScalingProfile {
            curve: ScalingCurve::Log2 {
                offset: 0.8,
                slope: 0.2,
            },
            min_penalty: 0.6,
            max_bonus: 1.4,
        },
        Interconnect => ScalingProfile {
            curve: ScalingCurve::Log2 {
                offset: 0.95,
                slope: 0.05,
            },
            min_penalty: 0.9,
            max_bonus: 1.1,
        },
        PowerMgmt | IoCtrl | DisplayEngine | ControlLogic => CPU_CORE_PROFILE,
    }
}

/// Performance factor of a placed component relative to its default footprint.
pub fn size_scaling(component: &Component, process_node: u32) -> f64 {
    let t = component.component_type;
    let ratio = component.area() / default_size(t, process_node).area();
    scaling_profile(t).apply(ratio)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Position;
    use proptest::prelude::*;

    fn sized(t: ComponentType, w: f64, h: f64) -> Component {
        Component::new(t, "c", Position::default(), Dimensions::new(w, h))
    }

    #[test]
    fn default_sizes_follow_node_scale() {
        // 3.0 * 0.3 = 0.9 rounds to 1.0.
        assert_eq!(default_size(ComponentType::CpuCore, 7), Dimensions::new(1.0, 1.0));
        // 130 nm is the 1.0 scale point.
        assert_eq!(default_size(ComponentType::MemCtrl, 130), Dimensions::new(2.0, 1.5));
        // 6.0 * 0.2 = 1.2 rounds to 1.0; 1.0 * 0.2 = 0.2 rounds to 0.0 then floors.
        assert_eq!(default_size(ComponentType::Interconnect, 3), Dimensions::new(1.0, 0.1));
        assert_eq!(default_size(ComponentType::CpuCore, 10000), Dimensions::new(210.0, 210.0));
    }

    #[test]
    fn default_footprint_is_unit_ratio() {
        for t in ComponentType::ALL {
            let d = default_size(t, 14);
            let c = sized(t, d.width, d.height);
            assert_eq!(size_scaling(&c, 14), scaling_profile(t).apply(1.0), "{t:?}");
        }
        assert_eq!(scaling_profile(ComponentType::CpuCore).apply(1.0), 1.0);
        assert_eq!(scaling_profile(ComponentType::MemCtrl).apply(1.0), 0.8);
    }

    #[test]
    fn curve_shapes() {
        // 4x a 7 nm core (1x1 mm) -> sqrt(4) = 2, clamped to 1.5.
        assert_eq!(size_scaling(&sized(ComponentType::CpuCore, 2.0, 2.0), 7), 1.5);
        // 2x default L2 at 14 nm: 1.0x1.0 default, so 2 mm² -> linear 2.0.
        assert_eq!(size_scaling(&sized(ComponentType::L2Cache, 2.0, 1.0), 14), 2.0);
        // Memory controller at 130 nm: default 3 mm², 6 mm² -> 0.8 + 1 * 0.2.
        let mc = size_scaling(&sized(ComponentType::MemCtrl, 4.0, 1.5), 130);
        assert!((mc - 1.0).abs() < 1e-12);
        // Half-size CPU core at 130 nm: sqrt(0.5).
        let half = size_scaling(&sized(ComponentType::CpuCore, 3.0, 1.5), 130);
        assert!((half - 0.5f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn uncurved_types_use_cpu_curve() {
        assert_eq!(scaling_profile(ComponentType::PowerMgmt), scaling_profile(ComponentType::CpuCore));
    }

    #[test]
    fn degenerate_ratios_stay_clamped() {
        let p = scaling_profile(ComponentType::MemCtrl);
        assert_eq!(p.apply(0.0), 0.6);
        assert_eq!(p.apply(f64::INFINITY), 1.4);
        assert_eq!(p.apply(f64::NAN), 0.6);
    }

    proptest! {
        #[test]
        fn scaling_within_clamp(ratio in 1e-9f64..1e9, idx in 0usize..14) {
            let p = scaling_profile(ComponentType::ALL[idx]);
            let s = p.apply(ratio);
            prop_assert!(s >= p.min_penalty && s <= p.max_bonus);
        }

        #[test]
        fn scaling_monotonic_in_area(a in 0.01f64..100.0, b in 0.01f64..100.0, idx in 0usize..14) {
            let t = ComponentType::ALL[idx];
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(size_scaling(&sized(t, lo, 1.0), 7) <= size_scaling(&sized(t, hi, 1.0), 7));
        }
    }
}
