const EPSILON: f32 = 1.0e-6;

pub type Vec3 = [f32; 3];

pub const ZERO: Vec3 = [0.0, 0.0, 0.0];

pub fn add3(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

pub fn sub3(a: Vec3, b: Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

pub fn scale3(v: Vec3, s: f32) -> Vec3 {
    [v[0] * s, v[1] * s, v[2] * s]
}

pub fn dot3(a: Vec3, b: Vec3) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

pub fn cross3(a: Vec3, b: Vec3) -> Vec3 {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

pub fn length_sq3(v: Vec3) -> f32 {
    dot3(v, v)
}

pub fn length3(v: Vec3) -> f32 {
    length_sq3(v).sqrt()
}

pub fn distance_sq3(a: Vec3, b: Vec3) -> f32 {
    length_sq3(sub3(a, b))
}

pub fn distance3(a: Vec3, b: Vec3) -> f32 {
    distance_sq3(a, b).sqrt()
}

pub fn normalize_or_default(v: Vec3, default: Vec3) -> Vec3 {
    let len_sq = length_sq3(v);
    if len_sq <= EPSILON {
        return default;
    }
    scale3(v, 1.0 / len_sq.sqrt())
}

pub fn normalize_to_magnitude(v: Vec3, magnitude: f32) -> Vec3 {
    let len_sq = length_sq3(v);
    if len_sq <= EPSILON {
        return ZERO;
    }
    scale3(v, magnitude / len_sq.sqrt())
}

pub fn is_finite3(v: Vec3) -> bool {
    v.iter().all(|c| c.is_finite())
}

pub fn clamp_finite(value: f32, min: f32, max: f32, fallback: f32) -> f32 {
    if !value.is_finite() {
        return fallback;
    }
    value.clamp(min, max)
}

#[cfg(test)]
mod tests {
    use super::{
        add3, cross3, distance3, dot3, length3, normalize_or_default, normalize_to_magnitude,
        scale3, sub3, ZERO,
    };
    use approx::assert_relative_eq;

    #[test]
    fn cross_product_is_orthogonal_to_inputs() {
        let a = [1.0, 2.0, 3.0];
        let b = [-4.0, 0.5, 2.0];
        let c = cross3(a, b);

        assert_relative_eq!(dot3(a, c), 0.0, epsilon = 1.0e-5);
        assert_relative_eq!(dot3(b, c), 0.0, epsilon = 1.0e-5);
        assert_eq!(cross3([1.0, 0.0, 0.0], [0.0, 1.0, 0.0]), [0.0, 0.0, 1.0]);
    }

    #[test]
    fn distance_matches_length_of_difference() {
        let a = [1.0, 2.0, 2.0];
        let b = [0.0, 0.0, 0.0];

        assert_relative_eq!(distance3(a, b), 3.0);
        assert_relative_eq!(length3(sub3(a, b)), 3.0);
        assert_eq!(add3(sub3(a, b), b), a);
        assert_eq!(scale3(a, 2.0), [2.0, 4.0, 4.0]);
    }

    #[test]
    fn normalize_handles_degenerate_vectors() {
        assert_eq!(normalize_or_default(ZERO, [1.0, 0.0, 0.0]), [1.0, 0.0, 0.0]);
        assert_eq!(normalize_to_magnitude(ZERO, 5.0), ZERO);

        let n = normalize_or_default([0.0, 3.0, 4.0], ZERO);
        assert_relative_eq!(length3(n), 1.0, epsilon = 1.0e-6);

        let m = normalize_to_magnitude([0.0, 3.0, 4.0], 10.0);
        assert_relative_eq!(m[1], 6.0, epsilon = 1.0e-5);
        assert_relative_eq!(m[2], 8.0, epsilon = 1.0e-5);
    }
}
