//! Portable reference kernels; no CPU feature requirement.

use super::tail;

macro_rules! native_dot {
    ($name:ident, $t:ty) => {
        /// Four independent partial sums over blocks of four, merged
        /// pairwise, then the remainder.
        pub fn $name(u: &[$t], v: &[$t]) -> $t {
            debug_assert_eq!(u.len(), v.len());
            let n = u.len().min(v.len());
            let (u, v) = (&u[..n], &v[..n]);
            let mut t = [0.0 as $t; 4];
            let mut uc = u.chunks_exact(4);
            let mut vc = v.chunks_exact(4);
            for (a, b) in (&mut uc).zip(&mut vc) {
                t[0] += a[0] * b[0];
                t[1] += a[1] * b[1];
                t[2] += a[2] * b[2];
                t[3] += a[3] * b[3];
            }
            let acc = (t[0] + t[1]) + (t[2] + t[3]);
            tail(uc.remainder(), vc.remainder(), acc)
        }
    };
}

native_dot!(dot_product_f32, f32);
native_dot!(dot_product_f64, f64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_vectors() {
        assert_eq!(dot_product_f32(&[], &[]), 0.0);
        assert_eq!(dot_product_f32(&[2.0], &[3.0]), 6.0);
        let u: Vec<f64> = (1..=9).map(f64::from).collect();
        // 1² + 2² + ... + 9²
        assert_eq!(dot_product_f64(&u, &u), 285.0);
    }
}
