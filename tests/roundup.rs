use ocr_kernels::roundup;

#[test]
fn fixed_cases() {
    assert_eq!(roundup(5, 4), 8);
    assert_eq!(roundup(8, 4), 8);
    assert_eq!(roundup(0, 4), 0);
    assert_eq!(roundup(1, 1), 1);
    assert_eq!(roundup(65, 64), 128);
}

#[test]
fn smallest_multiple_not_below_value() {
    for m in 1..=20usize {
        for v in 0..=200usize {
            let r = roundup(v, m);
            assert_eq!(r % m, 0, "roundup({}, {})", v, m);
            assert!(r >= v, "roundup({}, {}) = {}", v, m, r);
            assert!(r < v + m, "roundup({}, {}) = {} is not the smallest", v, m, r);
        }
    }
}
