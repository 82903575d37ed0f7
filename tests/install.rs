// Runs alone in its own process: the global registry can be set only once.
use ocr_kernels::registry;
use ocr_kernels::{DotProductChoice, KernelConfig, KernelError, MatrixChoice};

#[test]
fn install_is_strict_and_one_shot() {
    let config = KernelConfig { dot_product: DotProductChoice::Native, int_matrix: MatrixChoice::Scalar };
    let reg = registry::install(&config).unwrap();
    assert_eq!(reg.matrix_kernel().name, "scalar");
    assert!(std::ptr::eq(registry::registry(), reg));
    assert_eq!(ocr_kernels::select_best().name, "scalar");
    assert_eq!(ocr_kernels::dot_product(&[1.0f32, 2.0], &[3.0, 4.0]), 11.0);

    assert!(matches!(registry::install(&KernelConfig::default()), Err(KernelError::AlreadyInstalled)));
}
