use ocr_kernels::detect::{Capabilities, Feature, IsaTier};
use ocr_kernels::registry::{self, Registry};
use ocr_kernels::{intmatrix, select_best, select_for, DotProductChoice, KernelConfig, KernelError, MatrixChoice};
use pretty_assertions::assert_eq;

#[test]
fn select_best_is_runnable() {
    let best = select_best();
    assert!(best.is_supported(Capabilities::host()));
    assert!(intmatrix::runnable().iter().any(|d| std::ptr::eq(*d, best)));
}

#[test]
fn no_extensions_selects_scalar() {
    let d = select_for(Capabilities::none());
    assert_eq!(d.name, "scalar");
    assert_eq!(d.tier, IsaTier::Scalar);
    assert_eq!(Registry::auto(Capabilities::none()).dot_kernel().name, "native");
}

#[test]
fn automatic_choice_is_the_widest_runnable() {
    let best = select_for(Capabilities::host());
    let widest = intmatrix::runnable().into_iter().map(|d| d.tier).max();
    assert_eq!(Some(best.tier), widest);
}

#[test]
fn simulated_capabilities_only_narrow() {
    let host = Capabilities::host();
    let all = Capabilities::from_features(&Feature::ALL);
    assert_eq!(select_for(all).name, select_for(host).name);

    let narrowed = host.without(Feature::Avx2).without(Feature::Avx512F);
    let d = select_for(narrowed);
    assert!(d.tier <= IsaTier::Sse || d.tier == IsaTier::Neon, "got {}", d.name);
}

#[test]
fn forcing_scalar_always_works() {
    let config = KernelConfig { dot_product: DotProductChoice::Native, int_matrix: MatrixChoice::Scalar };
    let reg = Registry::select(Capabilities::host(), &config).unwrap();
    assert_eq!(reg.selection().int_matrix, "scalar");
    assert_eq!(reg.selection().dot_product, "native");
}

#[test]
fn forcing_an_unavailable_kernel_fails() {
    let config = KernelConfig { int_matrix: MatrixChoice::Avx512, ..KernelConfig::default() };
    match Registry::select(Capabilities::none(), &config) {
        Err(KernelError::Unsupported { name, tier }) => {
            assert_eq!(name, "avx512");
            assert_eq!(tier, IsaTier::Avx512);
        }
        other => panic!("expected Unsupported, got {:?}", other.map(|r| r.selection())),
    }
}

#[test]
fn descriptor_lookup_by_tier() {
    assert_eq!(registry::descriptor_for(IsaTier::Scalar).map(|d| d.name), Some("scalar"));
    for d in intmatrix::runnable() {
        assert!(std::ptr::eq(registry::descriptor_for(d.tier).unwrap(), d));
    }
}

#[test]
fn selection_serializes() {
    let json = serde_json::to_value(Registry::auto(Capabilities::none()).selection()).unwrap();
    assert_eq!(json["int_matrix"], "scalar");
    assert_eq!(json["int_matrix_tier"], "scalar");
    assert_eq!(json["capabilities"], serde_json::json!([]));
}
