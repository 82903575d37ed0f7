use ocr_kernels::intmatrix::signmul::{self, emulated, kernel_product, reference};

fn all_pairs() -> (Vec<i8>, Vec<i8>) {
    let mut w = Vec::with_capacity(256 * 256);
    let mut x = Vec::with_capacity(256 * 256);
    for a in i8::MIN..=i8::MAX {
        for b in i8::MIN..=i8::MAX {
            w.push(a);
            x.push(b);
        }
    }
    (w, x)
}

#[test]
fn scalar_emulation_is_exact_for_every_pair() {
    for w in i8::MIN..=i8::MAX {
        for x in i8::MIN..=i8::MAX {
            assert_eq!(emulated(w, x), reference(w, x), "w={} x={}", w, x);
        }
    }
}

#[test]
fn every_runnable_path_is_exact_over_the_input_range() {
    let (w, x) = all_pairs();
    let paths = signmul::runnable_paths();
    assert!(paths.iter().any(|p| p.name == "scalar"));
    for path in paths {
        let mut out = vec![0i16; w.len()];
        (path.run)(&w, &x, &mut out);
        for i in 0..w.len() {
            let expected = if x[i] == i8::MIN { reference(w[i], -127) } else { reference(w[i], x[i]) };
            assert_eq!(out[i], expected, "{} w={} x={}", path.name, w[i], x[i]);
            assert_eq!(out[i], kernel_product(w[i], x[i]), "{} w={} x={}", path.name, w[i], x[i]);
        }
    }
}

#[test]
fn paths_handle_ragged_tails() {
    let w: Vec<i8> = (0..37).map(|i| (i * 7 - 100) as i8).collect();
    let x: Vec<i8> = (0..37).map(|i| (90 - i * 5) as i8).collect();
    for path in signmul::runnable_paths() {
        let mut out = vec![0i16; 37];
        (path.run)(&w, &x, &mut out);
        for i in 0..37 {
            assert_eq!(out[i], reference(w[i], x[i]), "{} index {}", path.name, i);
        }
    }
}

#[test]
fn minimum_bytes_survive_every_chunk_position() {
    // Long enough to cross full and partial chunks of every register width.
    let n = 150;
    let w: Vec<i8> = (0..n).map(|i| if i % 3 == 0 { i8::MIN } else { -1 }).collect();
    let x = vec![i8::MIN; n];
    for path in signmul::runnable_paths() {
        let mut out = vec![0i16; n + 5];
        (path.run)(&w, &x, &mut out);
        for i in 0..n {
            assert_eq!(out[i], reference(w[i], -127), "{} index {}", path.name, i);
        }
        assert!(out[n..].iter().all(|&o| o == 0), "{} wrote past the inputs", path.name);
    }
}
