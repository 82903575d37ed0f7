use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::Serialize;

use ocr_kernels::{dot, intmatrix, quantize_input, registry, KernelConfig, QuantizedMatrix};

#[derive(Parser, Debug)]
#[command(name = "ocr-kernels-bench", version, about = "Time every runnable OCR kernel on this CPU")]
struct Args {
    /// Dot-product vector length
    #[arg(long, default_value_t = 4096)]
    len: usize,

    /// Matrix outputs (rows)
    #[arg(long, default_value_t = 384)]
    rows: usize,

    /// Matrix inputs per row, excluding the bias column
    #[arg(long, default_value_t = 511)]
    inputs: usize,

    /// Timed repetitions per kernel
    #[arg(long, default_value_t = 2000)]
    iters: usize,

    /// RNG seed for the test data
    #[arg(long, default_value_t = 7)]
    seed: u64,

    /// Kernel config (JSON); environment overrides are used otherwise
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write a JSON report here
    #[arg(long)]
    json: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct Timing {
    family: &'static str,
    kernel: &'static str,
    ns_per_call: f64,
    max_abs_diff: f64,
}

#[derive(Debug, Serialize)]
struct Report {
    selection: registry::Selection,
    timings: Vec<Timing>,
}

fn time_it<F: FnMut()>(iters: usize, mut f: F) -> f64 {
    f();
    let t0 = Instant::now();
    for _ in 0..iters {
        f();
    }
    t0.elapsed().as_secs_f64() * 1e9 / iters.max(1) as f64
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let reg = match args.config.as_deref() {
        Some(path) => {
            let config = KernelConfig::from_json_file(path).with_context(|| format!("load kernel config: {}", path.display()))?;
            registry::install(&config).context("install kernel registry")?
        }
        None => registry::registry(),
    };
    let selection = reg.selection();
    println!(
        "cpu={:?} dot_product={} int_matrix={}",
        selection.capabilities, selection.dot_product, selection.int_matrix
    );

    let mut rng = SmallRng::seed_from_u64(args.seed);
    let normal = Normal::new(0.0f32, 1.0).context("normal distribution")?;
    let a: Vec<f32> = (0..args.len).map(|_| normal.sample(&mut rng)).collect();
    let b: Vec<f32> = (0..args.len).map(|_| normal.sample(&mut rng)).collect();
    let reference: f64 = a.iter().zip(&b).map(|(&x, &y)| f64::from(x) * f64::from(y)).sum();

    let dim2 = args.inputs + 1;
    let floats: Vec<f32> = (0..args.rows * dim2).map(|_| normal.sample(&mut rng)).collect();
    let matrix = QuantizedMatrix::quantize(args.rows, dim2, &floats).context("quantize test matrix")?;
    let activations: Vec<f32> = (0..args.inputs).map(|_| rng.gen_range(-1.0f32..=1.0)).collect();
    let mut u = vec![0i8; args.inputs];
    quantize_input(&activations, &mut u);
    let mut expected = vec![0.0f32; args.rows];
    intmatrix::SCALAR.matrix_dot_vector(&intmatrix::SCALAR.pack(&matrix), &u, &mut expected);

    let dots = dot::runnable();
    let matrices = intmatrix::runnable();
    let pb = ProgressBar::new((dots.len() + matrices.len()) as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
            .context("progress template")?
            .progress_chars("=>-"),
    );

    let mut timings = Vec::new();
    for k in dots {
        pb.set_message(format!("dot {}", k.name));
        let mut got = 0.0f32;
        let ns = time_it(args.iters, || got = (k.f32)(std::hint::black_box(&a), std::hint::black_box(&b)));
        timings.push(Timing { family: "dot-f32", kernel: k.name, ns_per_call: ns, max_abs_diff: (f64::from(got) - reference).abs() });
        pb.inc(1);
    }
    for d in matrices {
        pb.set_message(format!("int matrix {}", d.name));
        let packed = d.pack(&matrix);
        let mut v = vec![0.0f32; args.rows];
        let ns = time_it(args.iters, || d.matrix_dot_vector(&packed, std::hint::black_box(&u), &mut v));
        let diff = v.iter().zip(&expected).map(|(&x, &y)| f64::from((x - y).abs())).fold(0.0, f64::max);
        timings.push(Timing { family: "int-matrix", kernel: d.name, ns_per_call: ns, max_abs_diff: diff });
        pb.inc(1);
    }
    pb.finish_and_clear();

    for t in &timings {
        println!("{:<10} {:<10} {:>12.1} ns/call  max_abs_diff={:.3e}", t.family, t.kernel, t.ns_per_call, t.max_abs_diff);
    }

    if let Some(path) = args.json.as_deref() {
        let report = Report { selection, timings };
        let text = serde_json::to_string_pretty(&report).context("serialize report")?;
        std::fs::write(path, text).with_context(|| format!("write report: {}", path.display()))?;
    }
    Ok(())
}
