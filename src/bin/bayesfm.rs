//! Command-line FM training on libFM-format files.
//!
//! Usage:
//!   bayesfm --train <path> --test <path> [options]
//!
//! Options:
//!   --train <path>        libFM training file (required)
//!   --test <path>         libFM test file (required)
//!   --out <path>          Write final test predictions, one per line
//!   --method <m>          mcmc (default) or als
//!   --dim <k0,k1,k2>      bias,linear,factors triple (default: 1,1,8)
//!   --regular <r0,r1,r2>  regularization triple, ALS only (default: 0,0,0.1)
//!   --iterations <n>      Number of sweeps (default: 100)
//!   --init-stddev <s>     Init stddev for weights/factors (default: 0.1)
//!   --seed <n>            Seed for the pseudo-random stream
//!   --silent              Suppress per-iteration output

use std::process::ExitCode;

use bayesfm::data::io::{read_libfm, scan_num_features, write_predictions};
use bayesfm::model::{DimSpec, FmConfig, Method, RegSpec};
use bayesfm::training::{FmTrainer, Verbosity};

#[derive(Debug, Default)]
struct Args {
    train: Option<String>,
    test: Option<String>,
    out: Option<String>,
    method: Option<Method>,
    dim: Option<DimSpec>,
    regular: Option<RegSpec>,
    iterations: Option<u32>,
    init_stddev: Option<f64>,
    seed: Option<u64>,
    silent: bool,
}

const USAGE: &str = "bayesfm --train <path> --test <path> [options]\n\n  \
    --out <path>          Write final test predictions, one per line\n  \
    --method <m>          mcmc (default) or als\n  \
    --dim <k0,k1,k2>      bias,linear,factors triple (default: 1,1,8)\n  \
    --regular <r0,r1,r2>  regularization triple, ALS only (default: 0,0,0.1)\n  \
    --iterations <n>      Number of sweeps (default: 100)\n  \
    --init-stddev <s>     Init stddev for weights/factors (default: 0.1)\n  \
    --seed <n>            Seed for the pseudo-random stream\n  \
    --silent              Suppress per-iteration output";

fn parse_args() -> Result<Args, String> {
    let mut args = Args::default();
    let mut it = std::env::args().skip(1);

    fn value(it: &mut impl Iterator<Item = String>, flag: &str) -> Result<String, String> {
        it.next().ok_or_else(|| format!("{flag} expects a value"))
    }

    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--train" => args.train = Some(value(&mut it, "--train")?),
            "--test" => args.test = Some(value(&mut it, "--test")?),
            "--out" => args.out = Some(value(&mut it, "--out")?),
            "--method" => {
                let m = value(&mut it, "--method")?;
                args.method = Some(m.parse().map_err(|_| format!("unknown method '{m}'"))?);
            }
            "--dim" => {
                let d = value(&mut it, "--dim")?;
                args.dim = Some(d.parse().map_err(|e| format!("--dim: {e}"))?);
            }
            "--regular" => {
                let r = value(&mut it, "--regular")?;
                args.regular = Some(r.parse().map_err(|e| format!("--regular: {e}"))?);
            }
            "--iterations" => {
                let n = value(&mut it, "--iterations")?;
                args.iterations = Some(n.parse().map_err(|_| format!("invalid iteration count '{n}'"))?);
            }
            "--init-stddev" => {
                let s = value(&mut it, "--init-stddev")?;
                args.init_stddev = Some(s.parse().map_err(|_| format!("invalid stddev '{s}'"))?);
            }
            "--seed" => {
                let s = value(&mut it, "--seed")?;
                args.seed = Some(s.parse().map_err(|_| format!("invalid seed '{s}'"))?);
            }
            "--silent" => args.silent = true,
            "--help" | "-h" => return Err(USAGE.to_string()),
            other => return Err(format!("unknown argument '{other}'\n\n{USAGE}")),
        }
    }
    Ok(args)
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let train_path = args.train.ok_or("--train is required")?;
    let test_path = args.test.ok_or("--test is required")?;

    // Train and test share one feature space sized to the largest id seen.
    let n_features = scan_num_features(&train_path)?.max(scan_num_features(&test_path)?);
    let train = read_libfm(&train_path, n_features)?;
    let test = read_libfm(&test_path, n_features)?;

    let dim = args.dim.unwrap_or(DimSpec {
        bias: true,
        linear: true,
        n_factors: 8,
    });

    let config = FmConfig::builder()
        .bias(dim.bias)
        .linear(dim.linear)
        .n_factors(dim.n_factors)
        .method(args.method.unwrap_or_default())
        .n_iterations(args.iterations.unwrap_or(100))
        .regularization(args.regular.unwrap_or_default())
        .init_stddev(args.init_stddev.unwrap_or(0.1))
        .maybe_seed(args.seed)
        .verbosity(if args.silent {
            Verbosity::Silent
        } else {
            Verbosity::Info
        })
        .build()?;

    if !args.silent {
        println!(
            "loaded {} train / {} test samples over {} features",
            train.n_samples(),
            test.n_samples(),
            n_features
        );
    }

    let fit = FmTrainer::new(config).train(&train, &test)?;

    if let Some(record) = fit.history.last() {
        println!(
            "final: train-rmse: {:.6}  test-rmse: {:.6}  test-mae: {:.6}",
            record.train_rmse, record.test_rmse, record.test_mae
        );
    }

    if let Some(out) = args.out {
        write_predictions(&out, &fit.predictions)?;
        if !args.silent {
            println!("wrote {} predictions to {out}", fit.predictions.len());
        }
    }

    Ok(())
}

fn main() -> ExitCode {
    let args = match parse_args() {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{message}");
            return ExitCode::FAILURE;
        }
    };
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
