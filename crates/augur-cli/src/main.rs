use std::{env, process::ExitCode, time::Instant};

use augur::{compile_selection, Detector, EngineConfig};

const USAGE: &str = "usage: augur [options] <trace-file>...
  --match <regex>      only process program points matching the pattern
  --ternary            infer invariants over variable triples
  --invocation-counts  inject calls(F) counter variables
  --unconstrained      also print unconstrained invariants
  --no-stats           skip statistics collection
  --stats-json         print statistics as JSON instead of text";

fn main() -> ExitCode {
    env_logger::init();

    let mut config = EngineConfig::default();
    let mut pattern: Option<String> = None;
    let mut print_unconstrained = false;
    let mut stats_json = false;
    let mut files: Vec<String> = Vec::new();

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--match" => match args.next() {
                Some(value) => pattern = Some(value),
                None => {
                    eprintln!("error: --match requires a pattern\n{USAGE}");
                    return ExitCode::FAILURE;
                }
            },
            "--ternary" => config.ternary_invariants = true,
            "--invocation-counts" => config.invocation_counts = true,
            "--unconstrained" => print_unconstrained = true,
            "--no-stats" => config.collect_stats = false,
            "--stats-json" => stats_json = true,
            "--help" | "-h" => {
                println!("{USAGE}");
                return ExitCode::SUCCESS;
            }
            _ if arg.starts_with("--") => {
                eprintln!("error: unknown option {arg}\n{USAGE}");
                return ExitCode::FAILURE;
            }
            _ => files.push(arg),
        }
    }
    if files.is_empty() {
        eprintln!("{USAGE}");
        return ExitCode::FAILURE;
    }

    let selection = match pattern.as_deref().map(compile_selection).transpose() {
        Ok(selection) => selection,
        Err(err) => {
            eprintln!("error: bad --match pattern: {err}");
            return ExitCode::FAILURE;
        }
    };

    let mut detector = Detector::new(config);
    let start = Instant::now();
    if let Err(err) = detector.read_files(&files, selection.as_ref()) {
        eprintln!("error: {err}");
        return ExitCode::FAILURE;
    }
    detector.infer();
    let elapsed = start.elapsed();

    print!("{}", detector.render_report(print_unconstrained));
    if stats_json {
        if let Some(json) = detector.stats_json() {
            println!("{json}");
        }
    } else if let Some(stats) = detector.render_stats() {
        print!("{stats}");
    }
    log::debug!("processed {} file(s) in {elapsed:?}", files.len());
    ExitCode::SUCCESS
}
