use std::path::{Path, PathBuf};
use std::process;

use morphsculpt_core::{load_gltf_mesh, tick, write_gltf, EditingSession};
use tracing_subscriber::filter::LevelFilter;

use crate::logging::parse_level;
use crate::script::{load_script, run_script, EditScript, SessionSummary};

#[derive(Debug, PartialEq)]
pub(crate) struct HeadlessArgs {
    pub(crate) input: PathBuf,
    pub(crate) script_path: Option<PathBuf>,
    pub(crate) output_path: Option<PathBuf>,
    pub(crate) print: bool,
    pub(crate) log_level: LevelFilter,
}

pub(crate) fn parse_headless_args(args: &[String]) -> Result<HeadlessArgs, String> {
    let mut input = None;
    let mut script_path = None;
    let mut output_path = None;
    let mut print = false;
    let mut log_level = LevelFilter::INFO;
    let mut iter = args.iter().skip(1);

    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--input" | "-i" => {
                let value = iter
                    .next()
                    .ok_or_else(|| "--input requires a path".to_string())?;
                input = Some(PathBuf::from(value));
            }
            "--script" => {
                let value = iter
                    .next()
                    .ok_or_else(|| "--script requires a path".to_string())?;
                script_path = Some(PathBuf::from(value));
            }
            "--output" | "-o" => {
                let value = iter
                    .next()
                    .ok_or_else(|| "--output requires a path".to_string())?;
                output_path = Some(PathBuf::from(value));
            }
            "--print" => {
                print = true;
            }
            "--log-level" => {
                let value = iter
                    .next()
                    .ok_or_else(|| "--log-level requires a value".to_string())?;
                log_level = parse_level(value)?;
            }
            "--help" | "-h" => {
                print_headless_help();
                process::exit(0);
            }
            other => return Err(format!("unexpected argument '{other}'")),
        }
    }

    Ok(HeadlessArgs {
        input: input.ok_or_else(|| "--input is required".to_string())?,
        script_path,
        output_path,
        print,
        log_level,
    })
}

fn print_headless_help() {
    println!(
        "Usage: morphsculpt --input <model.glb> [options]\n  --script <edits.json>\n  --output <path.glb|path.gltf>\n  --print\n  --log-level <off|error|warn|info|debug|trace>"
    );
}

/// Load, replay the edit script, export. Errors are reported as text for
/// `main` to print.
pub(crate) fn run_headless(args: &HeadlessArgs) -> Result<(), String> {
    let mut mesh = load_gltf_mesh(&args.input)
        .map_err(|err| format!("failed to load {:?}: {err}", args.input))?;

    let script = match &args.script_path {
        Some(path) => load_script(path)?,
        None => EditScript::default(),
    };

    let mut session = EditingSession::new(script.settings.unwrap_or_default());
    session.load(&mesh);
    let report = run_script(&script, &mut session, &mut mesh);
    tick(&session, &mut mesh);
    tracing::info!(
        "headless: {} steps applied, {} rejected",
        report.applied,
        report.rejected
    );

    if let Some(path) = &args.output_path {
        export(path, &mesh)?;
    }

    if args.print {
        let summary = SessionSummary::new(&session, &mesh, &report);
        let json = serde_json::to_string_pretty(&summary).map_err(|err| err.to_string())?;
        println!("{json}");
    }

    tracing::info!("headless: completed");
    Ok(())
}

fn export(path: &Path, mesh: &morphsculpt_core::Mesh) -> Result<(), String> {
    write_gltf(path, mesh).map_err(|err| format!("failed to export {path:?}: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("morphsculpt")
            .chain(list.iter().copied())
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn parses_full_command_line() {
        let parsed = parse_headless_args(&args(&[
            "--input",
            "head.glb",
            "--script",
            "edits.json",
            "-o",
            "out.gltf",
            "--print",
            "--log-level",
            "debug",
        ]))
        .unwrap();
        assert_eq!(
            parsed,
            HeadlessArgs {
                input: PathBuf::from("head.glb"),
                script_path: Some(PathBuf::from("edits.json")),
                output_path: Some(PathBuf::from("out.gltf")),
                print: true,
                log_level: LevelFilter::DEBUG,
            }
        );
    }

    #[test]
    fn input_is_required() {
        assert!(parse_headless_args(&args(&["--print"])).is_err());
        assert!(parse_headless_args(&args(&["--input"])).is_err());
    }

    #[test]
    fn rejects_unknown_flags() {
        assert!(parse_headless_args(&args(&["--input", "a.glb", "--wireframe"])).is_err());
    }
}
